//! Review submission and executor rating recalculation.
//!
//! A client may review a completed order once. Each submitted or
//! moderated review triggers a full recomputation of the executor's
//! aggregate rating from the visible review rows: the recalculation is a
//! pure function over stored reviews, idempotent, and safe to call any
//! number of times.

use crate::event_bus::EventBus;
use crate::locks::LockRegistry;
use crate::state::{now_secs, OrderStateMachine};
use crate::validation;
use market_storage::StorageService;
use market_types::{
	truncate_id, Actor, ExecutorProfile, MarketError, MarketEvent, OrderStatus, Review,
	ReviewEvent, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;

/// Review submission and rating aggregation service.
pub struct ReviewService {
	storage: Arc<StorageService>,
	state: OrderStateMachine,
	locks: Arc<LockRegistry>,
	profile_locks: Arc<LockRegistry>,
	event_bus: EventBus,
}

impl ReviewService {
	pub(crate) fn new(
		storage: Arc<StorageService>,
		locks: Arc<LockRegistry>,
		profile_locks: Arc<LockRegistry>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state: OrderStateMachine::new(storage.clone()),
			storage,
			locks,
			profile_locks,
			event_bus,
		}
	}

	/// Submits a review for a completed order.
	///
	/// Client only, one review per order, rating 1 to 5. Triggers the
	/// executor's rating recalculation.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn submit_review(
		&self,
		actor: &Actor,
		order_id: &str,
		rating: u8,
		comment: &str,
	) -> Result<Review, MarketError> {
		validation::validate_rating(rating)?;

		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::Completed {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and cannot be reviewed",
				truncate_id(order_id),
				order.status
			)));
		}
		if order.client_id != actor.id {
			return Err(MarketError::Forbidden(
				"Only the order's client may review it".into(),
			));
		}
		let executor_id = order.executor_id.clone().ok_or_else(|| {
			MarketError::Conflict("Completed order has no executor".into())
		})?;

		let existing: Option<Review> = self
			.storage
			.retrieve_optional(StorageKey::Reviews.as_str(), order_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;
		if existing.is_some() {
			return Err(MarketError::Conflict(
				"Order has already been reviewed".into(),
			));
		}

		let review = Review {
			order_id: order_id.to_string(),
			executor_id: executor_id.clone(),
			client_id: actor.id.clone(),
			rating,
			comment: comment.to_string(),
			visible: true,
			created_at: now_secs(),
		};
		self.storage
			.store(StorageKey::Reviews.as_str(), order_id, &review)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		let mut index = self.executor_index(&executor_id).await?;
		index.push(order_id.to_string());
		self.storage
			.store(StorageKey::ExecutorReviews.as_str(), &executor_id, &index)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		self.recalculate_executor_rating(&executor_id).await?;

		self.event_bus
			.publish(MarketEvent::Review(ReviewEvent::Submitted {
				order_id: order_id.to_string(),
				rating,
			}))
			.ok();

		Ok(review)
	}

	/// Toggles a review's visibility. Admin only; hidden reviews drop out
	/// of the executor's average.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn moderate_review(
		&self,
		actor: &Actor,
		order_id: &str,
		visible: bool,
	) -> Result<Review, MarketError> {
		if !actor.is_admin() {
			return Err(MarketError::Forbidden(
				"Only admins may moderate reviews".into(),
			));
		}

		let _guard = self.locks.acquire(order_id).await;

		let mut review = self.get_review(order_id).await?;
		review.visible = visible;
		self.storage
			.update(StorageKey::Reviews.as_str(), order_id, &review)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		self.recalculate_executor_rating(&review.executor_id).await?;
		Ok(review)
	}

	/// Gets the review for an order.
	pub async fn get_review(&self, order_id: &str) -> Result<Review, MarketError> {
		self.storage
			.retrieve_optional(StorageKey::Reviews.as_str(), order_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.ok_or_else(|| {
				MarketError::NotFound(format!(
					"Order {} has no review",
					truncate_id(order_id)
				))
			})
	}

	/// Gets an executor's reputation profile, zeroed when none exists
	/// yet.
	pub async fn get_executor_profile(
		&self,
		executor_id: &str,
	) -> Result<ExecutorProfile, MarketError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::Executors.as_str(), executor_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.unwrap_or_else(|| ExecutorProfile {
				executor_id: executor_id.to_string(),
				..ExecutorProfile::default()
			}))
	}

	/// Recomputes the executor's average rating and review count from all
	/// visible reviews.
	///
	/// Pure over the stored review rows; the order counters on the
	/// profile are left untouched. Holds the executor's profile lock so a
	/// concurrent counter bump from another order cannot be overwritten.
	pub async fn recalculate_executor_rating(
		&self,
		executor_id: &str,
	) -> Result<ExecutorProfile, MarketError> {
		let _guard = self.profile_locks.acquire(executor_id).await;
		let index = self.executor_index(executor_id).await?;

		let mut sum: u64 = 0;
		let mut count: u64 = 0;
		for order_id in &index {
			let review: Option<Review> = self
				.storage
				.retrieve_optional(StorageKey::Reviews.as_str(), order_id)
				.await
				.map_err(|e| MarketError::Storage(e.to_string()))?;
			if let Some(review) = review {
				if review.visible {
					sum += u64::from(review.rating);
					count += 1;
				}
			}
		}

		let mut profile = self.get_executor_profile(executor_id).await?;
		profile.review_count = count;
		profile.rating = if count == 0 {
			0.0
		} else {
			sum as f64 / count as f64
		};
		self.storage
			.store(StorageKey::Executors.as_str(), executor_id, &profile)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		self.event_bus
			.publish(MarketEvent::Review(ReviewEvent::RatingRecalculated {
				executor_id: executor_id.to_string(),
				rating: profile.rating,
				review_count: profile.review_count,
			}))
			.ok();

		Ok(profile)
	}

	/// Loads the per-executor review index, empty when absent.
	async fn executor_index(&self, executor_id: &str) -> Result<Vec<String>, MarketError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::ExecutorReviews.as_str(), executor_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.unwrap_or_default())
	}
}
