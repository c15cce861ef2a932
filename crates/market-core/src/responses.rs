//! Response registry.
//!
//! Manages executor proposals against an order while it accepts them.
//! Uniqueness per (order, executor) pair is enforced through a dedicated
//! pair key, and the per-order child index is the source of truth for
//! listing; the order's response counter is a best-effort monotone
//! counter.

use crate::event_bus::EventBus;
use crate::locks::LockRegistry;
use crate::state::{now_secs, OrderStateMachine};
use crate::validation;
use market_dispatch::SubscriptionGate;
use market_storage::StorageService;
use market_types::{
	new_id, truncate_id, Actor, MarketError, MarketEvent, Order, OrderResponse, OrderStatus,
	ResponseEvent, Role, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;

/// Input for creating a response.
#[derive(Debug, Clone)]
pub struct NewResponse {
	pub cover_letter: String,
	pub proposed_price: Option<u64>,
	pub proposed_days: Option<u32>,
}

/// Input for editing an unselected response.
#[derive(Debug, Clone, Default)]
pub struct UpdateResponse {
	pub cover_letter: Option<String>,
	pub proposed_price: Option<u64>,
	pub proposed_days: Option<u32>,
}

/// Registry of executor proposals.
pub struct ResponseRegistry {
	storage: Arc<StorageService>,
	state: OrderStateMachine,
	locks: Arc<LockRegistry>,
	gate: Arc<dyn SubscriptionGate>,
	event_bus: EventBus,
}

impl ResponseRegistry {
	pub(crate) fn new(
		storage: Arc<StorageService>,
		locks: Arc<LockRegistry>,
		gate: Arc<dyn SubscriptionGate>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state: OrderStateMachine::new(storage.clone()),
			storage,
			locks,
			gate,
			event_bus,
		}
	}

	fn pair_key(order_id: &str, executor_id: &str) -> String {
		format!("{}:{}", order_id, executor_id)
	}

	/// Creates a response to an open order.
	///
	/// Executors only, and never the order's own client. Fails if the
	/// order is not New and public, or if this executor already responded
	/// to it. The order's lock is held across the uniqueness check so two
	/// submissions from the same executor cannot both pass it.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), executor_id = %actor.id))]
	pub async fn create_response(
		&self,
		actor: &Actor,
		order_id: &str,
		input: NewResponse,
	) -> Result<OrderResponse, MarketError> {
		if actor.role != Role::Executor {
			return Err(MarketError::Forbidden(
				"Only executors may respond to orders".into(),
			));
		}
		validation::validate_text("Cover letter", &input.cover_letter)?;
		validation::validate_price(input.proposed_price)?;

		if !self.gate.can_access_orders(&actor.id).await {
			return Err(MarketError::Forbidden(
				"Subscription does not grant order access".into(),
			));
		}

		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.client_id == actor.id {
			return Err(MarketError::Forbidden(
				"The order's client cannot respond to their own order".into(),
			));
		}
		if order.status != OrderStatus::New || !order.is_public || order.is_deleted {
			return Err(MarketError::Conflict(format!(
				"Order {} is not accepting responses",
				truncate_id(order_id)
			)));
		}

		let pair = Self::pair_key(order_id, &actor.id);
		let existing: Option<String> = self
			.storage
			.retrieve_optional(StorageKey::ResponseByPair.as_str(), &pair)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;
		if existing.is_some() {
			return Err(MarketError::Conflict(
				"Executor already responded to this order".into(),
			));
		}

		let now = now_secs();
		let response = OrderResponse {
			id: new_id(),
			order_id: order_id.to_string(),
			executor_id: actor.id.clone(),
			cover_letter: input.cover_letter,
			proposed_price: input.proposed_price,
			proposed_days: input.proposed_days,
			selected: false,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::Responses.as_str(), &response.id, &response)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;
		self.storage
			.store(StorageKey::ResponseByPair.as_str(), &pair, &response.id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		let mut index = self.order_index(order_id).await?;
		index.push(response.id.clone());
		self.storage
			.store(StorageKey::OrderResponses.as_str(), order_id, &index)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		// Best-effort counter; the child index above is authoritative.
		self.state
			.update_order_with(order_id, |o| o.response_count += 1)
			.await?;

		self.event_bus
			.publish(MarketEvent::Response(ResponseEvent::Created {
				order_id: order_id.to_string(),
				response_id: response.id.clone(),
				executor_id: actor.id.clone(),
			}))
			.ok();

		Ok(response)
	}

	/// Edits an unselected response. Owner only, and only while the order
	/// is still New.
	#[instrument(skip_all, fields(response_id = %truncate_id(response_id)))]
	pub async fn update_response(
		&self,
		actor: &Actor,
		response_id: &str,
		input: UpdateResponse,
	) -> Result<OrderResponse, MarketError> {
		if let Some(letter) = &input.cover_letter {
			validation::validate_text("Cover letter", letter)?;
		}
		validation::validate_price(input.proposed_price)?;

		let response = self.get_response(response_id).await?;
		if response.executor_id != actor.id {
			return Err(MarketError::Forbidden(
				"Only the responding executor may edit this response".into(),
			));
		}

		// Edits race against selection, so they serialize on the same lock.
		let _guard = self.locks.acquire(&response.order_id).await;
		let mut response = self.get_response(response_id).await?;
		if response.selected {
			return Err(MarketError::Conflict(
				"A selected response cannot be edited".into(),
			));
		}
		self.ensure_order_still_open(&response.order_id).await?;

		if let Some(letter) = input.cover_letter {
			response.cover_letter = letter;
		}
		if input.proposed_price.is_some() {
			response.proposed_price = input.proposed_price;
		}
		if input.proposed_days.is_some() {
			response.proposed_days = input.proposed_days;
		}
		response.updated_at = now_secs();

		self.storage
			.update(StorageKey::Responses.as_str(), response_id, &response)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;
		Ok(response)
	}

	/// Withdraws an unselected response. Owner only, and only while the
	/// order is still New. The order's response counter stays where it
	/// is: it is monotone.
	#[instrument(skip_all, fields(response_id = %truncate_id(response_id)))]
	pub async fn delete_response(
		&self,
		actor: &Actor,
		response_id: &str,
	) -> Result<(), MarketError> {
		let response = self.get_response(response_id).await?;
		if response.executor_id != actor.id {
			return Err(MarketError::Forbidden(
				"Only the responding executor may withdraw this response".into(),
			));
		}

		let _guard = self.locks.acquire(&response.order_id).await;
		let response = self.get_response(response_id).await?;
		if response.selected {
			return Err(MarketError::Conflict(
				"A selected response cannot be withdrawn".into(),
			));
		}
		self.ensure_order_still_open(&response.order_id).await?;

		self.storage
			.remove(StorageKey::Responses.as_str(), response_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;
		self.storage
			.remove(
				StorageKey::ResponseByPair.as_str(),
				&Self::pair_key(&response.order_id, &response.executor_id),
			)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		let mut index = self.order_index(&response.order_id).await?;
		index.retain(|id| id != response_id);
		self.storage
			.store(StorageKey::OrderResponses.as_str(), &response.order_id, &index)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		self.event_bus
			.publish(MarketEvent::Response(ResponseEvent::Deleted {
				order_id: response.order_id.clone(),
				response_id: response_id.to_string(),
			}))
			.ok();

		Ok(())
	}

	/// Gets a response by ID.
	pub async fn get_response(&self, response_id: &str) -> Result<OrderResponse, MarketError> {
		self.storage
			.retrieve_optional(StorageKey::Responses.as_str(), response_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.ok_or_else(|| {
				MarketError::NotFound(format!(
					"Response {} does not exist",
					truncate_id(response_id)
				))
			})
	}

	/// Lists an order's responses in creation order.
	pub async fn list_responses(&self, order_id: &str) -> Result<Vec<OrderResponse>, MarketError> {
		let index = self.order_index(order_id).await?;
		let mut responses = Vec::with_capacity(index.len());
		for id in index {
			responses.push(self.get_response(&id).await?);
		}
		Ok(responses)
	}

	/// Loads the per-order response index, empty when absent.
	async fn order_index(&self, order_id: &str) -> Result<Vec<String>, MarketError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::OrderResponses.as_str(), order_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.unwrap_or_default())
	}

	/// Content edits are allowed only while the parent order is New.
	async fn ensure_order_still_open(&self, order_id: &str) -> Result<Order, MarketError> {
		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::New {
			return Err(MarketError::Conflict(format!(
				"Order {} has left the open stage; responses are frozen",
				truncate_id(order_id)
			)));
		}
		Ok(order)
	}
}
