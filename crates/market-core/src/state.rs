//! Order state machine implementation.
//!
//! Manages order state transitions with validation, ensuring orders move
//! only along legal lifecycle edges: New -> InProgress -> OnReview ->
//! Completed, with the Revision loop, the Disputed branch, and Cancelled
//! as the second terminal state. All persistence of orders funnels through
//! this type; callers are expected to hold the order's serialization lock.

use market_storage::{StorageError, StorageService};
use market_types::{truncate_id, MarketError, Order, OrderStatus, StorageKey};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
pub(crate) fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}

/// Maps a storage failure on an order lookup into the caller-facing error.
fn order_storage_error(order_id: &str, e: StorageError) -> MarketError {
	match e {
		StorageError::NotFound => {
			MarketError::NotFound(format!("Order {} does not exist", truncate_id(order_id)))
		}
		other => MarketError::Storage(other.to_string()),
	}
}

/// Manages order state transitions and persistence.
pub(crate) struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub(crate) fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Gets an order by ID.
	pub(crate) async fn get_order(&self, order_id: &str) -> Result<Order, MarketError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| order_storage_error(order_id, e))
	}

	/// Stores a new order.
	pub(crate) async fn store_order(&self, order: &Order) -> Result<(), MarketError> {
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, order)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))
	}

	/// Updates an order with a closure and persists it.
	///
	/// Re-reads the persisted order, applies the update, bumps
	/// `updated_at`, and writes it back.
	pub(crate) async fn update_order_with<F>(
		&self,
		order_id: &str,
		updater: F,
	) -> Result<Order, MarketError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = self.get_order(order_id).await?;

		updater(&mut order);
		order.updated_at = now_secs();

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| order_storage_error(order_id, e))?;

		Ok(order)
	}

	/// Applies a validated status transition plus its field updates as one
	/// persisted write.
	///
	/// The order is re-read immediately before mutating so the transition
	/// is checked against the current persisted status, never a stale
	/// snapshot. Fails with a conflict if the edge is not in the
	/// transition table.
	pub(crate) async fn apply_transition<F>(
		&self,
		order_id: &str,
		to: OrderStatus,
		updater: F,
	) -> Result<Order, MarketError>
	where
		F: FnOnce(&mut Order),
	{
		let order = self.get_order(order_id).await?;

		if !Self::is_valid_transition(order.status, to) {
			return Err(MarketError::Conflict(format!(
				"Order {} cannot move from {} to {}",
				truncate_id(order_id),
				order.status,
				to
			)));
		}

		self.update_order_with(order_id, |o| {
			updater(o);
			o.status = to;
		})
		.await
	}

	/// Checks if a state transition is valid.
	pub(crate) fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
		// Static transition table - each state maps to allowed next states
		static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
			let mut m = HashMap::new();
			m.insert(
				OrderStatus::New,
				HashSet::from([
					OrderStatus::InProgress,
					OrderStatus::Disputed,
					OrderStatus::Cancelled,
				]),
			);
			m.insert(
				OrderStatus::InProgress,
				HashSet::from([OrderStatus::OnReview, OrderStatus::Disputed]),
			);
			m.insert(
				OrderStatus::OnReview,
				HashSet::from([
					OrderStatus::Completed,
					OrderStatus::Revision,
					OrderStatus::Disputed,
				]),
			);
			m.insert(
				OrderStatus::Revision,
				HashSet::from([OrderStatus::OnReview, OrderStatus::Disputed]),
			);
			m.insert(
				OrderStatus::Disputed,
				HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
			);
			m.insert(OrderStatus::Completed, HashSet::new()); // terminal
			m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
			m
		});

		TRANSITIONS
			.get(&from)
			.is_some_and(|set| set.contains(&to))
	}
}
