//! Order lifecycle engine.
//!
//! The only component allowed to change an order's status. Each transition
//! acquires the order's serialization lock, re-reads the persisted order,
//! checks the current status and the acting user against the transition's
//! preconditions, then applies exactly one state change plus its side
//! effects. Concurrent attempts on the same order are linearized by the
//! lock: exactly one wins, the rest observe a conflict.
//!
//! Notification dispatch happens after the write and is best-effort; a
//! failed delivery never rolls a transition back.

use crate::event_bus::EventBus;
use crate::locks::LockRegistry;
use crate::state::{now_secs, OrderStateMachine};
use crate::{authz, validation};
use market_dispatch::{
	ChatInterface, Notification, NotificationKind, NotificationService,
};
use market_storage::StorageService;
use market_types::{
	new_id, truncate_id, Actor, DisputeResolution, ExecutorProfile, MarketError, MarketEvent,
	Order, OrderEvent, OrderResponse, OrderStatus, Role, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;

/// Seconds in a day, used to turn a proposed duration into a deadline.
const DAY_SECS: u64 = 86_400;

/// Input for posting a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
	pub title: String,
	pub description: String,
	pub budget_min: u64,
	pub budget_max: u64,
	pub deadline: Option<u64>,
	pub is_public: bool,
}

/// The order lifecycle engine.
pub struct LifecycleEngine {
	state: OrderStateMachine,
	storage: Arc<StorageService>,
	locks: Arc<LockRegistry>,
	profile_locks: Arc<LockRegistry>,
	chat: Arc<dyn ChatInterface>,
	notifier: Arc<NotificationService>,
	event_bus: EventBus,
}

impl LifecycleEngine {
	pub(crate) fn new(
		storage: Arc<StorageService>,
		locks: Arc<LockRegistry>,
		profile_locks: Arc<LockRegistry>,
		chat: Arc<dyn ChatInterface>,
		notifier: Arc<NotificationService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			state: OrderStateMachine::new(storage.clone()),
			storage,
			locks,
			profile_locks,
			chat,
			notifier,
			event_bus,
		}
	}

	/// Posts a new order on behalf of a client.
	#[instrument(skip_all, fields(client_id = %actor.id))]
	pub async fn create_order(&self, actor: &Actor, input: NewOrder) -> Result<Order, MarketError> {
		if actor.role != Role::Client {
			return Err(MarketError::Forbidden(
				"Only clients may post orders".into(),
			));
		}
		validation::validate_text("Title", &input.title)?;
		validation::validate_text("Description", &input.description)?;
		validation::validate_budget(input.budget_min, input.budget_max)?;

		let now = now_secs();
		let order = Order {
			id: new_id(),
			client_id: actor.id.clone(),
			executor_id: None,
			title: input.title,
			description: input.description,
			budget_min: input.budget_min,
			budget_max: input.budget_max,
			deadline: input.deadline,
			agreed_price: None,
			agreed_deadline: None,
			status: OrderStatus::New,
			view_count: 0,
			response_count: 0,
			created_at: now,
			started_at: None,
			completed_at: None,
			updated_at: now,
			is_public: input.is_public,
			is_deleted: false,
			chat_room_id: None,
		};
		self.state.store_order(&order).await?;

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Created {
				order_id: order.id.clone(),
			}))
			.ok();
		Ok(order)
	}

	/// Reads an order through its serialization point.
	///
	/// Taking the lock means a reader never observes the gap inside a
	/// dispute resolution, where the dispute has committed but the order
	/// has not.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, MarketError> {
		let _guard = self.locks.acquire(order_id).await;
		self.state.get_order(order_id).await
	}

	/// Bumps the order's view counter. Best-effort, out-of-band from
	/// status.
	///
	/// The bump still takes the order's lock: the write persists the whole
	/// row, and an unlocked read-modify-write could clobber a transition
	/// committed in between.
	pub async fn record_view(&self, order_id: &str) -> Result<(), MarketError> {
		let _guard = self.locks.acquire(order_id).await;
		self.state
			.update_order_with(order_id, |o| o.view_count += 1)
			.await?;
		Ok(())
	}

	/// Selects an executor's response, moving the order New -> InProgress.
	///
	/// Marks the chosen response selected, fixes the agreed price and
	/// deadline from the proposal, opens the chat room between the
	/// parties, and notifies the executor.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn select_executor(
		&self,
		actor: &Actor,
		order_id: &str,
		response_id: &str,
	) -> Result<Order, MarketError> {
		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::New {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and no longer accepts selection",
				truncate_id(order_id),
				order.status
			)));
		}
		if !authz::is_order_client(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only the order's client may select an executor".into(),
			));
		}

		let response: OrderResponse = self
			.storage
			.retrieve_optional(StorageKey::Responses.as_str(), response_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.ok_or_else(|| {
				MarketError::NotFound(format!(
					"Response {} does not exist",
					truncate_id(response_id)
				))
			})?;
		if response.order_id != order.id {
			return Err(MarketError::Conflict(
				"Response belongs to a different order".into(),
			));
		}
		if response.selected {
			return Err(MarketError::Conflict("Response is already selected".into()));
		}

		// The chat collaborator is idempotent, so calling it before the
		// commit cannot leave a duplicate room behind on failure.
		let room = self
			.chat
			.get_or_create_room(order_id, &order.client_id, Some(&response.executor_id))
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		let now = now_secs();
		let agreed_price = response.proposed_price.unwrap_or(order.budget_max);
		let agreed_deadline = response
			.proposed_days
			.map(|days| now + u64::from(days) * DAY_SECS)
			.or(order.deadline);
		let executor_id = response.executor_id.clone();

		let order = self
			.state
			.apply_transition(order_id, OrderStatus::InProgress, |o| {
				o.executor_id = Some(executor_id.clone());
				o.agreed_price = Some(agreed_price);
				o.agreed_deadline = agreed_deadline;
				o.started_at = Some(now);
				o.chat_room_id = Some(room.clone());
			})
			.await?;

		// Selection is irreversible; the flag goes down only after the
		// order transition has won.
		let mut selected = response;
		selected.selected = true;
		selected.updated_at = now;
		self.storage
			.update(StorageKey::Responses.as_str(), response_id, &selected)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		self.notifier
			.notify(self.notification(
				&selected.executor_id,
				NotificationKind::ExecutorSelected,
				"You were selected",
				format!("The client selected your response on \"{}\"", order.title),
				order_id,
			))
			.await;

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::ExecutorSelected {
				order_id: order_id.to_string(),
				executor_id: selected.executor_id.clone(),
				response_id: response_id.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Submits work for client review, InProgress/Revision -> OnReview.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn submit_for_review(
		&self,
		actor: &Actor,
		order_id: &str,
	) -> Result<Order, MarketError> {
		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if !matches!(
			order.status,
			OrderStatus::InProgress | OrderStatus::Revision
		) {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and cannot be submitted for review",
				truncate_id(order_id),
				order.status
			)));
		}
		if !authz::is_assigned_executor(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only the assigned executor may submit work for review".into(),
			));
		}

		let order = self
			.state
			.apply_transition(order_id, OrderStatus::OnReview, |_| {})
			.await?;

		self.notifier
			.notify(self.notification(
				&order.client_id,
				NotificationKind::WorkSubmitted,
				"Work submitted for review",
				format!("The executor submitted work on \"{}\"", order.title),
				order_id,
			))
			.await;

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::SubmittedForReview {
				order_id: order_id.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Approves submitted work, OnReview -> Completed.
	///
	/// Sets the completion timestamp and bumps the executor's completed
	/// and total order counters.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn approve_work(&self, actor: &Actor, order_id: &str) -> Result<Order, MarketError> {
		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::OnReview {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and cannot be approved",
				truncate_id(order_id),
				order.status
			)));
		}
		if !authz::is_order_client(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only the order's client may approve work".into(),
			));
		}

		let now = now_secs();
		let order = self
			.state
			.apply_transition(order_id, OrderStatus::Completed, |o| {
				o.completed_at = Some(now);
			})
			.await?;

		if let Some(executor_id) = order.executor_id.as_deref() {
			self.bump_executor_counters(executor_id).await?;

			self.notifier
				.notify(self.notification(
					executor_id,
					NotificationKind::WorkApproved,
					"Work approved",
					format!("The client approved your work on \"{}\"", order.title),
					order_id,
				))
				.await;
		}

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Completed {
				order_id: order_id.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Requests changes to submitted work, OnReview -> Revision.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn request_revision(
		&self,
		actor: &Actor,
		order_id: &str,
		reason: &str,
	) -> Result<Order, MarketError> {
		validation::validate_text("Revision reason", reason)?;

		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::OnReview {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and cannot be sent to revision",
				truncate_id(order_id),
				order.status
			)));
		}
		if !authz::is_order_client(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only the order's client may request a revision".into(),
			));
		}

		let order = self
			.state
			.apply_transition(order_id, OrderStatus::Revision, |_| {})
			.await?;

		if let Some(executor_id) = order.executor_id.as_deref() {
			self.notifier
				.notify(self.notification(
					executor_id,
					NotificationKind::RevisionRequested,
					"Revision requested",
					format!("The client requested changes: {}", reason),
					order_id,
				))
				.await;
		}

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::RevisionRequested {
				order_id: order_id.to_string(),
				reason: reason.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Cancels an order, allowed to the client only while it is still New
	/// (no executor selected yet).
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel_order(&self, actor: &Actor, order_id: &str) -> Result<Order, MarketError> {
		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::New {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and can no longer be cancelled by the client",
				truncate_id(order_id),
				order.status
			)));
		}
		if !authz::is_order_client(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only the order's client may cancel it".into(),
			));
		}

		let order = self
			.state
			.apply_transition(order_id, OrderStatus::Cancelled, |_| {})
			.await?;

		self.event_bus
			.publish(MarketEvent::Order(OrderEvent::Cancelled {
				order_id: order_id.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Soft-deletes an order, allowed to the client only while it is New.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn delete_order(&self, actor: &Actor, order_id: &str) -> Result<(), MarketError> {
		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if order.status != OrderStatus::New {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and cannot be deleted",
				truncate_id(order_id),
				order.status
			)));
		}
		if !authz::is_order_client(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only the order's client may delete it".into(),
			));
		}

		self.state
			.update_order_with(order_id, |o| o.is_deleted = true)
			.await?;
		Ok(())
	}

	/// Forces the order into Disputed on behalf of the dispute sub-flow.
	///
	/// The caller must hold the order's lock; preconditions (disputable
	/// status, acting party, no existing dispute) are checked there.
	pub(crate) async fn mark_disputed(
		&self,
		order_id: &str,
		chat_room_id: &str,
	) -> Result<Order, MarketError> {
		let room = chat_room_id.to_string();
		self.state
			.apply_transition(order_id, OrderStatus::Disputed, |o| {
				if o.chat_room_id.is_none() {
					o.chat_room_id = Some(room);
				}
			})
			.await
	}

	/// Drives the order out of Disputed into its terminal state as part of
	/// a dispute resolution. The caller must hold the order's lock.
	///
	/// Favoring the executor means the work stands: the order completes
	/// and its completion timestamp is set. Favoring the client cancels
	/// the order.
	pub(crate) async fn apply_dispute_outcome(
		&self,
		order_id: &str,
		resolution: DisputeResolution,
	) -> Result<Order, MarketError> {
		let (target, event) = match resolution {
			DisputeResolution::FavorExecutor => (
				OrderStatus::Completed,
				OrderEvent::Completed {
					order_id: order_id.to_string(),
				},
			),
			DisputeResolution::FavorClient => (
				OrderStatus::Cancelled,
				OrderEvent::Cancelled {
					order_id: order_id.to_string(),
				},
			),
		};

		let now = now_secs();
		let order = self
			.state
			.apply_transition(order_id, target, |o| {
				if target == OrderStatus::Completed && o.completed_at.is_none() {
					o.completed_at = Some(now);
				}
			})
			.await?;

		for party in [Some(order.client_id.as_str()), order.executor_id.as_deref()]
			.into_iter()
			.flatten()
		{
			self.notifier
				.notify(self.notification(
					party,
					NotificationKind::DisputeResolved,
					"Dispute resolved",
					format!("The dispute on \"{}\" was resolved; the order is now {}", order.title, order.status),
					order_id,
				))
				.await;
		}

		self.event_bus.publish(MarketEvent::Order(event)).ok();

		Ok(order)
	}

	/// Bumps the executor's completed and total order counters.
	///
	/// Profile writes span orders, so they serialize on the executor's own
	/// lock rather than the order's.
	async fn bump_executor_counters(&self, executor_id: &str) -> Result<(), MarketError> {
		let _guard = self.profile_locks.acquire(executor_id).await;
		let mut profile: ExecutorProfile = self
			.storage
			.retrieve_optional(StorageKey::Executors.as_str(), executor_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?
			.unwrap_or_else(|| ExecutorProfile {
				executor_id: executor_id.to_string(),
				..ExecutorProfile::default()
			});
		profile.completed_orders += 1;
		profile.total_orders += 1;
		self.storage
			.store(StorageKey::Executors.as_str(), executor_id, &profile)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))
	}

	fn notification(
		&self,
		recipient_id: &str,
		kind: NotificationKind,
		title: &str,
		message: String,
		order_id: &str,
	) -> Notification {
		Notification {
			recipient_id: recipient_id.to_string(),
			kind,
			title: title.to_string(),
			message,
			order_id: order_id.to_string(),
			link: Some(format!("/orders/{}", order_id)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{
		client, executor, other_executor, post_order, respond, services, start_order,
	};
	use market_types::Role;

	#[tokio::test]
	async fn test_selection_fixes_terms_and_marks_one_response() {
		let services = services();
		let order = post_order(&services).await;

		let cheap = respond(&services, &executor(), &order.id, 100).await;
		let pricey = respond(&services, &other_executor(), &order.id, 120).await;

		let order = services
			.lifecycle
			.select_executor(&client(), &order.id, &cheap.id)
			.await
			.unwrap();

		assert_eq!(order.status, OrderStatus::InProgress);
		assert_eq!(order.agreed_price, Some(100));
		assert_eq!(order.executor_id.as_deref(), Some("executor-1"));
		assert!(order.started_at.is_some());
		assert!(order.chat_room_id.is_some());

		let cheap = services.responses.get_response(&cheap.id).await.unwrap();
		let pricey = services.responses.get_response(&pricey.id).await.unwrap();
		assert!(cheap.selected);
		assert!(!pricey.selected);
	}

	#[tokio::test]
	async fn test_concurrent_selection_has_exactly_one_winner() {
		let services = services();
		let order = post_order(&services).await;
		let first = respond(&services, &executor(), &order.id, 100).await;
		let second = respond(&services, &other_executor(), &order.id, 120).await;

		let engine_a = services.lifecycle.clone();
		let engine_b = services.lifecycle.clone();
		let (order_a, order_b) = (order.id.clone(), order.id.clone());
		let (resp_a, resp_b) = (first.id.clone(), second.id.clone());

		let a = tokio::spawn(async move {
			engine_a.select_executor(&client(), &order_a, &resp_a).await
		});
		let b = tokio::spawn(async move {
			engine_b.select_executor(&client(), &order_b, &resp_b).await
		});
		let (a, b) = (a.await.unwrap(), b.await.unwrap());

		let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
		assert_eq!(winners, 1, "exactly one selection must win");
		let loser = if a.is_err() { a } else { b };
		assert!(matches!(loser, Err(MarketError::Conflict(_))));

		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::InProgress);

		let selected = services
			.responses
			.list_responses(&order.id)
			.await
			.unwrap()
			.into_iter()
			.filter(|r| r.selected)
			.count();
		assert_eq!(selected, 1, "exactly one response may be selected");
	}

	#[tokio::test]
	async fn test_review_revision_loop_to_completion() {
		let services = services();
		let order = start_order(&services).await;

		let order = services
			.lifecycle
			.submit_for_review(&executor(), &order.id)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::OnReview);

		let order = services
			.lifecycle
			.request_revision(&client(), &order.id, "fix typo")
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Revision);

		let order = services
			.lifecycle
			.submit_for_review(&executor(), &order.id)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::OnReview);

		let order = services
			.lifecycle
			.approve_work(&client(), &order.id)
			.await
			.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);
		assert!(order.completed_at.is_some());

		let profile = services
			.reviews
			.get_executor_profile("executor-1")
			.await
			.unwrap();
		assert_eq!(profile.completed_orders, 1);
		assert_eq!(profile.total_orders, 1);
	}

	#[tokio::test]
	async fn test_approve_outside_on_review_is_a_conflict_for_any_actor() {
		let services = services();
		let order = start_order(&services).await;

		for actor in [client(), executor(), Actor::new("someone", Role::Client)] {
			let result = services.lifecycle.approve_work(&actor, &order.id).await;
			assert!(
				matches!(result, Err(MarketError::Conflict(_))),
				"approve on InProgress must conflict for {}",
				actor.id
			);
		}
	}

	#[tokio::test]
	async fn test_wrong_actor_is_forbidden() {
		let services = services();
		let order = start_order(&services).await;

		// The client cannot submit for review.
		let result = services
			.lifecycle
			.submit_for_review(&client(), &order.id)
			.await;
		assert!(matches!(result, Err(MarketError::Forbidden(_))));

		// A non-client cannot approve once the work is on review.
		services
			.lifecycle
			.submit_for_review(&executor(), &order.id)
			.await
			.unwrap();
		let result = services
			.lifecycle
			.approve_work(&executor(), &order.id)
			.await;
		assert!(matches!(result, Err(MarketError::Forbidden(_))));

		// Nor request a revision.
		let result = services
			.lifecycle
			.request_revision(&other_executor(), &order.id, "because")
			.await;
		assert!(matches!(result, Err(MarketError::Forbidden(_))));
	}

	#[tokio::test]
	async fn test_cancel_only_while_new() {
		let services = services();

		let order = post_order(&services).await;
		let cancelled = services
			.lifecycle
			.cancel_order(&client(), &order.id)
			.await
			.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);

		// Once an executor is selected, cancellation is no longer legal.
		let order = start_order(&services).await;
		let result = services.lifecycle.cancel_order(&client(), &order.id).await;
		assert!(matches!(result, Err(MarketError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_terminal_states_reject_everything() {
		let services = services();
		let order = start_order(&services).await;
		services
			.lifecycle
			.submit_for_review(&executor(), &order.id)
			.await
			.unwrap();
		services
			.lifecycle
			.approve_work(&client(), &order.id)
			.await
			.unwrap();

		let submit = services
			.lifecycle
			.submit_for_review(&executor(), &order.id)
			.await;
		assert!(matches!(submit, Err(MarketError::Conflict(_))));
		let cancel = services.lifecycle.cancel_order(&client(), &order.id).await;
		assert!(matches!(cancel, Err(MarketError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_selection_preconditions() {
		let services = services();
		let order = post_order(&services).await;
		let other_order = post_order(&services).await;
		let response = respond(&services, &executor(), &order.id, 100).await;

		// Unknown response id.
		let result = services
			.lifecycle
			.select_executor(&client(), &order.id, "missing")
			.await;
		assert!(matches!(result, Err(MarketError::NotFound(_))));

		// Response belongs to a different order.
		let result = services
			.lifecycle
			.select_executor(&client(), &other_order.id, &response.id)
			.await;
		assert!(matches!(result, Err(MarketError::Conflict(_))));

		// Only the client selects.
		let result = services
			.lifecycle
			.select_executor(&executor(), &order.id, &response.id)
			.await;
		assert!(matches!(result, Err(MarketError::Forbidden(_))));
	}

	#[tokio::test]
	async fn test_create_order_validation() {
		let services = services();

		let result = services
			.lifecycle
			.create_order(
				&client(),
				NewOrder {
					title: "x".into(),
					description: "y".into(),
					budget_min: 0,
					budget_max: 10,
					deadline: None,
					is_public: true,
				},
			)
			.await;
		assert!(matches!(result, Err(MarketError::Validation(_))));

		let result = services
			.lifecycle
			.create_order(
				&executor(),
				NewOrder {
					title: "x".into(),
					description: "y".into(),
					budget_min: 10,
					budget_max: 20,
					deadline: None,
					is_public: true,
				},
			)
			.await;
		assert!(matches!(result, Err(MarketError::Forbidden(_))));
	}

	#[tokio::test]
	async fn test_view_bumps_racing_a_selection_never_revert_it() {
		let services = services();
		let order = post_order(&services).await;
		let response = respond(&services, &executor(), &order.id, 100).await;

		let mut viewers = Vec::new();
		for _ in 0..16 {
			let engine = services.lifecycle.clone();
			let order_id = order.id.clone();
			viewers.push(tokio::spawn(async move {
				for _ in 0..8 {
					engine.record_view(&order_id).await.unwrap();
					tokio::task::yield_now().await;
				}
			}));
		}
		services
			.lifecycle
			.select_executor(&client(), &order.id, &response.id)
			.await
			.unwrap();
		for viewer in viewers {
			viewer.await.unwrap();
		}

		// The selection stays committed no matter how the bumps interleave,
		// and no bump is lost.
		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::InProgress);
		assert_eq!(order.executor_id.as_deref(), Some("executor-1"));
		assert_eq!(order.agreed_price, Some(100));
		assert_eq!(order.view_count, 16 * 8);
	}

	#[tokio::test]
	async fn test_view_counter_is_monotone() {
		let services = services();
		let order = post_order(&services).await;

		services.lifecycle.record_view(&order.id).await.unwrap();
		services.lifecycle.record_view(&order.id).await.unwrap();

		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.view_count, 2);
	}

	#[tokio::test]
	async fn test_missing_order_is_not_found() {
		let services = services();
		let result = services.lifecycle.get_order("missing").await;
		assert!(matches!(result, Err(MarketError::NotFound(_))));

		// Non-ASCII ids flow through the error message path unharmed.
		let result = services.lifecycle.get_order("1234567é-order").await;
		assert!(matches!(result, Err(MarketError::NotFound(_))));
	}
}
