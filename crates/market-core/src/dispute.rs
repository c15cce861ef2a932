//! Dispute arbitration sub-flow.
//!
//! A nested state machine keyed to a single order, overlapping the
//! lifecycle's Disputed super-state. A party opens the dispute (forcing
//! the order into Disputed through the lifecycle engine), an admin claims
//! it, and the admin's resolution drives the order back out into its
//! terminal state. The dispute write and the order transition happen
//! under the same order lock, so no reader ever sees one without the
//! other.

use crate::event_bus::EventBus;
use crate::lifecycle::LifecycleEngine;
use crate::locks::LockRegistry;
use crate::state::{now_secs, OrderStateMachine};
use crate::{authz, validation};
use market_dispatch::{
	ChatInterface, Notification, NotificationKind, NotificationService,
};
use market_storage::StorageService;
use market_types::{
	new_id, truncate_id, Actor, AdminNote, Dispute, DisputeEvent, DisputeResolution,
	DisputeStatus, Evidence, MarketError, MarketEvent, OrderStatus, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;

/// Input for appending evidence to a dispute.
#[derive(Debug, Clone)]
pub struct NewEvidence {
	pub file_ref: String,
	pub description: String,
}

/// The dispute arbitration service.
pub struct DisputeService {
	storage: Arc<StorageService>,
	state: OrderStateMachine,
	locks: Arc<LockRegistry>,
	engine: Arc<LifecycleEngine>,
	chat: Arc<dyn ChatInterface>,
	notifier: Arc<NotificationService>,
	event_bus: EventBus,
	min_reason_length: usize,
}

impl DisputeService {
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn new(
		storage: Arc<StorageService>,
		locks: Arc<LockRegistry>,
		engine: Arc<LifecycleEngine>,
		chat: Arc<dyn ChatInterface>,
		notifier: Arc<NotificationService>,
		event_bus: EventBus,
		min_reason_length: usize,
	) -> Self {
		Self {
			state: OrderStateMachine::new(storage.clone()),
			storage,
			locks,
			engine,
			chat,
			notifier,
			event_bus,
			min_reason_length,
		}
	}

	/// Opens a dispute on an order.
	///
	/// Either party may open one while the order is in a disputable
	/// state. At most one dispute may ever exist per order: a resolved
	/// dispute still blocks reopening.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), opened_by = %actor.id))]
	pub async fn open_dispute(
		&self,
		actor: &Actor,
		order_id: &str,
		reason: &str,
	) -> Result<Dispute, MarketError> {
		validation::validate_reason(reason, self.min_reason_length)?;

		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		if !authz::can_open_dispute(actor, &order) {
			return Err(MarketError::Forbidden(
				"Only a party to the order may open a dispute".into(),
			));
		}
		if self.find_dispute(order_id).await?.is_some() {
			return Err(MarketError::Conflict(format!(
				"Order {} already has a dispute",
				truncate_id(order_id)
			)));
		}
		if !order.status.is_disputable() {
			return Err(MarketError::Conflict(format!(
				"Order {} is {} and cannot be disputed",
				truncate_id(order_id),
				order.status
			)));
		}

		let room = self
			.chat
			.get_or_create_room(order_id, &order.client_id, order.executor_id.as_deref())
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))?;

		self.engine.mark_disputed(order_id, &room).await?;

		let dispute = Dispute {
			order_id: order_id.to_string(),
			opened_by: actor.id.clone(),
			reason: reason.to_string(),
			status: DisputeStatus::Open,
			chat_room_id: Some(room),
			assigned_admin: None,
			resolution: None,
			resolution_notes: None,
			admin_notes: vec![],
			evidence: vec![],
			created_at: now_secs(),
			resolved_at: None,
		};
		self.store_dispute(&dispute).await?;

		// Notify the counterparty, if the order already has one.
		let other_party = if actor.id == order.client_id {
			order.executor_id.clone()
		} else {
			Some(order.client_id.clone())
		};
		if let Some(recipient) = other_party {
			self.notifier
				.notify(Notification {
					recipient_id: recipient,
					kind: NotificationKind::DisputeOpened,
					title: "Dispute opened".into(),
					message: format!("A dispute was opened on \"{}\"", order.title),
					order_id: order_id.to_string(),
					link: Some(format!("/orders/{}/dispute", order_id)),
				})
				.await;
		}

		self.event_bus
			.publish(MarketEvent::Dispute(DisputeEvent::Opened {
				order_id: order_id.to_string(),
				opened_by: actor.id.clone(),
			}))
			.ok();

		Ok(dispute)
	}

	/// Reads an order's dispute through the order's serialization point.
	pub async fn get_dispute(&self, order_id: &str) -> Result<Dispute, MarketError> {
		let _guard = self.locks.acquire(order_id).await;
		self.load_dispute(order_id).await
	}

	/// Appends an evidence item. Parties and admins only, rejected once
	/// the dispute is resolved.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn add_evidence(
		&self,
		actor: &Actor,
		order_id: &str,
		input: NewEvidence,
	) -> Result<Dispute, MarketError> {
		validation::validate_evidence(&input.file_ref, &input.description)?;

		let _guard = self.locks.acquire(order_id).await;

		let order = self.state.get_order(order_id).await?;
		let mut dispute = self.load_dispute(order_id).await?;
		if dispute.status == DisputeStatus::Resolved {
			return Err(MarketError::Conflict(
				"Evidence cannot be added to a resolved dispute".into(),
			));
		}
		if !authz::can_add_evidence(actor, &order, &dispute) {
			return Err(MarketError::Forbidden(
				"Only parties to the dispute or admins may add evidence".into(),
			));
		}

		dispute.evidence.push(Evidence {
			id: new_id(),
			uploaded_by: actor.id.clone(),
			file_ref: input.file_ref,
			description: input.description,
			created_at: now_secs(),
		});
		self.store_dispute(&dispute).await?;
		Ok(dispute)
	}

	/// Claims the dispute for review, Open -> UnderReview.
	///
	/// Re-claiming while under review is allowed; the last admin to act
	/// wins, there is no ownership lock beyond the status.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), admin_id = %actor.id))]
	pub async fn take_dispute(&self, actor: &Actor, order_id: &str) -> Result<Dispute, MarketError> {
		if !authz::can_arbitrate(actor) {
			return Err(MarketError::Forbidden("Only admins may claim disputes".into()));
		}

		let _guard = self.locks.acquire(order_id).await;

		let mut dispute = self.load_dispute(order_id).await?;
		match dispute.status {
			DisputeStatus::Resolved => {
				return Err(MarketError::Conflict(
					"Dispute is already resolved".into(),
				));
			}
			DisputeStatus::Open => {
				dispute.status = DisputeStatus::UnderReview;
			}
			DisputeStatus::UnderReview => {}
		}
		dispute.assigned_admin = Some(actor.id.clone());
		self.store_dispute(&dispute).await?;

		self.event_bus
			.publish(MarketEvent::Dispute(DisputeEvent::Taken {
				order_id: order_id.to_string(),
				admin_id: actor.id.clone(),
			}))
			.ok();

		Ok(dispute)
	}

	/// Appends a free-text admin note. Any status except Resolved.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn add_admin_note(
		&self,
		actor: &Actor,
		order_id: &str,
		text: &str,
	) -> Result<Dispute, MarketError> {
		if !authz::can_arbitrate(actor) {
			return Err(MarketError::Forbidden("Only admins may annotate disputes".into()));
		}
		validation::validate_text("Admin note", text)?;

		let _guard = self.locks.acquire(order_id).await;

		let mut dispute = self.load_dispute(order_id).await?;
		if dispute.status == DisputeStatus::Resolved {
			return Err(MarketError::Conflict(
				"Notes cannot be added to a resolved dispute".into(),
			));
		}

		dispute.admin_notes.push(AdminNote {
			admin_id: actor.id.clone(),
			text: text.to_string(),
			created_at: now_secs(),
		});
		self.store_dispute(&dispute).await?;
		Ok(dispute)
	}

	/// Resolves the dispute and drives the parent order to its terminal
	/// state.
	///
	/// Favoring the client cancels the order; favoring the executor
	/// completes it. Both writes happen under the order lock, so reading
	/// the order and the dispute in either afterwards shows consistent
	/// terminal states.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), admin_id = %actor.id))]
	pub async fn resolve_dispute(
		&self,
		actor: &Actor,
		order_id: &str,
		favor_client: bool,
		resolution_notes: &str,
		admin_note: Option<&str>,
	) -> Result<Dispute, MarketError> {
		if !authz::can_arbitrate(actor) {
			return Err(MarketError::Forbidden("Only admins may resolve disputes".into()));
		}
		validation::validate_text("Resolution notes", resolution_notes)?;

		let _guard = self.locks.acquire(order_id).await;

		let mut dispute = self.load_dispute(order_id).await?;
		if dispute.status == DisputeStatus::Resolved {
			// An earlier attempt may have committed the dispute but failed
			// before the order write. A retry re-drives the order instead
			// of wedging the dispute forever.
			let order = self.state.get_order(order_id).await?;
			if order.status == OrderStatus::Disputed {
				if let Some(resolution) = dispute.resolution {
					self.engine.apply_dispute_outcome(order_id, resolution).await?;
					return Ok(dispute);
				}
			}
			return Err(MarketError::Conflict(
				"Dispute is already resolved".into(),
			));
		}

		let resolution = if favor_client {
			DisputeResolution::FavorClient
		} else {
			DisputeResolution::FavorExecutor
		};

		dispute.status = DisputeStatus::Resolved;
		dispute.resolution = Some(resolution);
		dispute.resolution_notes = Some(resolution_notes.to_string());
		dispute.assigned_admin = Some(actor.id.clone());
		dispute.resolved_at = Some(now_secs());
		if let Some(text) = admin_note {
			dispute.admin_notes.push(AdminNote {
				admin_id: actor.id.clone(),
				text: text.to_string(),
				created_at: now_secs(),
			});
		}

		// The dispute record commits first: if the order write fails, a
		// retry finds the resolved dispute and re-drives the order above.
		self.store_dispute(&dispute).await?;
		self.engine.apply_dispute_outcome(order_id, resolution).await?;

		self.event_bus
			.publish(MarketEvent::Dispute(DisputeEvent::Resolved {
				order_id: order_id.to_string(),
				resolution,
			}))
			.ok();

		Ok(dispute)
	}

	/// Loads the dispute for an order, failing when none exists.
	async fn load_dispute(&self, order_id: &str) -> Result<Dispute, MarketError> {
		self.find_dispute(order_id).await?.ok_or_else(|| {
			MarketError::NotFound(format!(
				"Order {} has no dispute",
				truncate_id(order_id)
			))
		})
	}

	async fn find_dispute(&self, order_id: &str) -> Result<Option<Dispute>, MarketError> {
		self.storage
			.retrieve_optional(StorageKey::Disputes.as_str(), order_id)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))
	}

	async fn store_dispute(&self, dispute: &Dispute) -> Result<(), MarketError> {
		self.storage
			.store(StorageKey::Disputes.as_str(), &dispute.order_id, dispute)
			.await
			.map_err(|e| MarketError::Storage(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{admin, client, executor, other_executor, post_order, services, start_order};
	use crate::builder::MarketBuilder;
	use async_trait::async_trait;
	use market_config::Config;
	use market_storage::{
		implementations::memory::MemoryStorage, StorageError, StorageInterface,
	};
	use std::sync::atomic::{AtomicBool, Ordering};

	/// Backend whose order-row writes can be switched off mid-test.
	struct FlakyOrderWrites {
		inner: MemoryStorage,
		fail_order_writes: Arc<AtomicBool>,
	}

	#[async_trait]
	impl StorageInterface for FlakyOrderWrites {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			if key.starts_with("orders:") && self.fail_order_writes.load(Ordering::SeqCst) {
				return Err(StorageError::Backend("disk full".into()));
			}
			self.inner.set_bytes(key, value).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}
	}

	#[tokio::test]
	async fn test_failed_order_write_during_resolution_is_repaired_by_retry() {
		let fail_order_writes = Arc::new(AtomicBool::new(false));
		let services = MarketBuilder::new(Config::default())
			.with_storage(Box::new(FlakyOrderWrites {
				inner: MemoryStorage::new(),
				fail_order_writes: fail_order_writes.clone(),
			}))
			.build()
			.unwrap();
		let order = start_order(&services).await;
		services
			.disputes
			.open_dispute(&client(), &order.id, "deliverable is incomplete")
			.await
			.unwrap();

		// The dispute commits, the order write fails.
		fail_order_writes.store(true, Ordering::SeqCst);
		let result = services
			.disputes
			.resolve_dispute(&admin(), &order.id, true, "refund the client", None)
			.await;
		assert!(matches!(result, Err(MarketError::Storage(_))));
		let dispute = services.disputes.get_dispute(&order.id).await.unwrap();
		assert_eq!(dispute.status, DisputeStatus::Resolved);
		let order_row = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order_row.status, OrderStatus::Disputed);

		// A retry re-drives the stuck order instead of conflicting.
		fail_order_writes.store(false, Ordering::SeqCst);
		let dispute = services
			.disputes
			.resolve_dispute(&admin(), &order.id, true, "refund the client", None)
			.await
			.unwrap();
		assert_eq!(dispute.resolution, Some(DisputeResolution::FavorClient));
		let order_row = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order_row.status, OrderStatus::Cancelled);
	}

	#[tokio::test]
	async fn test_dispute_flow_favoring_client_cancels_the_order() {
		let services = services();
		let order = start_order(&services).await;

		let dispute = services
			.disputes
			.open_dispute(&executor(), &order.id, "work quality is unacceptable")
			.await
			.unwrap();
		assert_eq!(dispute.status, DisputeStatus::Open);
		assert_eq!(dispute.opened_by, "executor-1");

		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Disputed);

		let dispute = services
			.disputes
			.take_dispute(&admin(), &order.id)
			.await
			.unwrap();
		assert_eq!(dispute.status, DisputeStatus::UnderReview);
		assert_eq!(dispute.assigned_admin.as_deref(), Some("admin-1"));

		let dispute = services
			.disputes
			.resolve_dispute(&admin(), &order.id, true, "refund the client", None)
			.await
			.unwrap();
		assert_eq!(dispute.status, DisputeStatus::Resolved);
		assert_eq!(dispute.resolution, Some(DisputeResolution::FavorClient));
		assert!(dispute.resolved_at.is_some());

		// Reading order and dispute in either afterwards is consistent.
		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Cancelled);
		let dispute = services.disputes.get_dispute(&order.id).await.unwrap();
		assert_eq!(dispute.status, DisputeStatus::Resolved);
	}

	#[tokio::test]
	async fn test_resolution_favoring_executor_completes_the_order() {
		let services = services();
		let order = start_order(&services).await;

		services
			.disputes
			.open_dispute(&client(), &order.id, "deadline was missed badly")
			.await
			.unwrap();
		services
			.disputes
			.take_dispute(&admin(), &order.id)
			.await
			.unwrap();
		let dispute = services
			.disputes
			.resolve_dispute(&admin(), &order.id, false, "delivery matches the brief", None)
			.await
			.unwrap();
		assert_eq!(dispute.resolution, Some(DisputeResolution::FavorExecutor));

		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Completed);
		assert!(order.completed_at.is_some());
	}

	#[tokio::test]
	async fn test_any_existing_dispute_blocks_reopening_for_both_parties() {
		let services = services();
		let order = start_order(&services).await;

		services
			.disputes
			.open_dispute(&executor(), &order.id, "work quality is unacceptable")
			.await
			.unwrap();

		for actor in [executor(), client()] {
			let result = services
				.disputes
				.open_dispute(&actor, &order.id, "still not resolved at all")
				.await;
			assert!(
				matches!(result, Err(MarketError::Conflict(_))),
				"open while a dispute exists must conflict for {}",
				actor.id
			);
		}

		// Resolved disputes block reopening forever.
		services
			.disputes
			.take_dispute(&admin(), &order.id)
			.await
			.unwrap();
		services
			.disputes
			.resolve_dispute(&admin(), &order.id, true, "refund the client", None)
			.await
			.unwrap();
		let result = services
			.disputes
			.open_dispute(&client(), &order.id, "reopening after resolution")
			.await;
		assert!(matches!(result, Err(MarketError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_evidence_is_append_only_until_resolution() {
		let services = services();
		let order = start_order(&services).await;
		services
			.disputes
			.open_dispute(&client(), &order.id, "deliverable is incomplete")
			.await
			.unwrap();

		let dispute = services
			.disputes
			.add_evidence(
				&executor(),
				&order.id,
				NewEvidence {
					file_ref: "s3://evidence/chat-log.png".into(),
					description: "agreed scope in chat".into(),
				},
			)
			.await
			.unwrap();
		assert_eq!(dispute.evidence.len(), 1);
		assert_eq!(dispute.evidence[0].uploaded_by, "executor-1");

		// Admins may add evidence too.
		services
			.disputes
			.add_evidence(
				&admin(),
				&order.id,
				NewEvidence {
					file_ref: "s3://evidence/invoice.pdf".into(),
					description: "billing record".into(),
				},
			)
			.await
			.unwrap();

		// A stranger may not.
		let stranger = services
			.disputes
			.add_evidence(
				&other_executor(),
				&order.id,
				NewEvidence {
					file_ref: "s3://evidence/x.png".into(),
					description: "unrelated".into(),
				},
			)
			.await;
		assert!(matches!(stranger, Err(MarketError::Forbidden(_))));

		services
			.disputes
			.resolve_dispute(&admin(), &order.id, true, "refund the client", None)
			.await
			.unwrap();

		let late = services
			.disputes
			.add_evidence(
				&client(),
				&order.id,
				NewEvidence {
					file_ref: "s3://evidence/late.png".into(),
					description: "after the fact".into(),
				},
			)
			.await;
		assert!(matches!(late, Err(MarketError::Conflict(_))));

		let dispute = services.disputes.get_dispute(&order.id).await.unwrap();
		assert_eq!(dispute.evidence.len(), 2);
	}

	#[tokio::test]
	async fn test_reclaiming_under_review_lets_the_last_admin_win() {
		let services = services();
		let order = start_order(&services).await;
		services
			.disputes
			.open_dispute(&client(), &order.id, "deliverable is incomplete")
			.await
			.unwrap();

		services
			.disputes
			.take_dispute(&admin(), &order.id)
			.await
			.unwrap();
		let second_admin = Actor::new("admin-2", market_types::Role::Admin);
		let dispute = services
			.disputes
			.take_dispute(&second_admin, &order.id)
			.await
			.unwrap();
		assert_eq!(dispute.status, DisputeStatus::UnderReview);
		assert_eq!(dispute.assigned_admin.as_deref(), Some("admin-2"));

		services
			.disputes
			.resolve_dispute(&admin(), &order.id, false, "work stands", None)
			.await
			.unwrap();
		let taken = services.disputes.take_dispute(&admin(), &order.id).await;
		assert!(matches!(taken, Err(MarketError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_admin_notes_freeze_at_resolution() {
		let services = services();
		let order = start_order(&services).await;
		services
			.disputes
			.open_dispute(&client(), &order.id, "deliverable is incomplete")
			.await
			.unwrap();

		let dispute = services
			.disputes
			.add_admin_note(&admin(), &order.id, "requested both parties' contracts")
			.await
			.unwrap();
		assert_eq!(dispute.admin_notes.len(), 1);

		services
			.disputes
			.resolve_dispute(&admin(), &order.id, false, "work stands", Some("case closed"))
			.await
			.unwrap();
		let dispute = services.disputes.get_dispute(&order.id).await.unwrap();
		assert_eq!(dispute.admin_notes.len(), 2);

		let late = services
			.disputes
			.add_admin_note(&admin(), &order.id, "one more thing")
			.await;
		assert!(matches!(late, Err(MarketError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_dispute_authorization() {
		let services = services();
		let order = start_order(&services).await;

		// A non-party cannot open a dispute.
		let result = services
			.disputes
			.open_dispute(&other_executor(), &order.id, "I do not like this order")
			.await;
		assert!(matches!(result, Err(MarketError::Forbidden(_))));

		services
			.disputes
			.open_dispute(&client(), &order.id, "deliverable is incomplete")
			.await
			.unwrap();

		// Parties cannot arbitrate.
		let take = services.disputes.take_dispute(&client(), &order.id).await;
		assert!(matches!(take, Err(MarketError::Forbidden(_))));
		let resolve = services
			.disputes
			.resolve_dispute(&executor(), &order.id, false, "done", None)
			.await;
		assert!(matches!(resolve, Err(MarketError::Forbidden(_))));
	}

	#[tokio::test]
	async fn test_reason_length_is_validated_first() {
		let services = services();
		let order = start_order(&services).await;

		let result = services
			.disputes
			.open_dispute(&client(), &order.id, "too short")
			.await;
		assert!(matches!(result, Err(MarketError::Validation(_))));

		// Nothing was created and the order did not move.
		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::InProgress);
		let dispute = services.disputes.get_dispute(&order.id).await;
		assert!(matches!(dispute, Err(MarketError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_terminal_orders_cannot_be_disputed() {
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

		let result = services
			.disputes
			.open_dispute(&client(), &order.id, "changed my mind about it")
			.await;
		assert!(matches!(result, Err(MarketError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_dispute_on_new_order_notifies_nobody_but_still_moves_it() {
		let services = services();
		let order = post_order(&services).await;

		// Only the client is a party while the order is New.
		let dispute = services
			.disputes
			.open_dispute(&client(), &order.id, "posted by mistake, locked out")
			.await
			.unwrap();
		assert_eq!(dispute.status, DisputeStatus::Open);

		let order = services.lifecycle.get_order(&order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Disputed);
	}

	#[tokio::test]
	async fn test_operations_on_missing_dispute_are_not_found() {
		let services = services();
		let order = start_order(&services).await;

		let take = services.disputes.take_dispute(&admin(), &order.id).await;
		assert!(matches!(take, Err(MarketError::NotFound(_))));
		let resolve = services
			.disputes
			.resolve_dispute(&admin(), &order.id, true, "nothing to resolve", None)
			.await;
		assert!(matches!(resolve, Err(MarketError::NotFound(_))));
	}
}
