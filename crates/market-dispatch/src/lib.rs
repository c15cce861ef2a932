//! External collaborators of the marketplace lifecycle core.
//!
//! This module defines the narrow contracts the lifecycle engine drives on
//! transitions: the notification sink, the chat-room collaborator, and the
//! subscription gate. Each is specified as a trait so transports (push,
//! e-mail, websocket) can be swapped without touching the state machine.
//!
//! Notification delivery is best-effort: failures are logged by the
//! service wrapper and never propagated as transition failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod chat;
pub mod subscription;

/// Re-export implementations
pub mod implementations {
	pub mod log;
}

pub use chat::{ChatError, ChatInterface, InMemoryChat};
pub use subscription::{OpenGate, SubscriptionGate};

/// Errors that can occur during notification dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// Error that occurs during delivery to the underlying channel.
	#[error("Delivery error: {0}")]
	Delivery(String),
}

/// Category of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	ExecutorSelected,
	WorkSubmitted,
	RevisionRequested,
	WorkApproved,
	DisputeOpened,
	DisputeResolved,
	OrderCancelled,
}

/// A user-facing notification produced by a lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	/// The user to notify.
	pub recipient_id: String,
	/// Category of the notification.
	pub kind: NotificationKind,
	/// Short headline.
	pub title: String,
	/// Full message body.
	pub message: String,
	/// The order this notification concerns.
	pub order_id: String,
	/// Optional deep link into the client application.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub link: Option<String>,
}

/// Trait defining the interface for notification channels.
///
/// Implementations deliver a notification to the recipient over some
/// transport. Delivery is invoked outside any transition's failure path.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	/// Delivers a single notification.
	async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// High-level notification service wrapping a channel implementation.
///
/// The service owns the fire-and-forget policy: a failed delivery is
/// logged at warn level and swallowed, so the calling transition commits
/// regardless of notification outcome.
pub struct NotificationService {
	channel: Box<dyn NotificationInterface>,
}

impl NotificationService {
	/// Creates a new NotificationService with the specified channel.
	pub fn new(channel: Box<dyn NotificationInterface>) -> Self {
		Self { channel }
	}

	/// Sends a notification, swallowing delivery failures.
	pub async fn notify(&self, notification: Notification) {
		if let Err(e) = self.channel.send(&notification).await {
			tracing::warn!(
				recipient_id = %notification.recipient_id,
				order_id = %notification.order_id,
				error = %e,
				"Notification delivery failed"
			);
		}
	}
}
