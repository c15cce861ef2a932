//! Log-based notification channel.
//!
//! Emits each notification as a structured tracing event. Used in
//! development and tests, and as a fallback when no push transport is
//! configured.

use crate::{DispatchError, Notification, NotificationInterface};
use async_trait::async_trait;

/// Notification channel that writes to the tracing log.
pub struct LogNotifier;

impl LogNotifier {
	pub fn new() -> Self {
		Self
	}
}

impl Default for LogNotifier {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl NotificationInterface for LogNotifier {
	async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
		tracing::info!(
			recipient_id = %notification.recipient_id,
			kind = ?notification.kind,
			order_id = %notification.order_id,
			title = %notification.title,
			"Notification dispatched"
		);
		Ok(())
	}
}
