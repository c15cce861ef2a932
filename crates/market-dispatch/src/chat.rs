//! Chat-room collaborator.
//!
//! The lifecycle engine opens a chat room between the order's parties at
//! executor selection and at dispute open. Room creation is idempotent:
//! asking again for the same order returns the existing room.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur in the chat collaborator.
#[derive(Debug, Error)]
pub enum ChatError {
	/// Error that occurs in the chat backend.
	#[error("Chat backend error: {0}")]
	Backend(String),
}

/// Trait defining the interface to the chat subsystem.
#[async_trait]
pub trait ChatInterface: Send + Sync {
	/// Returns the chat room for the given order, creating it if needed.
	///
	/// Must be idempotent: repeated calls for the same order return the
	/// same room id regardless of which transition asked first.
	async fn get_or_create_room(
		&self,
		order_id: &str,
		client_id: &str,
		executor_id: Option<&str>,
	) -> Result<String, ChatError>;
}

/// In-memory chat-room registry.
///
/// One room per order, allocated on first request.
pub struct InMemoryChat {
	rooms: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryChat {
	pub fn new() -> Self {
		Self {
			rooms: Arc::new(Mutex::new(HashMap::new())),
		}
	}
}

impl Default for InMemoryChat {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ChatInterface for InMemoryChat {
	async fn get_or_create_room(
		&self,
		order_id: &str,
		_client_id: &str,
		_executor_id: Option<&str>,
	) -> Result<String, ChatError> {
		let mut rooms = self.rooms.lock().await;
		let room = rooms
			.entry(order_id.to_string())
			.or_insert_with(|| format!("room-{}", market_types::new_id()));
		Ok(room.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_room_creation_is_idempotent() {
		let chat = InMemoryChat::new();

		let first = chat
			.get_or_create_room("o1", "client", Some("executor"))
			.await
			.unwrap();
		let second = chat.get_or_create_room("o1", "client", None).await.unwrap();
		assert_eq!(first, second);

		let other = chat.get_or_create_room("o2", "client", None).await.unwrap();
		assert_ne!(first, other);
	}
}
