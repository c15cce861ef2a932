//! Order types for the marketplace lifecycle core.
//!
//! This module defines the order aggregate root and its status enum. Orders
//! move through the lifecycle New -> InProgress -> OnReview -> Completed,
//! with Revision and Disputed branches, and Cancelled as the second terminal
//! state. Status may only be changed by the lifecycle engine.

use serde::{Deserialize, Serialize};

/// Current status of an order within its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Posted by a client, open for executor responses.
	New,
	/// An executor has been selected and is working.
	InProgress,
	/// The client requested changes; the executor is reworking.
	Revision,
	/// The executor submitted work for client review.
	OnReview,
	/// The client approved the work, or a dispute resolved in the
	/// executor's favor. Terminal.
	Completed,
	/// A party opened a dispute; arbitration is pending.
	Disputed,
	/// Cancelled before selection, or a dispute resolved in the client's
	/// favor. Terminal.
	Cancelled,
}

impl OrderStatus {
	/// Returns true for states with no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	/// Returns true for states from which a dispute may be opened.
	pub fn is_disputable(&self) -> bool {
		matches!(
			self,
			OrderStatus::New
				| OrderStatus::InProgress
				| OrderStatus::Revision
				| OrderStatus::OnReview
		)
	}
}

impl std::fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			OrderStatus::New => "NEW",
			OrderStatus::InProgress => "IN_PROGRESS",
			OrderStatus::Revision => "REVISION",
			OrderStatus::OnReview => "ON_REVIEW",
			OrderStatus::Completed => "COMPLETED",
			OrderStatus::Disputed => "DISPUTED",
			OrderStatus::Cancelled => "CANCELLED",
		};
		f.write_str(s)
	}
}

/// A unit of work posted by a client, fulfilled by at most one executor.
///
/// The order is the root aggregate: responses and the dispute belong to it
/// and are looked up through explicit child indices, never through an
/// in-memory object graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// The client who posted the order. Immutable.
	pub client_id: String,
	/// The selected executor. None until a response is selected.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub executor_id: Option<String>,
	/// Short title shown in the marketplace feed.
	pub title: String,
	/// Full work description.
	pub description: String,
	/// Lower bound of the client's budget, in minor currency units.
	pub budget_min: u64,
	/// Upper bound of the client's budget, in minor currency units.
	pub budget_max: u64,
	/// Client-proposed deadline as a Unix timestamp, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deadline: Option<u64>,
	/// Price agreed at executor selection. Set exactly once, immutable.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub agreed_price: Option<u64>,
	/// Deadline agreed at executor selection. Set exactly once, immutable.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub agreed_deadline: Option<u64>,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Number of times the order page has been viewed. Monotone,
	/// best-effort, updated out-of-band from status.
	#[serde(default)]
	pub view_count: u64,
	/// Number of responses received. Monotone, best-effort counter; the
	/// child index is the source of truth.
	#[serde(default)]
	pub response_count: u64,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when work started (executor selection). Set exactly once.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub started_at: Option<u64>,
	/// Timestamp when the order reached Completed. Set exactly once.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<u64>,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
	/// Whether the order appears in the open marketplace feed. Gates new
	/// responses; irrelevant to the state machine itself.
	pub is_public: bool,
	/// Soft-deletion flag.
	#[serde(default)]
	pub is_deleted: bool,
	/// Chat room shared by client and executor, opened at selection or at
	/// dispute open.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chat_room_id: Option<String>,
}

impl Order {
	/// Returns true if the given user is the order's client or its
	/// assigned executor.
	pub fn is_party(&self, user_id: &str) -> bool {
		self.client_id == user_id || self.executor_id.as_deref() == Some(user_id)
	}
}
