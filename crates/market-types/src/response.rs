//! Executor proposal types.
//!
//! A response is an executor's proposal against an open order. Responses are
//! unique per (order, executor) pair, editable only while the order is still
//! New, and at most one response per order ever carries the selected flag.

use serde::{Deserialize, Serialize};

/// An executor's proposal against an open order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
	/// Unique identifier for this response.
	pub id: String,
	/// The order this response targets.
	pub order_id: String,
	/// The executor who made the proposal.
	pub executor_id: String,
	/// Free-text pitch to the client.
	pub cover_letter: String,
	/// Proposed price in minor currency units, if given.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub proposed_price: Option<u64>,
	/// Proposed duration in days, if given.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub proposed_days: Option<u32>,
	/// Whether the client selected this response. Setting this is
	/// irreversible and fires the order's New -> InProgress transition.
	#[serde(default)]
	pub selected: bool,
	/// Timestamp when this response was created.
	pub created_at: u64,
	/// Timestamp when this response was last updated.
	pub updated_at: u64,
}
