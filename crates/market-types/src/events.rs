//! Event types for inter-service communication.
//!
//! This module defines the event system used by the lifecycle core for
//! asynchronous communication between components. Events flow through an
//! event bus allowing observers to react to state changes without being in
//! the transition's failure path.

use crate::DisputeResolution;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all marketplace events.
///
/// Events are categorized by the component that produces them, allowing
/// consumers to filter and handle specific event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
	/// Events from the order lifecycle engine.
	Order(OrderEvent),
	/// Events from the response registry.
	Response(ResponseEvent),
	/// Events from the dispute sub-flow.
	Dispute(DisputeEvent),
	/// Events from the review/rating aggregator.
	Review(ReviewEvent),
}

/// Events produced by order lifecycle transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A client posted a new order.
	Created { order_id: String },
	/// The client selected an executor; the order is now in progress.
	ExecutorSelected {
		order_id: String,
		executor_id: String,
		response_id: String,
	},
	/// The executor submitted work for review.
	SubmittedForReview { order_id: String },
	/// The client requested a revision.
	RevisionRequested { order_id: String, reason: String },
	/// The order reached Completed.
	Completed { order_id: String },
	/// The order reached Cancelled.
	Cancelled { order_id: String },
}

/// Events produced by the response registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseEvent {
	/// An executor responded to an open order.
	Created {
		order_id: String,
		response_id: String,
		executor_id: String,
	},
	/// An executor withdrew an unselected response.
	Deleted {
		order_id: String,
		response_id: String,
	},
}

/// Events produced by the dispute sub-flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DisputeEvent {
	/// A party opened a dispute; the order is now Disputed.
	Opened { order_id: String, opened_by: String },
	/// An admin claimed the dispute for review.
	Taken { order_id: String, admin_id: String },
	/// An admin resolved the dispute and the order reached its terminal
	/// state.
	Resolved {
		order_id: String,
		resolution: DisputeResolution,
	},
}

/// Events produced by the review aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReviewEvent {
	/// A client reviewed a completed order.
	Submitted { order_id: String, rating: u8 },
	/// An executor's aggregate rating was recomputed.
	RatingRecalculated {
		executor_id: String,
		rating: f64,
		review_count: u64,
	},
}
