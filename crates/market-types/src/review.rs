//! Review and executor reputation types.

use serde::{Deserialize, Serialize};

/// A client's review of a completed order.
///
/// One-to-one with the order; created only once the order reaches
/// Completed. Hidden reviews drop out of the executor's rating average.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
	/// The completed order being reviewed. Also the review's identity.
	pub order_id: String,
	/// The executor being rated.
	pub executor_id: String,
	/// The client who wrote the review.
	pub client_id: String,
	/// Rating from 1 to 5.
	pub rating: u8,
	/// Free-text comment.
	pub comment: String,
	/// Whether the review is visible. Admins may moderate reviews out.
	pub visible: bool,
	/// Timestamp when the review was created.
	pub created_at: u64,
}

/// Aggregated reputation counters for an executor.
///
/// Recomputed from the visible review rows by the rating aggregator;
/// never updated incrementally except for the order counters, which the
/// lifecycle engine bumps at completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorProfile {
	/// The executor this profile belongs to.
	pub executor_id: String,
	/// Average rating over visible reviews, 0.0 when unrated.
	pub rating: f64,
	/// Number of visible reviews.
	pub review_count: u64,
	/// Number of orders this executor completed.
	pub completed_orders: u64,
	/// Number of orders this executor was ever selected for and finished.
	pub total_orders: u64,
}
