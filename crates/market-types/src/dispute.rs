//! Dispute and arbitration types.
//!
//! A dispute is a one-to-one arbitration case attached to an order. Its
//! status moves linearly Open -> UnderReview -> Resolved with no
//! regression; once resolved it blocks reopening forever and rejects any
//! further mutation of its evidence or notes.

use serde::{Deserialize, Serialize};

/// Current status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
	/// Opened by a party, waiting for an admin to claim it.
	Open,
	/// Claimed by an admin, arbitration in progress.
	UnderReview,
	/// Resolved by an admin. Terminal.
	Resolved,
}

/// Outcome of a resolved dispute.
///
/// Favoring the executor means the work stands and the order completes;
/// favoring the client cancels the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeResolution {
	FavorClient,
	FavorExecutor,
}

/// A single item of evidence attached to a dispute.
///
/// The evidence list is append-only and frozen once the dispute resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
	/// Unique identifier for this evidence item.
	pub id: String,
	/// The user who uploaded the evidence.
	pub uploaded_by: String,
	/// Opaque reference to the uploaded file (object-storage key or URL).
	pub file_ref: String,
	/// Uploader's description of the evidence.
	pub description: String,
	/// Timestamp when the evidence was appended.
	pub created_at: u64,
}

/// A free-text note appended by an arbitrating admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNote {
	/// The admin who wrote the note.
	pub admin_id: String,
	/// Note body.
	pub text: String,
	/// Timestamp when the note was appended.
	pub created_at: u64,
}

/// An arbitration case opened by a party to an order.
///
/// Keyed by the order id: at most one dispute may ever exist per order,
/// enforced by existence of the record rather than by counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
	/// The order under dispute. Also the dispute's identity.
	pub order_id: String,
	/// The party who opened the dispute.
	pub opened_by: String,
	/// The reporter's stated reason.
	pub reason: String,
	/// Current status of the dispute.
	pub status: DisputeStatus,
	/// Chat room used for communication with the admin.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chat_room_id: Option<String>,
	/// The admin who claimed the dispute. Last claimer wins while the
	/// dispute is under review.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub assigned_admin: Option<String>,
	/// Outcome, set only at resolution and immutable afterwards.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolution: Option<DisputeResolution>,
	/// Admin's explanation of the outcome.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolution_notes: Option<String>,
	/// Append-only admin working notes.
	#[serde(default)]
	pub admin_notes: Vec<AdminNote>,
	/// Append-only evidence list.
	#[serde(default)]
	pub evidence: Vec<Evidence>,
	/// Timestamp when the dispute was opened.
	pub created_at: u64,
	/// Timestamp when the dispute was resolved.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolved_at: Option<u64>,
}

impl DisputeStatus {
	/// Checks if a dispute state transition is valid. The flow is strictly
	/// linear: Open -> UnderReview -> Resolved, plus the Open -> Resolved
	/// shortcut for disputes resolved without being claimed first.
	pub fn can_transition_to(&self, to: DisputeStatus) -> bool {
		matches!(
			(self, to),
			(DisputeStatus::Open, DisputeStatus::UnderReview)
				| (DisputeStatus::Open, DisputeStatus::Resolved)
				| (DisputeStatus::UnderReview, DisputeStatus::Resolved)
		)
	}
}
