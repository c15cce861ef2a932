//! Common types module for the marketplace lifecycle core.
//!
//! This module defines the core data types and structures used throughout
//! the marketplace backend. It provides a centralized location for shared
//! types to ensure consistency across all components.

/// Actor and role types carried by every authenticated operation.
pub mod actor;
/// Dispute, evidence, and arbitration types.
pub mod dispute;
/// Error taxonomy surfaced to callers of the lifecycle core.
pub mod error;
/// Event types for inter-service communication.
pub mod events;
/// Order and order-status types.
pub mod order;
/// Executor proposal (response) types.
pub mod response;
/// Review and executor reputation types.
pub mod review;
/// Storage namespace keys for persistent data.
pub mod storage;

// Re-export all types for convenient access
pub use actor::*;
pub use dispute::*;
pub use error::*;
pub use events::*;
pub use order::*;
pub use response::*;
pub use review::*;
pub use storage::*;

/// Generates a fresh opaque identifier.
pub fn new_id() -> String {
	uuid::Uuid::new_v4().to_string()
}

/// Utility function to truncate an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
/// Counts characters, not bytes, so a caller-supplied id never panics on
/// a multi-byte boundary.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}
