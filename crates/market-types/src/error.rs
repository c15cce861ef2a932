//! Error taxonomy surfaced to callers of the lifecycle core.
//!
//! Every operation fails with exactly one of these kinds so the transport
//! boundary can map them to distinct status codes: "that no longer exists"
//! (NotFound), "you are not allowed" (Forbidden), "illegal in the current
//! state" (Conflict), "malformed input" (Validation), or an infrastructure
//! failure (Storage). None of them are retried internally.

use thiserror::Error;

/// Errors raised by lifecycle, response, dispute, and review operations.
#[derive(Debug, Error)]
pub enum MarketError {
	/// The referenced order, response, dispute, or user does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The actor lacks the role or relationship for the requested action.
	#[error("Forbidden: {0}")]
	Forbidden(String),
	/// The action is well-formed but illegal in the current state.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// Malformed input, rejected before any state is touched.
	#[error("Validation error: {0}")]
	Validation(String),
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl MarketError {
	/// Returns the stable machine-readable code for this error kind.
	pub fn code(&self) -> &'static str {
		match self {
			MarketError::NotFound(_) => "not_found",
			MarketError::Forbidden(_) => "forbidden",
			MarketError::Conflict(_) => "conflict",
			MarketError::Validation(_) => "validation",
			MarketError::Storage(_) => "storage",
		}
	}
}
