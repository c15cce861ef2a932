//! Core lifecycle engine for the marketplace backend.
//!
//! This crate owns the order lifecycle state machine and everything that
//! hangs off it: the response registry, the dispute sub-flow, and the
//! review/rating aggregator. It is the only place order status may change.
//! Collaborators (notifications, chat, subscriptions) are driven through
//! the narrow traits in `market-dispatch`, and persistence goes through
//! `market-storage`.
//!
//! Every transition executes as a single read-check-write under a
//! per-order async mutex, so concurrent attempts on the same order are
//! linearized: exactly one wins, the rest observe a conflict against the
//! new state.

/// Pure authorization checks, independent of any transport layer.
pub mod authz;
/// Builder wiring configuration into a running service stack.
pub mod builder;
/// The dispute arbitration sub-flow.
pub mod dispute;
/// Broadcast bus for lifecycle events.
pub mod event_bus;
/// The order lifecycle engine.
pub mod lifecycle;
/// Per-order serialization locks.
pub(crate) mod locks;
/// The response registry.
pub mod responses;
/// Review submission and executor rating recalculation.
pub mod rating;
/// Storage-backed order state machine with transition validation.
pub(crate) mod state;
/// Centralized input validation, run before any state is touched.
pub mod validation;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::{MarketBuilder, MarketServices};
pub use dispute::{DisputeService, NewEvidence};
pub use event_bus::EventBus;
pub use lifecycle::{LifecycleEngine, NewOrder};
pub use rating::ReviewService;
pub use responses::{NewResponse, ResponseRegistry, UpdateResponse};
