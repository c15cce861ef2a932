//! Pure authorization checks.
//!
//! Each lifecycle and dispute operation verifies the acting user's
//! relationship to the aggregate with one of these functions before
//! touching any state. They are pure over their inputs and testable
//! without a transport layer; role trust comes from the out-of-scope auth
//! boundary.

use market_types::{Actor, Dispute, DisputeStatus, Order};

/// True if the actor is the order's owning client.
pub fn is_order_client(actor: &Actor, order: &Order) -> bool {
	order.client_id == actor.id
}

/// True if the actor is the order's assigned executor.
pub fn is_assigned_executor(actor: &Actor, order: &Order) -> bool {
	order.executor_id.as_deref() == Some(actor.id.as_str())
}

/// True if the actor is a party to the order (client or assigned
/// executor).
pub fn is_party(actor: &Actor, order: &Order) -> bool {
	order.is_party(&actor.id)
}

/// True if the actor may open a dispute on the order: any party may.
pub fn can_open_dispute(actor: &Actor, order: &Order) -> bool {
	is_party(actor, order)
}

/// True if the actor may append evidence: parties to the disputed order
/// and admins, while the dispute is not yet resolved.
pub fn can_add_evidence(actor: &Actor, order: &Order, dispute: &Dispute) -> bool {
	if dispute.status == DisputeStatus::Resolved {
		return false;
	}
	actor.is_admin() || is_party(actor, order)
}

/// True if the actor may arbitrate (claim, annotate, resolve) disputes.
pub fn can_arbitrate(actor: &Actor) -> bool {
	actor.is_admin()
}
