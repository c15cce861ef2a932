//! Subscription gate.
//!
//! Billing lives outside this core. Callers consult the gate before
//! letting a user browse orders or create responses; the state machine
//! itself never checks it.

use async_trait::async_trait;

/// Trait answering whether a user's subscription grants order access.
#[async_trait]
pub trait SubscriptionGate: Send + Sync {
	/// Returns true if the user may browse orders and respond to them.
	async fn can_access_orders(&self, user_id: &str) -> bool;
}

/// Gate that admits everyone. Used in tests and deployments without
/// subscription billing.
pub struct OpenGate;

#[async_trait]
impl SubscriptionGate for OpenGate {
	async fn can_access_orders(&self, _user_id: &str) -> bool {
		true
	}
}
