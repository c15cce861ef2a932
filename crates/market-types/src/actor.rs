//! Actor and role types.
//!
//! Every operation on the lifecycle core receives an authenticated actor
//! from the (out-of-scope) auth layer. The core trusts the identity and
//! role and performs only relationship checks: owner, assigned executor,
//! participant, admin.

use serde::{Deserialize, Serialize};

/// Marketplace role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	/// Posts orders and selects executors.
	Client,
	/// Responds to orders and performs the work.
	Executor,
	/// Platform operator with authority to arbitrate and moderate.
	Admin,
}

/// An authenticated actor: id plus role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
	/// Authenticated user id.
	pub id: String,
	/// Authenticated role.
	pub role: Role,
}

impl Actor {
	pub fn new(id: impl Into<String>, role: Role) -> Self {
		Self {
			id: id.into(),
			role,
		}
	}

	/// Returns true for platform admins.
	pub fn is_admin(&self) -> bool {
		self.role == Role::Admin
	}
}
