//! Mutation authorization
//!
//! The gate combines the caller's identity with a fresh read of the role
//! relation on every call. No role is cached, so a demoted administrator loses
//! rights on the next request.

use reel_common::UserId;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::DenyReason;
use crate::identity::Actor;
use crate::roles::RoleDirectory;

/// Gated review mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Clone)]
pub struct AuthzGate {
    roles: Arc<dyn RoleDirectory>,
}

impl AuthzGate {
    pub fn new(roles: Arc<dyn RoleDirectory>) -> Self {
        Self { roles }
    }

    /// Decide whether `actor` may perform `action` on a review owned by `owner`
    ///
    /// `owner` is `None` for [`Action::Create`]. An unknown owner on update or
    /// delete leaves only the administrator path.
    pub async fn authorize(
        &self,
        action: Action,
        actor: &Actor,
        owner: Option<&UserId>,
    ) -> Decision {
        let Some(uid) = actor.uid() else {
            debug!(action = %action, "Anonymous caller denied");
            return Decision::Deny(DenyReason::NotAuthenticated);
        };

        let decision = match action {
            Action::Create => Decision::Allow,
            Action::Update | Action::Delete if owner == Some(uid) => Decision::Allow,
            Action::Update | Action::Delete => match self.lookup_admin(uid).await {
                Ok(true) => Decision::Allow,
                Ok(false) => Decision::Deny(DenyReason::NotOwner),
                Err(reason) => Decision::Deny(reason),
            },
        };

        if let Decision::Deny(reason) = decision {
            debug!(action = %action, uid = %uid, ?owner, ?reason, "Mutation denied");
        }
        decision
    }

    /// Gate for administrator-only reads
    pub async fn require_admin(&self, actor: &Actor) -> Decision {
        let Some(uid) = actor.uid() else {
            return Decision::Deny(DenyReason::NotAuthenticated);
        };
        match self.lookup_admin(uid).await {
            Ok(true) => Decision::Allow,
            Ok(false) => Decision::Deny(DenyReason::NotAdmin),
            Err(reason) => Decision::Deny(reason),
        }
    }

    async fn lookup_admin(&self, uid: &UserId) -> Result<bool, DenyReason> {
        self.roles.is_admin(uid).await.map_err(|e| {
            warn!(uid = %uid, error = %e, "Role lookup failed, denying");
            DenyReason::RoleLookupFailed
        })
    }
}
