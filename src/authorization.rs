//! # Authorization Gate
//!
//! Capability checks invoked before every mutating operation. The acting
//! identity is supplied by the caller's transport layer (token verification
//! happens outside this crate); the gate only compares roles.
//!
//! Step ownership ("is this officer assigned to the active step?") is not a
//! capability: the workflow engine checks it against the step itself.
//!
//! ## Usage
//!
//! ```rust
//! use caseflow_core::authorization::{Actor, AuthorizationGate, Capability, RoleAuthorizationGate};
//! use uuid::Uuid;
//!
//! let gate = RoleAuthorizationGate;
//! let officer = Actor::officer(Uuid::new_v4());
//! assert!(gate.authorize(&officer, Capability::CompleteStep).is_ok());
//! assert!(gate.authorize(&officer, Capability::RedefineWorkflow).is_err());
//! ```

use crate::error::{CaseflowError, CaseflowResult};
use crate::metrics;
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Role carried by an authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[default]
    Officer,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "OFFICER" => Ok(Self::Officer),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

/// The `{identity, role}` pair supplied on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: Uuid) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn officer(id: Uuid) -> Self {
        Self::new(id, Role::Officer)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Operations the gate knows about, in `resource:action` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateCase,
    ReadCase,
    UpdateCaseStatus,
    CompleteStep,
    AttachDocument,
    RedefineWorkflow,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCase => "cases:create",
            Self::ReadCase => "cases:read",
            Self::UpdateCaseStatus => "cases:update_status",
            Self::CompleteStep => "steps:complete",
            Self::AttachDocument => "documents:attach",
            Self::RedefineWorkflow => "workflows:redefine",
        }
    }

    /// Whether only administrators hold this capability
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::RedefineWorkflow)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability-check collaborator consulted before any write
pub trait AuthorizationGate: Send + Sync {
    fn authorize(&self, actor: &Actor, capability: Capability) -> CaseflowResult<()>;
}

/// Default gate: administrators hold every capability, officers all but
/// admin-only ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizationGate;

impl AuthorizationGate for RoleAuthorizationGate {
    fn authorize(&self, actor: &Actor, capability: Capability) -> CaseflowResult<()> {
        if !capability.requires_admin() || actor.is_admin() {
            return Ok(());
        }

        warn!(
            actor_id = %actor.id,
            required = %capability,
            "Capability denied"
        );
        metrics::authorization_denials_total()
            .add(1, &[KeyValue::new("capability", capability.as_str())]);
        Err(CaseflowError::Forbidden {
            actor_id: actor.id,
            capability: capability.to_string(),
        })
    }
}
