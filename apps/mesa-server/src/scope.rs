//! # Access Scope
//!
//! Tenant and verified actor of a request, as forwarded by the identity
//! collaborator in front of this server.
//!
//! ```text
//! x-tenant-id:   venue-42
//! x-actor-id:    staff-7
//! x-actor-name:  Luis
//! x-actor-role:  waiter | cashier | admin | kitchen
//! ```
//!
//! A request missing any of them is rejected with 403 before it reaches a
//! handler.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use mesa_core::{Actor, CoreError, CoreResult, Role, StaffRef};

use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    pub tenant_id: String,
    pub actor: Actor,
}

impl AccessScope {
    pub fn new(tenant_id: impl Into<String>, actor: Actor) -> Self {
        AccessScope {
            tenant_id: tenant_id.into(),
            actor,
        }
    }

    pub fn staff(&self) -> StaffRef {
        self.actor.staff()
    }

    /// Kitchen staff may read and run kitchen transitions, nothing else.
    pub fn require_floor(&self, operation: &str) -> CoreResult<()> {
        if self.actor.role == Role::Kitchen {
            return Err(CoreError::Forbidden(format!(
                "role kitchen cannot {}",
                operation
            )));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for AccessScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<String, ApiError> {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    tracing::warn!(header = name, uri = %parts.uri, "Missing identity header");
                    ApiError::forbidden(format!("missing {} header", name))
                })
        };

        let tenant_id = header(TENANT_HEADER)?;
        let id = header(ACTOR_ID_HEADER)?;
        let name = header(ACTOR_NAME_HEADER)?;
        let role = header(ACTOR_ROLE_HEADER)?;
        let role = Role::parse(&role)
            .ok_or_else(|| ApiError::forbidden(format!("unknown role '{}'", role)))?;

        Ok(AccessScope::new(tenant_id, Actor { id, name, role }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            id: "s1".to_string(),
            name: "Marta".to_string(),
            role,
        }
    }

    #[test]
    fn test_kitchen_cannot_touch_the_floor() {
        let kitchen = AccessScope::new("t1", actor(Role::Kitchen));
        assert!(matches!(
            kitchen.require_floor("pay account"),
            Err(CoreError::Forbidden(_))
        ));

        let waiter = AccessScope::new("t1", actor(Role::Waiter));
        assert!(waiter.require_floor("pay account").is_ok());
        assert_eq!(waiter.staff().name, "Marta");
    }
}
