use uuid::Uuid;

use super::Caller;
use crate::models::Role;
use crate::utils::error::AppError;

/// Minimum standing a caller needs for a route, beyond holding a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    /// The caller owns the resource (promoter of an event, or the account itself), or is an admin.
    OwnerOrAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

pub fn evaluate(caller: &Caller, owner: Option<Uuid>, required: Requirement) -> Decision {
    let allowed = match required {
        Requirement::Authenticated => true,
        Requirement::OwnerOrAdmin => {
            caller.role == Role::Admin || owner.is_some_and(|owner| owner == caller.id)
        }
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Evaluate and turn a denial into a 403.
pub fn enforce(caller: &Caller, owner: Option<Uuid>, required: Requirement) -> Result<(), AppError> {
    match evaluate(caller, owner, required) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::debug!(caller = %caller.id, ?owner, ?required, "Access denied");
            Err(AppError::Forbidden(
                "You are not allowed to perform this action".to_string(),
            ))
        }
    }
}
