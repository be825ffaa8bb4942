use serde::{Deserialize, Serialize};

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Student,
    Staff,
    Admin,
}

/// The authenticated caller of an operation.
///
/// Session retrieval lives in the request layer; services only receive the
/// resolved identity and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn student(user_id: impl Into<String>) -> Self {
        Self::new(user_id, ActorRole::Student)
    }

    pub fn staff(user_id: impl Into<String>) -> Self {
        Self::new(user_id, ActorRole::Staff)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, ActorRole::Admin)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self.role, ActorRole::Staff | ActorRole::Admin)
    }

    /// Resolve an optional caller, failing with `AUTH_ERROR` when absent or blank.
    pub fn require(actor: Option<&Actor>) -> Result<&Actor, DomainError> {
        match actor {
            Some(actor) if !actor.user_id.trim().is_empty() => Ok(actor),
            _ => Err(DomainError::Auth(
                "An authenticated user is required for this action".to_string(),
            )),
        }
    }

    /// Resolve a caller that must hold a staff or admin role.
    pub fn require_staff(actor: Option<&Actor>) -> Result<&Actor, DomainError> {
        let actor = Self::require(actor)?;
        if !actor.is_staff() {
            return Err(DomainError::Auth(format!(
                "User {} is not allowed to perform this action",
                actor.user_id
            )));
        }
        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_missing_actor() {
        assert!(matches!(Actor::require(None), Err(DomainError::Auth(_))));

        let blank = Actor::student("  ");
        assert!(Actor::require(Some(&blank)).is_err());
    }

    #[test]
    fn test_require_staff() {
        let student = Actor::student("s-1");
        let staff = Actor::staff("t-1");
        assert!(Actor::require_staff(Some(&student)).is_err());
        assert_eq!(Actor::require_staff(Some(&staff)).unwrap().user_id, "t-1");
    }
}
