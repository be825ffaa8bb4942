use classledger_domain::shared::{Actor, DomainError, StudentId};

/// The caller must be the student themselves or hold a staff role.
pub(crate) fn require_self_or_staff<'a>(
    actor: Option<&'a Actor>,
    student_id: &StudentId,
) -> Result<&'a Actor, DomainError> {
    let actor = Actor::require(actor)?;
    if actor.is_staff() || actor.user_id == student_id.as_str() {
        return Ok(actor);
    }
    Err(DomainError::Auth(format!(
        "User {} cannot act for student {}",
        actor.user_id, student_id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_or_staff() {
        let student = StudentId::from_string("s-1");
        assert!(require_self_or_staff(Some(&Actor::student("s-1")), &student).is_ok());
        assert!(require_self_or_staff(Some(&Actor::staff("t-1")), &student).is_ok());
        assert!(matches!(
            require_self_or_staff(Some(&Actor::student("s-2")), &student),
            Err(DomainError::Auth(_))
        ));
        assert!(require_self_or_staff(None, &student).is_err());
    }
}
