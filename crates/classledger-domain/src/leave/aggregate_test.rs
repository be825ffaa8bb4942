#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::ledger::TransactionType;
    use crate::shared::{BookingId, ClassId, DomainError, StudentId};
    use chrono::{Duration, Utc};

    fn new_request(student: &StudentId, hours_ahead: i64, leave_type: LeaveType) -> (NewLeaveRequest, LeaveValidation) {
        let now = Utc::now();
        let input = NewLeaveRequest {
            student_id: student.clone(),
            class_id: Some(ClassId::new()),
            booking_id: Some(BookingId::new()),
            class_date: now + Duration::hours(hours_ahead),
            class_hours: 2.0,
            leave_type,
            reason: Some("fever".to_string()),
            affected_classes: 1,
        };
        let validation = LeavePolicy::default().validate(
            &LeaveValidationInput {
                class_date: input.class_date,
                leave_type,
                reason: input.reason.clone(),
                affected_classes: 1,
                recent_leave_count: 0,
            },
            now,
        );
        (input, validation)
    }

    #[test]
    fn test_auto_approved_submission() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, 72, LeaveType::Sick);
        let leave = LeaveRequest::submit(input, &validation).unwrap();

        assert_eq!(leave.status(), LeaveStatus::Approved);
        assert!(leave.auto_approved());
        assert_eq!(leave.reviewed_by(), Some(AUTO_APPROVER));
        assert_eq!(leave.hours_to_refund(), 2.0);
        assert!(leave.needs_refund());
        assert!(leave.needs_postponement());
    }

    #[test]
    fn test_manual_submission_stays_pending() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, 30, LeaveType::Personal);
        let leave = LeaveRequest::submit(input, &validation).unwrap();

        assert_eq!(leave.status(), LeaveStatus::Pending);
        assert_eq!(leave.refund_percentage(), 50.0);
        assert_eq!(leave.hours_to_refund(), 1.0);
        assert!(!leave.needs_refund());
    }

    #[test]
    fn test_invalid_validation_blocks_submission() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, -1, LeaveType::Sick);
        let err = LeaveRequest::submit(input, &validation).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("past classes")));
    }

    #[test]
    fn test_single_resolution() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, 30, LeaveType::Work);
        let mut leave = LeaveRequest::submit(input, &validation).unwrap();

        leave.approve("staff-1", Some("ok".into())).unwrap();
        assert!(matches!(
            leave.approve("staff-1", None),
            Err(DomainError::AlreadyProcessed(_))
        ));
        assert!(matches!(
            leave.reject("staff-1", None),
            Err(DomainError::AlreadyProcessed(_))
        ));
    }

    #[test]
    fn test_cancel_requires_owner() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, 30, LeaveType::Work);
        let mut leave = LeaveRequest::submit(input, &validation).unwrap();

        assert!(matches!(
            leave.cancel(&StudentId::new()),
            Err(DomainError::Auth(_))
        ));
        leave.cancel(&student).unwrap();
        assert_eq!(leave.status(), LeaveStatus::Cancelled);
        assert!(leave.cancel(&student).is_err());
    }

    #[test]
    fn test_refund_once() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, 72, LeaveType::Family);
        let mut leave = LeaveRequest::submit(input, &validation).unwrap();

        let draft = leave.refund_draft("system").unwrap();
        assert_eq!(draft.transaction_type, TransactionType::Refund);
        assert_eq!(draft.hours_amount, 2.0);

        leave.mark_refund_processed().unwrap();
        assert!(!leave.needs_refund());
        assert!(matches!(
            leave.refund_draft("system"),
            Err(DomainError::AlreadyProcessed(_))
        ));
        assert!(leave.mark_refund_processed().is_err());
    }

    #[test]
    fn test_pending_request_is_not_refunded() {
        let student = StudentId::new();
        let (input, validation) = new_request(&student, 30, LeaveType::Work);
        let leave = LeaveRequest::submit(input, &validation).unwrap();
        assert!(matches!(
            leave.refund_draft("system"),
            Err(DomainError::InvalidState(_))
        ));
    }
}
