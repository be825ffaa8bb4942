use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{ensure_positive_hours, DomainError, StudentId, TransactionId, TransferId};

/// Audit row linking the two sides of an hour transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourTransferLog {
    pub id: TransferId,
    pub from_student_id: StudentId,
    pub to_student_id: StudentId,
    pub hours: f64,
    pub reason: String,
    pub is_family_transfer: bool,
    pub debit_transaction_id: TransactionId,
    pub credit_transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Input for `LedgerRepository::transfer_hours`
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_student_id: StudentId,
    pub to_student_id: StudentId,
    pub hours: f64,
    pub reason: String,
    pub is_family_transfer: bool,
    pub created_by: String,
}

impl TransferRequest {
    pub fn new(
        from_student_id: StudentId,
        to_student_id: StudentId,
        hours: f64,
        reason: impl Into<String>,
        is_family_transfer: bool,
        created_by: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let hours = ensure_positive_hours(hours, "Transfer hours")?;
        if from_student_id == to_student_id {
            return Err(DomainError::Validation(
                "Cannot transfer hours to the same student".to_string(),
            ));
        }

        Ok(Self {
            from_student_id,
            to_student_id,
            hours,
            reason: reason.into().trim().to_string(),
            is_family_transfer,
            created_by: created_by.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_to_self_rejected() {
        let student = StudentId::new();
        let err = TransferRequest::new(student.clone(), student, 1.0, "gift", false, "s")
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_transfer_hours_must_be_positive() {
        assert!(TransferRequest::new(StudentId::new(), StudentId::new(), 0.0, "", false, "s").is_err());
        let req = TransferRequest::new(StudentId::new(), StudentId::new(), 1.256, " sibling ", true, "s")
            .unwrap();
        assert_eq!(req.hours, 1.26);
        assert_eq!(req.reason, "sibling");
    }
}
