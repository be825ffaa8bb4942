use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ledger::{TransactionDraft, TransactionType, HOURS_EPSILON};
use crate::shared::{
    ensure_positive_hours, round_hours, Actor, AdjustmentId, DomainError, StudentId,
    TransactionId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Add,
    Subtract,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Add => "add",
            AdjustmentType::Subtract => "subtract",
        }
    }
}

impl FromStr for AdjustmentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(AdjustmentType::Add),
            "subtract" => Ok(AdjustmentType::Subtract),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown adjustment type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(DomainError::DataIntegrity(format!(
                "Unknown approval status: {}",
                other
            ))),
        }
    }
}

/// Manual balance correction awaiting a second party.
///
/// The ledger entry is only written when the adjustment is approved, so a
/// pending or rejected adjustment never moves the balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourAdjustment {
    id: AdjustmentId,
    student_id: StudentId,
    adjustment_type: AdjustmentType,
    hours: f64,
    reason: String,
    approval_status: ApprovalStatus,
    requested_by: String,
    approved_by: Option<String>,
    resolution_notes: Option<String>,
    transaction_id: Option<TransactionId>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl HourAdjustment {
    /// Create a pending adjustment after checking the projected balance.
    pub fn request(
        student_id: StudentId,
        adjustment_type: AdjustmentType,
        hours: f64,
        reason: &str,
        requested_by: &str,
        current_balance: f64,
    ) -> Result<Self, DomainError> {
        let hours = ensure_positive_hours(hours, "Adjustment hours")?;
        if reason.trim().is_empty() {
            return Err(DomainError::Validation(
                "An adjustment reason is required".to_string(),
            ));
        }

        let adjustment = Self {
            id: AdjustmentId::new(),
            student_id,
            adjustment_type,
            hours,
            reason: reason.trim().to_string(),
            approval_status: ApprovalStatus::Pending,
            requested_by: requested_by.to_string(),
            approved_by: None,
            resolution_notes: None,
            transaction_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        adjustment.check_projection(current_balance)?;
        Ok(adjustment)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: AdjustmentId,
        student_id: StudentId,
        adjustment_type: AdjustmentType,
        hours: f64,
        reason: String,
        approval_status: ApprovalStatus,
        requested_by: String,
        approved_by: Option<String>,
        resolution_notes: Option<String>,
        transaction_id: Option<TransactionId>,
        created_at: DateTime<Utc>,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            student_id,
            adjustment_type,
            hours,
            reason,
            approval_status,
            requested_by,
            approved_by,
            resolution_notes,
            transaction_id,
            created_at,
            resolved_at,
        }
    }

    // Getters
    pub fn id(&self) -> &AdjustmentId {
        &self.id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn adjustment_type(&self) -> AdjustmentType {
        self.adjustment_type
    }

    pub fn hours(&self) -> f64 {
        self.hours
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn approval_status(&self) -> ApprovalStatus {
        self.approval_status
    }

    pub fn requested_by(&self) -> &str {
        &self.requested_by
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn is_pending(&self) -> bool {
        self.approval_status == ApprovalStatus::Pending
    }

    /// Positive for `add`, negative for `subtract`
    pub fn signed_hours(&self) -> f64 {
        match self.adjustment_type {
            AdjustmentType::Add => self.hours,
            AdjustmentType::Subtract => -self.hours,
        }
    }

    /// Reject corrections that would leave the balance below zero.
    pub fn check_projection(&self, current_balance: f64) -> Result<f64, DomainError> {
        let projected = round_hours(current_balance + self.signed_hours());
        if projected < -HOURS_EPSILON {
            return Err(DomainError::NegativeBalance(format!(
                "Subtracting {:.2} hours from a balance of {:.2} would leave {:.2}",
                self.hours, current_balance, projected
            )));
        }
        Ok(projected)
    }

    /// Check that `approver` may resolve this adjustment.
    pub fn ensure_resolvable_by(&self, approver: &Actor) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::AlreadyProcessed(format!(
                "Adjustment {} is already {}",
                self.id,
                self.approval_status.as_str()
            )));
        }
        if !approver.is_staff() {
            return Err(DomainError::Auth(format!(
                "User {} cannot resolve adjustments",
                approver.user_id
            )));
        }
        if approver.user_id == self.requested_by {
            return Err(DomainError::Validation(
                "Adjustments must be resolved by someone other than the requester".to_string(),
            ));
        }
        Ok(())
    }

    /// Ledger entry written on approval
    pub fn to_draft(&self, approver: &str) -> TransactionDraft {
        TransactionDraft::new(
            self.student_id.clone(),
            TransactionType::Adjustment,
            self.signed_hours(),
            approver,
        )
        .with_description(format!("Adjustment {}: {}", self.id, self.reason))
    }

    pub fn mark_approved(
        &mut self,
        approver: &str,
        notes: Option<String>,
        transaction_id: TransactionId,
    ) -> Result<(), DomainError> {
        self.transition(ApprovalStatus::Approved, approver, notes)?;
        self.transaction_id = Some(transaction_id);
        Ok(())
    }

    pub fn mark_rejected(&mut self, approver: &str, notes: Option<String>) -> Result<(), DomainError> {
        self.transition(ApprovalStatus::Rejected, approver, notes)
    }

    fn transition(
        &mut self,
        to: ApprovalStatus,
        approver: &str,
        notes: Option<String>,
    ) -> Result<(), DomainError> {
        if !self.is_pending() {
            return Err(DomainError::AlreadyProcessed(format!(
                "Adjustment {} is already {}",
                self.id,
                self.approval_status.as_str()
            )));
        }
        self.approval_status = to;
        self.approved_by = Some(approver.to_string());
        self.resolution_notes = notes.filter(|n| !n.trim().is_empty());
        self.resolved_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(kind: AdjustmentType, hours: f64, balance: f64) -> Result<HourAdjustment, DomainError> {
        HourAdjustment::request(StudentId::new(), kind, hours, "correction", "staff-1", balance)
    }

    #[test]
    fn test_subtract_below_zero_rejected_at_creation() {
        let err = pending(AdjustmentType::Subtract, 5.0, 3.0).unwrap_err();
        assert!(matches!(err, DomainError::NegativeBalance(_)));
        assert!(pending(AdjustmentType::Subtract, 3.0, 3.0).is_ok());
    }

    #[test]
    fn test_new_adjustment_is_pending_without_transaction() {
        let adj = pending(AdjustmentType::Add, 2.0, 0.0).unwrap();
        assert!(adj.is_pending());
        assert!(adj.transaction_id().is_none());
        assert_eq!(adj.signed_hours(), 2.0);
    }

    #[test]
    fn test_requester_cannot_approve() {
        let adj = pending(AdjustmentType::Add, 2.0, 0.0).unwrap();
        let same = Actor::staff("staff-1");
        assert!(matches!(
            adj.ensure_resolvable_by(&same),
            Err(DomainError::Validation(_))
        ));
        let student = Actor::student("student-9");
        assert!(matches!(
            adj.ensure_resolvable_by(&student),
            Err(DomainError::Auth(_))
        ));
        assert!(adj.ensure_resolvable_by(&Actor::admin("admin-1")).is_ok());
    }

    #[test]
    fn test_resolution_happens_once() {
        let mut adj = pending(AdjustmentType::Subtract, 1.0, 4.0).unwrap();
        let draft = adj.to_draft("admin-1");
        assert_eq!(draft.hours_amount, -1.0);
        assert_eq!(draft.transaction_type, TransactionType::Adjustment);

        adj.mark_approved("admin-1", Some("ok".into()), TransactionId::new())
            .unwrap();
        assert_eq!(adj.approval_status(), ApprovalStatus::Approved);
        assert!(adj.transaction_id().is_some());

        assert!(matches!(
            adj.mark_rejected("admin-1", None),
            Err(DomainError::AlreadyProcessed(_))
        ));
        assert!(matches!(
            adj.ensure_resolvable_by(&Actor::admin("admin-2")),
            Err(DomainError::AlreadyProcessed(_))
        ));
    }
}
