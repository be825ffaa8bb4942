use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LeaveStatus, LeaveType, LeaveValidation};
use crate::ledger::{TransactionDraft, TransactionType, HOURS_EPSILON};
use crate::shared::{round_hours, BookingId, ClassId, DomainError, LeaveRequestId, StudentId};

/// Input for `LeaveRequest::submit`, filled from the stored booking and class
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub student_id: StudentId,
    pub class_id: Option<ClassId>,
    pub booking_id: Option<BookingId>,
    pub class_date: DateTime<Utc>,
    /// Refund base: class duration capped at the hours charged for the booking
    pub class_hours: f64,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub affected_classes: u32,
}

/// LeaveRequest aggregate root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    id: LeaveRequestId,
    student_id: StudentId,
    class_id: Option<ClassId>,
    booking_id: Option<BookingId>,
    class_date: DateTime<Utc>,
    leave_type: LeaveType,
    reason: Option<String>,
    hours_before_class: f64,
    meets_48_hour_rule: bool,
    status: LeaveStatus,
    class_hours: f64,
    refund_percentage: f64,
    hours_to_refund: f64,
    refund_processed: bool,
    auto_approved: bool,
    affected_classes: u32,
    reviewed_by: Option<String>,
    review_notes: Option<String>,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
}

/// Column values for `LeaveRequest::restore`
#[derive(Debug, Clone)]
pub struct LeaveRequestRecord {
    pub id: LeaveRequestId,
    pub student_id: StudentId,
    pub class_id: Option<ClassId>,
    pub booking_id: Option<BookingId>,
    pub class_date: DateTime<Utc>,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub hours_before_class: f64,
    pub meets_48_hour_rule: bool,
    pub status: LeaveStatus,
    pub class_hours: f64,
    pub refund_percentage: f64,
    pub hours_to_refund: f64,
    pub refund_processed: bool,
    pub auto_approved: bool,
    pub affected_classes: u32,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

pub const AUTO_APPROVER: &str = "system";

impl LeaveRequest {
    /// Build a request from a passing validation.
    ///
    /// Auto-approvable requests are created already `approved`.
    pub fn submit(input: NewLeaveRequest, validation: &LeaveValidation) -> Result<Self, DomainError> {
        if !validation.is_valid {
            return Err(DomainError::Validation(validation.errors.join("; ")));
        }
        if !input.class_hours.is_finite() || input.class_hours < 0.0 {
            return Err(DomainError::Validation(
                "Class hours cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let refund_percentage = validation.expected_refund_percentage;
        let hours_to_refund = round_hours(input.class_hours * refund_percentage / 100.0);
        let auto_approved = validation.auto_approval;

        Ok(Self {
            id: LeaveRequestId::new(),
            student_id: input.student_id,
            class_id: input.class_id,
            booking_id: input.booking_id,
            class_date: input.class_date,
            leave_type: input.leave_type,
            reason: input.reason.filter(|r| !r.trim().is_empty()),
            hours_before_class: validation.hours_before_class,
            meets_48_hour_rule: validation.meets_48_hour_rule,
            status: if auto_approved {
                LeaveStatus::Approved
            } else {
                LeaveStatus::Pending
            },
            class_hours: round_hours(input.class_hours),
            refund_percentage,
            hours_to_refund,
            refund_processed: false,
            auto_approved,
            affected_classes: input.affected_classes.max(1),
            reviewed_by: auto_approved.then(|| AUTO_APPROVER.to_string()),
            review_notes: None,
            submitted_at: now,
            reviewed_at: auto_approved.then_some(now),
        })
    }

    pub fn restore(record: LeaveRequestRecord) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id,
            class_id: record.class_id,
            booking_id: record.booking_id,
            class_date: record.class_date,
            leave_type: record.leave_type,
            reason: record.reason,
            hours_before_class: record.hours_before_class,
            meets_48_hour_rule: record.meets_48_hour_rule,
            status: record.status,
            class_hours: record.class_hours,
            refund_percentage: record.refund_percentage,
            hours_to_refund: record.hours_to_refund,
            refund_processed: record.refund_processed,
            auto_approved: record.auto_approved,
            affected_classes: record.affected_classes,
            reviewed_by: record.reviewed_by,
            review_notes: record.review_notes,
            submitted_at: record.submitted_at,
            reviewed_at: record.reviewed_at,
        }
    }

    // Getters
    pub fn id(&self) -> &LeaveRequestId {
        &self.id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn class_id(&self) -> Option<&ClassId> {
        self.class_id.as_ref()
    }

    pub fn booking_id(&self) -> Option<&BookingId> {
        self.booking_id.as_ref()
    }

    pub fn class_date(&self) -> DateTime<Utc> {
        self.class_date
    }

    pub fn leave_type(&self) -> LeaveType {
        self.leave_type
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn hours_before_class(&self) -> f64 {
        self.hours_before_class
    }

    pub fn meets_48_hour_rule(&self) -> bool {
        self.meets_48_hour_rule
    }

    pub fn status(&self) -> LeaveStatus {
        self.status
    }

    pub fn class_hours(&self) -> f64 {
        self.class_hours
    }

    pub fn refund_percentage(&self) -> f64 {
        self.refund_percentage
    }

    pub fn hours_to_refund(&self) -> f64 {
        self.hours_to_refund
    }

    pub fn refund_processed(&self) -> bool {
        self.refund_processed
    }

    pub fn auto_approved(&self) -> bool {
        self.auto_approved
    }

    pub fn affected_classes(&self) -> u32 {
        self.affected_classes
    }

    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    pub fn review_notes(&self) -> Option<&str> {
        self.review_notes.as_deref()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    /// Approved, refundable and not refunded yet
    pub fn needs_refund(&self) -> bool {
        self.status == LeaveStatus::Approved
            && !self.refund_processed
            && self.hours_to_refund > HOURS_EPSILON
    }

    /// Approved and tied to a class that now has to be postponed
    pub fn needs_postponement(&self) -> bool {
        self.status == LeaveStatus::Approved && self.booking_id.is_some() && self.class_id.is_some()
    }

    // State transitions

    pub fn approve(&mut self, reviewer: &str, notes: Option<String>) -> Result<(), DomainError> {
        self.resolve(LeaveStatus::Approved, reviewer, notes)
    }

    pub fn reject(&mut self, reviewer: &str, notes: Option<String>) -> Result<(), DomainError> {
        self.resolve(LeaveStatus::Rejected, reviewer, notes)
    }

    /// Withdraw a pending request; only its owner may do so.
    pub fn cancel(&mut self, student_id: &StudentId) -> Result<(), DomainError> {
        if &self.student_id != student_id {
            return Err(DomainError::Auth(format!(
                "Leave request {} belongs to another student",
                self.id
            )));
        }
        self.resolve(LeaveStatus::Cancelled, student_id.as_str(), None)
    }

    fn resolve(
        &mut self,
        to: LeaveStatus,
        reviewer: &str,
        notes: Option<String>,
    ) -> Result<(), DomainError> {
        if self.status != LeaveStatus::Pending {
            return Err(DomainError::AlreadyProcessed(format!(
                "Leave request {} is already {}",
                self.id,
                self.status.as_str()
            )));
        }
        self.status = to;
        self.reviewed_by = Some(reviewer.to_string());
        self.review_notes = notes.filter(|n| !n.trim().is_empty());
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }

    /// Ledger entry for the refund
    pub fn refund_draft(&self, processed_by: &str) -> Result<TransactionDraft, DomainError> {
        if self.refund_processed {
            return Err(DomainError::AlreadyProcessed(format!(
                "Refund for leave request {} already processed",
                self.id
            )));
        }
        if self.status != LeaveStatus::Approved {
            return Err(DomainError::InvalidState(format!(
                "Leave request {} is {}, only approved requests are refunded",
                self.id,
                self.status.as_str()
            )));
        }

        let mut draft = TransactionDraft::new(
            self.student_id.clone(),
            TransactionType::Refund,
            self.hours_to_refund,
            processed_by,
        )
        .with_booking(self.booking_id.clone())
        .with_description(format!(
            "Leave refund ({}%) for request {}",
            self.refund_percentage, self.id
        ));
        draft.class_id = self.class_id.clone();
        Ok(draft)
    }

    pub fn mark_refund_processed(&mut self) -> Result<(), DomainError> {
        if self.refund_processed {
            return Err(DomainError::AlreadyProcessed(format!(
                "Refund for leave request {} already processed",
                self.id
            )));
        }
        self.refund_processed = true;
        Ok(())
    }
}
