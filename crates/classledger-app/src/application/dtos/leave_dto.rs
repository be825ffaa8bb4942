use serde::{Deserialize, Serialize};

use classledger_domain::leave::{LeaveRequest, LeaveValidation};

use super::{MakeUpDto, PostponementDto, TransactionDto};
use crate::application::services::LeaveApprovalOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveValidationDto {
    pub is_valid: bool,
    pub hours_before_class: f64,
    #[serde(rename = "meets48HourRule")]
    pub meets_48_hour_rule: bool,
    pub refund_tier: String,
    pub expected_refund_percentage: f64,
    pub auto_approval: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl From<LeaveValidation> for LeaveValidationDto {
    fn from(v: LeaveValidation) -> Self {
        Self {
            is_valid: v.is_valid,
            hours_before_class: v.hours_before_class,
            meets_48_hour_rule: v.meets_48_hour_rule,
            refund_tier: v.refund_tier.as_str().to_string(),
            expected_refund_percentage: v.expected_refund_percentage,
            auto_approval: v.auto_approval,
            warnings: v.warnings,
            errors: v.errors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestDto {
    pub id: String,
    pub student_id: String,
    pub class_id: Option<String>,
    pub booking_id: Option<String>,
    pub class_date: String,
    pub leave_type: String,
    pub reason: Option<String>,
    pub hours_before_class: f64,
    #[serde(rename = "meets48HourRule")]
    pub meets_48_hour_rule: bool,
    pub status: String,
    pub class_hours: f64,
    pub refund_percentage: f64,
    pub hours_to_refund: f64,
    pub refund_processed: bool,
    pub auto_approved: bool,
    pub affected_classes: u32,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub submitted_at: String,
    pub reviewed_at: Option<String>,
}

impl From<&LeaveRequest> for LeaveRequestDto {
    fn from(r: &LeaveRequest) -> Self {
        Self {
            id: r.id().to_string(),
            student_id: r.student_id().to_string(),
            class_id: r.class_id().map(|id| id.to_string()),
            booking_id: r.booking_id().map(|id| id.to_string()),
            class_date: r.class_date().to_rfc3339(),
            leave_type: r.leave_type().as_str().to_string(),
            reason: r.reason().map(str::to_string),
            hours_before_class: r.hours_before_class(),
            meets_48_hour_rule: r.meets_48_hour_rule(),
            status: r.status().as_str().to_string(),
            class_hours: r.class_hours(),
            refund_percentage: r.refund_percentage(),
            hours_to_refund: r.hours_to_refund(),
            refund_processed: r.refund_processed(),
            auto_approved: r.auto_approved(),
            affected_classes: r.affected_classes(),
            reviewed_by: r.reviewed_by().map(str::to_string),
            review_notes: r.review_notes().map(str::to_string),
            submitted_at: r.submitted_at().to_rfc3339(),
            reviewed_at: r.reviewed_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// Result of submitting or approving a leave request.
///
/// Side effects after the status change are reported here. A failed
/// suggestion run shows up in `warnings` and does not undo the approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveOutcomeDto {
    pub request: LeaveRequestDto,
    pub validation: Option<LeaveValidationDto>,
    pub refund: Option<TransactionDto>,
    pub postponement: Option<PostponementDto>,
    pub make_up: Option<MakeUpDto>,
    pub warnings: Vec<String>,
}

impl From<LeaveApprovalOutcome> for LeaveOutcomeDto {
    fn from(outcome: LeaveApprovalOutcome) -> Self {
        Self {
            request: LeaveRequestDto::from(&outcome.request),
            validation: outcome.validation.map(LeaveValidationDto::from),
            refund: outcome.refund.map(TransactionDto::from),
            postponement: outcome.postponement.as_ref().map(PostponementDto::from),
            make_up: outcome.make_up.as_ref().map(MakeUpDto::from),
            warnings: outcome.warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLeaveInput {
    pub student_id: String,
    pub class_date: String,
    pub leave_type: String,
    pub reason: Option<String>,
    #[serde(default = "one")]
    pub affected_classes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeaveInput {
    pub student_id: String,
    /// The class and its start time are taken from this booking
    pub booking_id: String,
    pub leave_type: String,
    pub reason: Option<String>,
    #[serde(default = "one")]
    pub affected_classes: u32,
}

fn one() -> u32 {
    1
}
