use serde::{Deserialize, Serialize};

use classledger_domain::adjustment::HourAdjustment;

use super::TransactionDto;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentDto {
    pub id: String,
    pub student_id: String,
    pub adjustment_type: String,
    pub hours: f64,
    pub reason: String,
    pub approval_status: String,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub resolution_notes: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<&HourAdjustment> for AdjustmentDto {
    fn from(a: &HourAdjustment) -> Self {
        Self {
            id: a.id().to_string(),
            student_id: a.student_id().to_string(),
            adjustment_type: a.adjustment_type().as_str().to_string(),
            hours: a.hours(),
            reason: a.reason().to_string(),
            approval_status: a.approval_status().as_str().to_string(),
            requested_by: a.requested_by().to_string(),
            approved_by: a.approved_by().map(str::to_string),
            resolution_notes: a.resolution_notes().map(str::to_string),
            transaction_id: a.transaction_id().map(|id| id.to_string()),
            created_at: a.created_at().to_rfc3339(),
            resolved_at: a.resolved_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentApprovalDto {
    pub adjustment: AdjustmentDto,
    pub transaction: TransactionDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdjustmentInput {
    pub student_id: String,
    /// `add` or `subtract`
    pub adjustment_type: String,
    pub hours: f64,
    pub reason: String,
}
