use crate::application::dtos::{AdjustmentApprovalDto, AdjustmentDto, CreateAdjustmentInput, TransactionDto};
use crate::application::utils::parse_enum;
use crate::presentation::error::{respond, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::adjustment::AdjustmentType;
use classledger_domain::shared::{Actor, AdjustmentId, ErrorCode, StudentId};

/// Request a manual correction; the ledger is untouched until approval.
pub async fn create_adjustment(
    input: CreateAdjustmentInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<AdjustmentDto> {
    let result = async move {
        let adjustment_type: AdjustmentType =
            parse_enum(&input.adjustment_type, "adjustment type")?;
        state
            .services
            .adjustment
            .create(
                StudentId::from_string(&input.student_id),
                adjustment_type,
                input.hours,
                &input.reason,
                actor,
            )
            .await
    }
    .await;

    respond(
        result.map(|adjustment| AdjustmentDto::from(&adjustment)),
        ErrorCode::AdjustmentCreateError,
    )
}

pub async fn approve_adjustment(
    adjustment_id: String,
    notes: Option<String>,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<AdjustmentApprovalDto> {
    let adjustment_id = AdjustmentId::from_string(&adjustment_id);
    let result = state
        .services
        .adjustment
        .approve(&adjustment_id, actor, notes)
        .await;

    respond(
        result.map(|(adjustment, txn)| AdjustmentApprovalDto {
            adjustment: AdjustmentDto::from(&adjustment),
            transaction: TransactionDto::from(txn),
        }),
        ErrorCode::AdjustmentCreateError,
    )
}

pub async fn reject_adjustment(
    adjustment_id: String,
    notes: Option<String>,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<AdjustmentDto> {
    let adjustment_id = AdjustmentId::from_string(&adjustment_id);
    let result = state
        .services
        .adjustment
        .reject(&adjustment_id, actor, notes)
        .await;

    respond(
        result.map(|adjustment| AdjustmentDto::from(&adjustment)),
        ErrorCode::AdjustmentCreateError,
    )
}

pub async fn get_pending_adjustments(state: &AppState) -> ApiResponse<Vec<AdjustmentDto>> {
    let result = state
        .services
        .adjustment
        .list_pending()
        .await
        .map(|items| items.iter().map(AdjustmentDto::from).collect());
    respond(result, ErrorCode::FetchError)
}
