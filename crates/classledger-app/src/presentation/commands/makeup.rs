use chrono::Utc;

use crate::application::dtos::{MakeUpDto, PostponementDto};
use crate::presentation::error::{respond, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::shared::{
    Actor, ErrorCode, MakeUpClassId, PostponementId, StudentId, SuggestionId,
};

/// Rank fresh make-up candidates for a postponement
pub async fn generate_makeup_suggestions(
    postponement_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<MakeUpDto> {
    let postponement_id = PostponementId::from_string(&postponement_id);
    let result = async move {
        Actor::require_staff(actor)?;
        state
            .services
            .makeup
            .generate_suggestions(&postponement_id, Utc::now())
            .await
    }
    .await;
    respond(
        result.map(|make_up| MakeUpDto::from(&make_up)),
        ErrorCode::SuggestionCreateError,
    )
}

pub async fn select_makeup_class(
    make_up_id: String,
    suggestion_id: String,
    student_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<MakeUpDto> {
    let make_up_id = MakeUpClassId::from_string(&make_up_id);
    let suggestion_id = SuggestionId::from_string(&suggestion_id);
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .makeup
        .select(&make_up_id, &suggestion_id, &student_id, actor, Utc::now())
        .await;
    respond(
        result.map(|make_up| MakeUpDto::from(&make_up)),
        ErrorCode::SuggestionCreateError,
    )
}

pub async fn approve_makeup_class(
    make_up_id: String,
    notes: Option<String>,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<MakeUpDto> {
    let make_up_id = MakeUpClassId::from_string(&make_up_id);
    let result = state.services.makeup.approve(&make_up_id, actor, notes).await;
    respond(
        result.map(|make_up| MakeUpDto::from(&make_up)),
        ErrorCode::SuggestionCreateError,
    )
}

/// Book the approved class and close out the postponement
pub async fn schedule_makeup_class(
    make_up_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<MakeUpDto> {
    let make_up_id = MakeUpClassId::from_string(&make_up_id);
    let result = state.services.makeup.schedule(&make_up_id, actor).await;
    respond(
        result.map(|make_up| MakeUpDto::from(&make_up)),
        ErrorCode::SuggestionCreateError,
    )
}

pub async fn reject_makeup_class(
    make_up_id: String,
    notes: Option<String>,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<MakeUpDto> {
    let make_up_id = MakeUpClassId::from_string(&make_up_id);
    let result = state.services.makeup.reject(&make_up_id, actor, notes).await;
    respond(
        result.map(|make_up| MakeUpDto::from(&make_up)),
        ErrorCode::SuggestionCreateError,
    )
}

pub async fn get_makeup_class(make_up_id: String, state: &AppState) -> ApiResponse<MakeUpDto> {
    let make_up_id = MakeUpClassId::from_string(&make_up_id);
    let result = state.services.makeup.find_by_id(&make_up_id).await;
    respond(
        result.map(|make_up| MakeUpDto::from(&make_up)),
        ErrorCode::FetchError,
    )
}

pub async fn get_student_makeup_classes(
    student_id: String,
    state: &AppState,
) -> ApiResponse<Vec<MakeUpDto>> {
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .makeup
        .list_for_student(&student_id)
        .await
        .map(|items| items.iter().map(MakeUpDto::from).collect());
    respond(result, ErrorCode::FetchError)
}

// ============================================================
// Postponements
// ============================================================

pub async fn get_student_postponements(
    student_id: String,
    state: &AppState,
) -> ApiResponse<Vec<PostponementDto>> {
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .makeup
        .list_postponements(&student_id)
        .await
        .map(|items| items.iter().map(PostponementDto::from).collect());
    respond(result, ErrorCode::FetchError)
}

pub async fn confirm_postponement(
    postponement_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<PostponementDto> {
    let postponement_id = PostponementId::from_string(&postponement_id);
    let result = state
        .services
        .makeup
        .confirm_postponement(&postponement_id, actor)
        .await;
    respond(
        result.map(|p| PostponementDto::from(&p)),
        ErrorCode::PostponementCreateError,
    )
}

pub async fn complete_postponement(
    postponement_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<PostponementDto> {
    let postponement_id = PostponementId::from_string(&postponement_id);
    let result = state
        .services
        .makeup
        .complete_postponement(&postponement_id, actor)
        .await;
    respond(
        result.map(|p| PostponementDto::from(&p)),
        ErrorCode::PostponementCreateError,
    )
}

pub async fn cancel_postponement(
    postponement_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<PostponementDto> {
    let postponement_id = PostponementId::from_string(&postponement_id);
    let result = state
        .services
        .makeup
        .cancel_postponement(&postponement_id, actor)
        .await;
    respond(
        result.map(|p| PostponementDto::from(&p)),
        ErrorCode::PostponementCreateError,
    )
}
