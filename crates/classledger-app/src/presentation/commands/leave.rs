use chrono::Utc;

use crate::application::dtos::{
    LeaveOutcomeDto, LeaveRequestDto, LeaveValidationDto, SubmitLeaveInput, TransactionDto,
    ValidateLeaveInput,
};
use crate::application::services::LeaveSubmission;
use crate::application::utils::{parse_enum, parse_timestamp};
use crate::presentation::error::{respond, respond_wrapped, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::leave::LeaveType;
use classledger_domain::shared::{Actor, BookingId, ErrorCode, LeaveRequestId, StudentId};

/// Preview refund tier and auto-approval without storing anything
pub async fn validate_leave_request(
    input: ValidateLeaveInput,
    state: &AppState,
) -> ApiResponse<LeaveValidationDto> {
    let result = async move {
        let class_date = parse_timestamp(&input.class_date, "class date")?;
        let leave_type: LeaveType = parse_enum(&input.leave_type, "leave type")?;
        state
            .services
            .leave
            .validate(
                &StudentId::from_string(&input.student_id),
                class_date,
                leave_type,
                input.reason,
                input.affected_classes,
                Utc::now(),
            )
            .await
    }
    .await;

    respond(result.map(LeaveValidationDto::from), ErrorCode::FetchError)
}

/// Submit a leave request. Every failure is reported as `SUBMISSION_ERROR`
/// with the underlying code in `details`.
pub async fn submit_leave_request(
    input: SubmitLeaveInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<LeaveOutcomeDto> {
    let result = async move {
        let submission = LeaveSubmission {
            student_id: StudentId::from_string(&input.student_id),
            booking_id: BookingId::from_string(&input.booking_id),
            leave_type: parse_enum(&input.leave_type, "leave type")?,
            reason: input.reason,
            affected_classes: input.affected_classes,
        };
        state.services.leave.submit(submission, actor, Utc::now()).await
    }
    .await;

    respond_wrapped(result.map(LeaveOutcomeDto::from), ErrorCode::SubmissionError)
}

/// Approve a pending request and run refund, postponement and suggestions.
pub async fn approve_leave_request(
    leave_request_id: String,
    notes: Option<String>,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<LeaveOutcomeDto> {
    let leave_request_id = LeaveRequestId::from_string(&leave_request_id);
    let result = state
        .services
        .leave
        .approve(&leave_request_id, actor, notes, Utc::now())
        .await;
    respond(result.map(LeaveOutcomeDto::from), ErrorCode::UpdateError)
}

pub async fn reject_leave_request(
    leave_request_id: String,
    notes: Option<String>,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<LeaveRequestDto> {
    let leave_request_id = LeaveRequestId::from_string(&leave_request_id);
    let result = state
        .services
        .leave
        .reject(&leave_request_id, actor, notes)
        .await;
    respond(
        result.map(|request| LeaveRequestDto::from(&request)),
        ErrorCode::UpdateError,
    )
}

pub async fn cancel_leave_request(
    leave_request_id: String,
    student_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<LeaveRequestDto> {
    let leave_request_id = LeaveRequestId::from_string(&leave_request_id);
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .leave
        .cancel(&leave_request_id, &student_id, actor)
        .await;
    respond(
        result.map(|request| LeaveRequestDto::from(&request)),
        ErrorCode::UpdateError,
    )
}

/// Retry the refund of an approved request
pub async fn process_leave_refund(
    leave_request_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<TransactionDto> {
    let leave_request_id = LeaveRequestId::from_string(&leave_request_id);
    let result = state
        .services
        .leave
        .retry_refund(&leave_request_id, actor)
        .await;
    respond(
        result.map(TransactionDto::from),
        ErrorCode::TransactionCreateError,
    )
}

pub async fn get_leave_request(
    leave_request_id: String,
    state: &AppState,
) -> ApiResponse<LeaveRequestDto> {
    let leave_request_id = LeaveRequestId::from_string(&leave_request_id);
    let result = state.services.leave.find_by_id(&leave_request_id).await;
    respond(
        result.map(|request| LeaveRequestDto::from(&request)),
        ErrorCode::FetchError,
    )
}

pub async fn get_student_leave_requests(
    student_id: String,
    state: &AppState,
) -> ApiResponse<Vec<LeaveRequestDto>> {
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .leave
        .list_for_student(&student_id)
        .await
        .map(|items| items.iter().map(LeaveRequestDto::from).collect());
    respond(result, ErrorCode::FetchError)
}

pub async fn get_pending_leave_requests(state: &AppState) -> ApiResponse<Vec<LeaveRequestDto>> {
    let result = state
        .services
        .leave
        .list_pending()
        .await
        .map(|items| items.iter().map(LeaveRequestDto::from).collect());
    respond(result, ErrorCode::FetchError)
}
