use crate::application::dtos::{
    AddHoursInput, BalanceDetailDto, DeductHoursInput, PurchaseDto, PurchasePackageInput,
    PurchaseResultDto, TransactionDto, TransferHoursInput, TransferLogDto, TransferResultDto,
};
use crate::application::utils::parse_enum;
use crate::presentation::error::{respond, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::ledger::{DeductionRequest, PaymentStatus, TransactionType, TransferRequest};
use classledger_domain::shared::{
    Actor, BookingId, ClassId, ErrorCode, PurchaseId, StudentId, TransactionId,
};

use super::actor_id;

const DEFAULT_PAGE_SIZE: i64 = 50;

/// Current balance in hours, recomputed from the ledger
pub async fn get_balance(student_id: String, state: &AppState) -> ApiResponse<f64> {
    let student_id = StudentId::from_string(&student_id);
    respond(
        state.services.balance.get_balance(&student_id).await,
        ErrorCode::FetchError,
    )
}

/// Balance with active and expiring packages, recent entries and alerts
pub async fn get_balance_detail(
    student_id: String,
    state: &AppState,
) -> ApiResponse<BalanceDetailDto> {
    let student_id = StudentId::from_string(&student_id);
    respond(
        state
            .services
            .balance
            .get_balance_detail(&student_id)
            .await
            .map(BalanceDetailDto::from),
        ErrorCode::FetchError,
    )
}

pub async fn get_transactions(
    student_id: String,
    limit: Option<i64>,
    offset: Option<i64>,
    state: &AppState,
) -> ApiResponse<Vec<TransactionDto>> {
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .transaction
        .list_transactions(
            &student_id,
            limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset.unwrap_or(0),
        )
        .await
        .map(|txns| txns.iter().map(TransactionDto::from).collect());
    respond(result, ErrorCode::FetchError)
}

pub async fn get_purchases(student_id: String, state: &AppState) -> ApiResponse<Vec<PurchaseDto>> {
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .transaction
        .list_purchases(&student_id)
        .await
        .map(|purchases| purchases.iter().map(PurchaseDto::from).collect());
    respond(result, ErrorCode::FetchError)
}

pub async fn get_transfer_logs(
    student_id: String,
    state: &AppState,
) -> ApiResponse<Vec<TransferLogDto>> {
    let student_id = StudentId::from_string(&student_id);
    let result = state
        .services
        .transaction
        .get_transfer_logs(&student_id)
        .await
        .map(|logs| logs.iter().map(TransferLogDto::from).collect());
    respond(result, ErrorCode::FetchError)
}

/// Charge a student for an attended class
pub async fn deduct_hours(
    input: DeductHoursInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<TransactionDto> {
    let result = async move {
        let request = DeductionRequest::new(
            StudentId::from_string(&input.student_id),
            ClassId::from_string(&input.class_id),
            input.booking_id.as_deref().map(BookingId::from_string),
            input.hours,
            input.class_type,
            input.deduction_rate,
            actor_id(actor),
        )?;
        state.services.transaction.deduct(request, actor).await
    }
    .await;

    respond(result.map(TransactionDto::from), ErrorCode::TransactionCreateError)
}

pub async fn transfer_hours(
    input: TransferHoursInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<TransferResultDto> {
    let result = async move {
        let request = TransferRequest::new(
            StudentId::from_string(&input.from_student_id),
            StudentId::from_string(&input.to_student_id),
            input.hours,
            input.reason,
            input.is_family_transfer,
            actor_id(actor),
        )?;
        state.services.transaction.transfer(request, actor).await
    }
    .await;

    respond(
        result.map(|outcome| TransferResultDto {
            log: TransferLogDto::from(&outcome.log),
            debit: TransactionDto::from(outcome.debit),
            credit: TransactionDto::from(outcome.credit),
        }),
        ErrorCode::TransferError,
    )
}

pub async fn reverse_transaction(
    transaction_id: String,
    reason: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<TransactionDto> {
    let transaction_id = TransactionId::from_string(&transaction_id);
    respond(
        state
            .services
            .transaction
            .reverse(&transaction_id, &reason, actor)
            .await
            .map(TransactionDto::from),
        ErrorCode::TransactionCreateError,
    )
}

pub async fn purchase_package(
    input: PurchasePackageInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<PurchaseResultDto> {
    let result = async move {
        let payment_status: PaymentStatus = parse_enum(&input.payment_status, "payment status")?;
        state
            .services
            .transaction
            .purchase_package(
                StudentId::from_string(&input.student_id),
                input.package_name,
                input.hours,
                input.amount_paid,
                input.valid_days,
                payment_status,
                actor,
            )
            .await
    }
    .await;

    respond(
        result.map(|(purchase, txn)| PurchaseResultDto {
            purchase: PurchaseDto::from(&purchase),
            transaction: txn.map(TransactionDto::from),
        }),
        ErrorCode::TransactionCreateError,
    )
}

pub async fn complete_purchase_payment(
    purchase_id: String,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<PurchaseResultDto> {
    let purchase_id = PurchaseId::from_string(&purchase_id);
    let result = state
        .services
        .transaction
        .complete_purchase_payment(&purchase_id, actor)
        .await;

    respond(
        result.map(|(purchase, txn)| PurchaseResultDto {
            purchase: PurchaseDto::from(&purchase),
            transaction: Some(TransactionDto::from(txn)),
        }),
        ErrorCode::TransactionCreateError,
    )
}

/// Credit bonus, purchase or refund hours outside a package
pub async fn add_hours(
    input: AddHoursInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<TransactionDto> {
    let result = async move {
        let kind: TransactionType = parse_enum(&input.kind, "transaction type")?;
        state
            .services
            .transaction
            .add_hours(
                StudentId::from_string(&input.student_id),
                input.hours,
                kind,
                input.description,
                actor,
            )
            .await
    }
    .await;

    respond(result.map(TransactionDto::from), ErrorCode::TransactionCreateError)
}
