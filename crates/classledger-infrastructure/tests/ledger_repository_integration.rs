use std::sync::Arc;

use classledger_domain::ledger::{
    DeductionRequest, LedgerRepository, PurchaseRepository, TransactionDraft, TransactionType,
    TransferRequest,
};
use classledger_domain::shared::{ClassId, DomainError, StudentId};
use classledger_infrastructure::persistence::repositories::{
    SqliteLedgerRepository, SqlitePurchaseRepository,
};

mod test_helpers;

fn deduction(student: &StudentId, hours: f64, rate: Option<f64>) -> DeductionRequest {
    DeductionRequest::new(
        student.clone(),
        ClassId::new(),
        None,
        hours,
        Some("group".to_string()),
        rate,
        "teacher-1",
    )
    .expect("valid deduction")
}

#[tokio::test]
async fn deduction_snapshots_balance_and_draws_down_package() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = SqliteLedgerRepository::new(pool.clone());
    let purchases = SqlitePurchaseRepository::new(pool.clone());

    let student = StudentId::new();
    let package = test_helpers::buy_package(&pool, &student, 10.0).await;
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 10.0);

    let txn = ledger
        .deduct_class_hours(&deduction(&student, 2.0, Some(1.5)))
        .await
        .expect("deduct");

    assert_eq!(txn.transaction_type(), TransactionType::Deduction);
    assert_eq!(txn.hours_amount(), -3.0);
    assert_eq!(txn.balance_before(), 10.0);
    assert_eq!(txn.balance_after(), 7.0);
    assert_eq!(txn.deduction_rate(), Some(1.5));
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 7.0);

    let stored = purchases
        .find_by_id(package.id())
        .await
        .unwrap()
        .expect("package exists");
    assert_eq!(stored.hours_remaining(), 7.0);
}

#[tokio::test]
async fn insufficient_deduction_writes_nothing() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = SqliteLedgerRepository::new(pool.clone());

    let student = StudentId::new();
    test_helpers::buy_package(&pool, &student, 1.0).await;

    let err = ledger
        .deduct_class_hours(&deduction(&student, 2.0, None))
        .await
        .expect_err("must fail");
    assert!(matches!(err, DomainError::InsufficientHours { .. }));

    let history = ledger.list_transactions(&student, 50, 0).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_type(), TransactionType::Purchase);
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 1.0);
}

#[tokio::test]
async fn credits_reject_negative_result() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = SqliteLedgerRepository::new(pool.clone());
    let student = StudentId::new();

    let bonus = ledger
        .add_hours(TransactionDraft::new(
            student.clone(),
            TransactionType::Bonus,
            1.5,
            "admin",
        ))
        .await
        .expect("bonus");
    assert_eq!(bonus.balance_after(), 1.5);

    let err = ledger
        .add_hours(TransactionDraft::new(
            student.clone(),
            TransactionType::Adjustment,
            -5.0,
            "admin",
        ))
        .await
        .expect_err("would go negative");
    assert!(matches!(err, DomainError::NegativeBalance(_)));
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 1.5);
}

#[tokio::test]
async fn transfer_is_symmetric_and_logged() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = SqliteLedgerRepository::new(pool.clone());

    let from = StudentId::new();
    let to = StudentId::new();
    test_helpers::buy_package(&pool, &from, 5.0).await;

    let request = TransferRequest::new(from.clone(), to.clone(), 1.25, "sibling", true, "admin")
        .expect("valid transfer");
    let outcome = ledger.transfer_hours(&request).await.expect("transfer");

    assert_eq!(outcome.debit.hours_amount(), -1.25);
    assert_eq!(outcome.credit.hours_amount(), 1.25);
    assert_eq!(outcome.debit.transfer_to_student_id(), Some(&to));
    assert_eq!(outcome.credit.transfer_from_student_id(), Some(&from));
    assert_eq!(ledger.calculate_balance(&from).await.unwrap(), 3.75);
    assert_eq!(ledger.calculate_balance(&to).await.unwrap(), 1.25);

    let logs = ledger.list_transfer_logs(&to).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].is_family_transfer);
    assert_eq!(&logs[0].debit_transaction_id, outcome.debit.id());
    assert_eq!(&logs[0].credit_transaction_id, outcome.credit.id());

    let too_much = TransferRequest::new(from.clone(), to.clone(), 10.0, "", false, "admin").unwrap();
    let err = ledger.transfer_hours(&too_much).await.expect_err("insufficient");
    assert!(matches!(err, DomainError::InsufficientHours { .. }));
    assert_eq!(ledger.list_transfer_logs(&from).await.unwrap().len(), 1);
    assert_eq!(ledger.calculate_balance(&to).await.unwrap(), 1.25);
}

#[tokio::test]
async fn reversal_happens_once() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = SqliteLedgerRepository::new(pool.clone());

    let student = StudentId::new();
    test_helpers::buy_package(&pool, &student, 10.0).await;
    let deducted = ledger
        .deduct_class_hours(&deduction(&student, 2.0, None))
        .await
        .unwrap();

    let reversal = ledger
        .reverse_transaction(deducted.id(), "Class cancelled", "admin")
        .await
        .expect("reverse");
    assert_eq!(reversal.transaction_type(), TransactionType::Reversal);
    assert_eq!(reversal.hours_amount(), 2.0);
    assert_eq!(reversal.original_transaction_id(), Some(deducted.id()));
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 10.0);

    let original = ledger
        .find_transaction(deducted.id())
        .await
        .unwrap()
        .expect("original");
    assert!(original.is_reversed());

    let err = ledger
        .reverse_transaction(deducted.id(), "again", "admin")
        .await
        .expect_err("second reversal");
    assert!(matches!(err, DomainError::AlreadyReversed(_)));
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 10.0);
}

#[tokio::test]
async fn reversal_cannot_overdraw() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = SqliteLedgerRepository::new(pool.clone());

    let student = StudentId::new();
    let other = StudentId::new();
    test_helpers::buy_package(&pool, &student, 10.0).await;
    let credit = ledger.list_transactions(&student, 1, 0).await.unwrap().remove(0);

    let request = TransferRequest::new(student.clone(), other, 8.0, "move", false, "admin").unwrap();
    ledger.transfer_hours(&request).await.unwrap();

    let err = ledger
        .reverse_transaction(credit.id(), "refund", "admin")
        .await
        .expect_err("would go negative");
    assert!(matches!(err, DomainError::NegativeBalance(_)));

    let unchanged = ledger.find_transaction(credit.id()).await.unwrap().unwrap();
    assert!(!unchanged.is_reversed());
    assert_eq!(ledger.calculate_balance(&student).await.unwrap(), 2.0);
}

#[tokio::test]
async fn history_is_newest_first_with_paging() {
    let pool = test_helpers::setup_in_memory_db().await;
    let ledger = Arc::new(SqliteLedgerRepository::new(pool.clone()));

    let student = StudentId::new();
    for hours in [1.0, 2.0, 3.0] {
        ledger
            .add_hours(TransactionDraft::new(
                student.clone(),
                TransactionType::Bonus,
                hours,
                "admin",
            ))
            .await
            .unwrap();
    }

    let page = ledger.list_transactions(&student, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].hours_amount(), 3.0);
    assert_eq!(page[1].hours_amount(), 2.0);

    let rest = ledger.list_transactions(&student, 2, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].hours_amount(), 1.0);
    assert_eq!(rest[0].balance_before(), 0.0);
}
