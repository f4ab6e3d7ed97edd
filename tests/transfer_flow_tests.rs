mod common;

use chrono::{Months, Utc};
use common::{
    AMOXICILLIN, MAIN, MAIN_PHARMACIST, WESTSIDE, availabilities, date, dispense, env, seed_batch,
    westside_asks_main,
};
use medstock::application::transfer::{CreateTransferRequest, ExpiryPolicy, TransferService};
use medstock::domain::ids::{BranchId, MedicineId, RequestId, StaffId};
use medstock::domain::notification::NotificationKind;
use medstock::domain::ports::{LedgerStore, NotificationStore, RequestStore};
use medstock::domain::request::RequestStatus;
use medstock::error::StockError;
use std::sync::Arc;

#[tokio::test]
async fn test_create_pending_request_notifies_supplying_branch() {
    let env = env().await;

    let request = env.service.create(westside_asks_main(20)).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.from_branch_id, WESTSIDE);
    assert_eq!(request.to_branch_id, MAIN);

    let inbox = env.store.for_branch(MAIN).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::TransferRequested);
    assert_eq!(
        inbox[0].display_message(),
        "Westside Clinic requests 20 units of Amoxicillin"
    );
    assert_eq!(inbox[0].correlation_id(), Some(request.id));
    assert_eq!(inbox[0].reference_id, AMOXICILLIN);

    // The requester's own inbox stays empty at this point.
    assert!(env.store.for_branch(WESTSIDE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let env = env().await;

    let zero = env.service.create(westside_asks_main(0)).await;
    assert!(matches!(zero, Err(StockError::Validation(_))));

    let unknown_branch = env
        .service
        .create(CreateTransferRequest {
            from_branch_id: BranchId(99),
            ..westside_asks_main(5)
        })
        .await;
    assert!(matches!(unknown_branch, Err(StockError::Validation(_))));

    let unknown_medicine = env
        .service
        .create(CreateTransferRequest {
            medicine_id: MedicineId(99),
            ..westside_asks_main(5)
        })
        .await;
    assert!(matches!(unknown_medicine, Err(StockError::Validation(_))));

    let unknown_staff = env
        .service
        .create(CreateTransferRequest {
            requested_by: StaffId(99),
            ..westside_asks_main(5)
        })
        .await;
    assert!(matches!(unknown_staff, Err(StockError::Validation(_))));

    let self_request = env
        .service
        .create(CreateTransferRequest {
            from_branch_id: MAIN,
            ..westside_asks_main(5)
        })
        .await;
    assert!(matches!(self_request, Err(StockError::Validation(_))));

    // Nothing was persisted or notified.
    assert!(env.store.pending_for_branch(MAIN).await.unwrap().is_empty());
    assert!(env.store.for_branch(MAIN).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_approval_splits_stock_across_batches() {
    let env = env().await;
    // Main holds 90 available (100 - 10 dispensed) expiring first, plus 50.
    let batch1 = seed_batch(&env.store, MAIN, 100, date(2025, 1, 1)).await;
    dispense(&env.store, &batch1, 10).await;
    seed_batch(&env.store, MAIN, 50, date(2025, 6, 1)).await;

    let request = env.service.create(westside_asks_main(120)).await.unwrap();
    let approved = env
        .service
        .approve(request.id, MAIN_PHARMACIST)
        .await
        .unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.confirmed_by, Some(MAIN_PHARMACIST));

    // Source: earliest-expiring batch exhausted first, then 30 off the next.
    assert_eq!(availabilities(&env.store, MAIN).await, vec![0, 20]);

    // Destination: exactly one new batch holding the full quantity.
    let received = env
        .store
        .batch_records(WESTSIDE, AMOXICILLIN)
        .await
        .unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].batch.quantity, 120);
    assert_eq!(received[0].available(), 120);

    // One approval notification at the requesting branch.
    let inbox = env.store.for_branch(WESTSIDE).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::TransferApproved);
    assert_eq!(
        inbox[0].display_message(),
        "Main Clinic approved the transfer of 120 units of Amoxicillin"
    );
}

#[tokio::test]
async fn test_approval_with_insufficient_stock_changes_nothing() {
    let env = env().await;
    let batch1 = seed_batch(&env.store, MAIN, 100, date(2025, 1, 1)).await;
    dispense(&env.store, &batch1, 10).await;
    seed_batch(&env.store, MAIN, 50, date(2025, 6, 1)).await;

    let request = env.service.create(westside_asks_main(200)).await.unwrap();
    let err = env
        .service
        .approve(request.id, MAIN_PHARMACIST)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StockError::InsufficientStock {
            requested: 200,
            available: 140,
        }
    ));

    // Ledger and request are untouched; the request can still be resolved.
    assert_eq!(availabilities(&env.store, MAIN).await, vec![90, 50]);
    assert!(
        env.store
            .batch_records(WESTSIDE, AMOXICILLIN)
            .await
            .unwrap()
            .is_empty()
    );
    let stored = env.store.get(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert!(env.store.for_branch(WESTSIDE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejection_with_reason() {
    let env = env().await;
    seed_batch(&env.store, MAIN, 100, date(2025, 1, 1)).await;

    let request = env.service.create(westside_asks_main(50)).await.unwrap();
    let rejected = env
        .service
        .reject(
            request.id,
            MAIN_PHARMACIST,
            Some("reserved for inpatients".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.confirmed_by, Some(MAIN_PHARMACIST));
    assert_eq!(availabilities(&env.store, MAIN).await, vec![100]);

    let inbox = env.store.for_branch(WESTSIDE).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::TransferRejected);
    assert_eq!(
        inbox[0].display_message(),
        "Main Clinic rejected the transfer of 50 units of Amoxicillin: reserved for inpatients"
    );
}

#[tokio::test]
async fn test_terminal_requests_conflict_on_retransition() {
    let env = env().await;
    seed_batch(&env.store, MAIN, 100, date(2025, 1, 1)).await;

    let request = env.service.create(westside_asks_main(10)).await.unwrap();
    env.service
        .approve(request.id, MAIN_PHARMACIST)
        .await
        .unwrap();

    let again = env.service.approve(request.id, MAIN_PHARMACIST).await;
    assert!(matches!(
        again,
        Err(StockError::AlreadyProcessed(_, RequestStatus::Approved))
    ));
    let reject = env.service.reject(request.id, MAIN_PHARMACIST, None).await;
    assert!(matches!(
        reject,
        Err(StockError::AlreadyProcessed(_, RequestStatus::Approved))
    ));

    // Stock was deducted exactly once.
    assert_eq!(availabilities(&env.store, MAIN).await, vec![90]);
}

#[tokio::test]
async fn test_unknown_request_yields_not_found() {
    let env = env().await;
    let missing = RequestId::new();

    let approve = env.service.approve(missing, MAIN_PHARMACIST).await;
    assert!(matches!(approve, Err(StockError::RequestNotFound(id)) if id == missing));

    let reject = env.service.reject(missing, MAIN_PHARMACIST, None).await;
    assert!(matches!(reject, Err(StockError::RequestNotFound(id)) if id == missing));
}

#[tokio::test]
async fn test_pending_list_is_enriched_and_shrinks() {
    let env = env().await;
    seed_batch(&env.store, MAIN, 100, date(2025, 1, 1)).await;

    let first = env.service.create(westside_asks_main(10)).await.unwrap();
    let second = env.service.create(westside_asks_main(20)).await.unwrap();

    let pending = env.service.pending_for_branch(MAIN).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].request.id, first.id);
    assert_eq!(pending[0].medicine_name, "Amoxicillin");
    assert_eq!(pending[0].requester_name, "Leo Mwangi");
    assert_eq!(pending[0].from_branch_name, "Westside Clinic");

    env.service
        .approve(first.id, MAIN_PHARMACIST)
        .await
        .unwrap();
    env.service
        .reject(second.id, MAIN_PHARMACIST, None)
        .await
        .unwrap();

    assert!(env.service.pending_for_branch(MAIN).await.unwrap().is_empty());
    // Nothing is ever pending for the requesting branch itself.
    assert!(
        env.service
            .pending_for_branch(WESTSIDE)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_receipt_inherits_earliest_source_expiration() {
    let env = env().await;
    seed_batch(&env.store, MAIN, 100, date(2025, 3, 15)).await;
    seed_batch(&env.store, MAIN, 50, date(2025, 9, 1)).await;

    let request = env.service.create(westside_asks_main(110)).await.unwrap();
    env.service
        .approve(request.id, MAIN_PHARMACIST)
        .await
        .unwrap();

    let received = env
        .store
        .batch_records(WESTSIDE, AMOXICILLIN)
        .await
        .unwrap();
    assert_eq!(received[0].batch.expiration_date, date(2025, 3, 15));
}

#[tokio::test]
async fn test_one_year_expiry_policy() {
    let env = env().await;
    let service = Arc::new(
        TransferService::new(
            Arc::new(env.store.clone()),
            Arc::new(env.store.clone()),
            Arc::new(env.store.clone()),
            Arc::new(env.store.clone()),
            Arc::new(env.store.clone()),
        )
        .with_expiry_policy(ExpiryPolicy::OneYearFromTransfer),
    );
    seed_batch(&env.store, MAIN, 100, date(2025, 3, 15)).await;

    let request = service.create(westside_asks_main(40)).await.unwrap();
    service.approve(request.id, MAIN_PHARMACIST).await.unwrap();

    let received = env
        .store
        .batch_records(WESTSIDE, AMOXICILLIN)
        .await
        .unwrap();
    let expected = Utc::now()
        .date_naive()
        .checked_add_months(Months::new(12))
        .unwrap();
    assert_eq!(received[0].batch.expiration_date, expected);
}
