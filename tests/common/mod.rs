#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use medstock::application::transfer::{CreateTransferRequest, TransferService};
use medstock::domain::catalog::{Branch, Medicine, StaffMember};
use medstock::domain::ids::{BranchId, MedicineId, StaffId};
use medstock::domain::ledger::{NewBatch, Quantity, StockBatch};
use medstock::domain::ports::{CatalogStore, LedgerStore};
use medstock::infrastructure::in_memory::InMemoryStore;
use std::sync::Arc;

pub const MAIN: BranchId = BranchId(1);
pub const WESTSIDE: BranchId = BranchId(2);
pub const AMOXICILLIN: MedicineId = MedicineId(5);
pub const MAIN_PHARMACIST: StaffId = StaffId(10);
pub const WESTSIDE_NURSE: StaffId = StaffId(20);

pub struct TestEnv {
    pub store: InMemoryStore,
    pub service: Arc<TransferService>,
}

/// Builds a service over one in-memory store with two branches, one
/// medicine, and one staff member per branch.
pub async fn env() -> TestEnv {
    let store = InMemoryStore::new();
    store
        .insert_branch(Branch {
            id: MAIN,
            name: "Main Clinic".to_string(),
        })
        .await
        .unwrap();
    store
        .insert_branch(Branch {
            id: WESTSIDE,
            name: "Westside Clinic".to_string(),
        })
        .await
        .unwrap();
    store
        .insert_medicine(Medicine {
            id: AMOXICILLIN,
            name: "Amoxicillin".to_string(),
        })
        .await
        .unwrap();
    store
        .insert_staff(StaffMember {
            id: MAIN_PHARMACIST,
            name: "Asha Patel".to_string(),
            branch_id: MAIN,
        })
        .await
        .unwrap();
    store
        .insert_staff(StaffMember {
            id: WESTSIDE_NURSE,
            name: "Leo Mwangi".to_string(),
            branch_id: WESTSIDE,
        })
        .await
        .unwrap();

    let service = service_over(&store);
    TestEnv { store, service }
}

pub fn service_over(store: &InMemoryStore) -> Arc<TransferService> {
    Arc::new(TransferService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn seed_batch(
    store: &InMemoryStore,
    branch: BranchId,
    quantity: u32,
    expires: NaiveDate,
) -> StockBatch {
    store
        .insert_batch(NewBatch {
            medicine_id: AMOXICILLIN,
            branch_id: branch,
            quantity: Quantity::new(quantity).unwrap(),
            date_received: date(2024, 1, 1),
            expiration_date: expires,
        })
        .await
        .unwrap()
}

pub async fn dispense(store: &InMemoryStore, batch: &StockBatch, quantity: u32) {
    store
        .record_dispense(
            batch.id,
            Quantity::new(quantity).unwrap(),
            MAIN_PHARMACIST,
            Utc::now(),
        )
        .await
        .unwrap();
}

/// A request from Westside asking Main for `quantity` units.
pub fn westside_asks_main(quantity: u32) -> CreateTransferRequest {
    CreateTransferRequest {
        from_branch_id: WESTSIDE,
        to_branch_id: MAIN,
        medicine_id: AMOXICILLIN,
        quantity_requested: quantity,
        requested_by: WESTSIDE_NURSE,
    }
}

/// Remaining units per batch at (branch, medicine), in creation order.
pub async fn availabilities(store: &InMemoryStore, branch: BranchId) -> Vec<u32> {
    let mut records = store.batch_records(branch, AMOXICILLIN).await.unwrap();
    records.sort_by_key(|r| r.batch.seq);
    records.iter().map(|r| r.available()).collect()
}
