use crate::domain::allocation::AllocationPlan;
use crate::domain::catalog::{Branch, Medicine, StaffMember};
use crate::domain::ids::{BatchId, BranchId, MedicineId, RequestId, StaffId};
use crate::domain::ledger::{Archive, BatchRecord, Dispense, NewBatch, Quantity, StockBatch};
use crate::domain::notification::Notification;
use crate::domain::request::{RequestStatus, TransferRequest};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Exclusive access token for one (branch, medicine) stock pool.
///
/// Issued by [`LedgerStore::lock_stock`]; the approval path holds it across
/// availability-read, allocation, and transfer commit so concurrent approvals
/// competing for the same batches are serialized.
pub type StockGuard = OwnedMutexGuard<()>;

pub type SharedCatalogStore = Arc<dyn CatalogStore>;
pub type SharedLedgerStore = Arc<dyn LedgerStore>;
pub type SharedRequestStore = Arc<dyn RequestStore>;
pub type SharedNotificationStore = Arc<dyn NotificationStore>;
pub type SharedTransferExecutor = Arc<dyn TransferExecutor>;

/// Read-mostly reference data: branches, medicines, staff.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_branch(&self, branch: Branch) -> Result<()>;
    async fn insert_medicine(&self, medicine: Medicine) -> Result<()>;
    async fn insert_staff(&self, staff: StaffMember) -> Result<()>;
    async fn branch(&self, id: BranchId) -> Result<Option<Branch>>;
    async fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>>;
    async fn staff(&self, id: StaffId) -> Result<Option<StaffMember>>;
}

/// The append-only stock ledger: batches plus dispense/archive deductions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a receipt batch, assigning its id and monotonic `seq`.
    async fn insert_batch(&self, batch: NewBatch) -> Result<StockBatch>;

    /// Records a non-transfer dispense (point-of-care) against a batch.
    /// Fails with `InsufficientStock` if the batch cannot cover it.
    async fn record_dispense(
        &self,
        batch_id: BatchId,
        quantity: Quantity,
        actor_id: StaffId,
        now: DateTime<Utc>,
    ) -> Result<Dispense>;

    /// Records a spoilage/write-off deduction against a batch.
    /// Fails with `InsufficientStock` if the batch cannot cover it.
    async fn record_archive(
        &self,
        batch_id: BatchId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Result<Archive>;

    /// All batches of one (branch, medicine) with their deduction totals.
    async fn batch_records(
        &self,
        branch_id: BranchId,
        medicine_id: MedicineId,
    ) -> Result<Vec<BatchRecord>>;

    /// Every batch record in the ledger, for reporting.
    async fn all_batch_records(&self) -> Result<Vec<BatchRecord>>;

    /// Acquires the exclusive guard for one (branch, medicine) stock pool.
    async fn lock_stock(&self, branch_id: BranchId, medicine_id: MedicineId) -> StockGuard;
}

/// Applies an approved transfer to the stores as one all-or-nothing unit.
///
/// Implemented by the storage adapters so that the conditional status
/// transition and the ledger mutations share a single transaction boundary
/// (one write-lock mutation in memory, one WriteBatch in RocksDB).
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Executes an approval atomically:
    ///
    /// 1. transitions the request Pending→Approved, conditional on the stored
    ///    status still being Pending (`AlreadyProcessed` otherwise);
    /// 2. re-validates that every plan line is still covered by its batch's
    ///    availability (`InsufficientStock` otherwise);
    /// 3. writes one dispense per plan line at the supplying branch and the
    ///    receipt batch at the requesting branch.
    ///
    /// On any failure nothing is applied and the request keeps its prior
    /// status. Returns the updated request and the created receipt batch.
    async fn execute_approval(
        &self,
        request_id: RequestId,
        confirmed_by: StaffId,
        plan: &AllocationPlan,
        receipt: NewBatch,
        now: DateTime<Utc>,
    ) -> Result<(TransferRequest, StockBatch)>;
}

/// Store of transfer requests and their lifecycle.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: TransferRequest) -> Result<()>;

    async fn get(&self, id: RequestId) -> Result<Option<TransferRequest>>;

    /// Pending requests addressed to (i.e. to be fulfilled by) `branch_id`.
    async fn pending_for_branch(&self, branch_id: BranchId) -> Result<Vec<TransferRequest>>;

    /// Atomic conditional transition out of Pending.
    ///
    /// Succeeds only if the stored status is still Pending at write time;
    /// otherwise fails with `AlreadyProcessed` (or `RequestNotFound`) and
    /// mutates nothing. This is the compare-and-swap that closes the
    /// double-approval race.
    async fn transition(
        &self,
        id: RequestId,
        to: RequestStatus,
        confirmed_by: StaffId,
        now: DateTime<Utc>,
    ) -> Result<TransferRequest>;
}

/// Branch-inbox notifications; write-only for this core.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<()>;
    async fn for_branch(&self, branch_id: BranchId) -> Result<Vec<Notification>>;
}
