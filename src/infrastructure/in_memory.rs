use crate::domain::allocation::AllocationPlan;
use crate::domain::catalog::{Branch, Medicine, StaffMember};
use crate::domain::ids::{
    ArchiveId, BatchId, BranchId, DispenseId, MedicineId, RequestId, StaffId,
};
use crate::domain::ledger::{
    Archive, BatchRecord, Dispense, NewBatch, Quantity, StockBatch,
};
use crate::domain::notification::Notification;
use crate::domain::ports::{
    CatalogStore, LedgerStore, NotificationStore, RequestStore, StockGuard, TransferExecutor,
};
use crate::domain::request::{RequestStatus, TransferRequest};
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct State {
    branches: HashMap<BranchId, Branch>,
    medicines: HashMap<MedicineId, Medicine>,
    staff: HashMap<StaffId, StaffMember>,
    batches: HashMap<BatchId, StockBatch>,
    dispenses: Vec<Dispense>,
    archives: Vec<Archive>,
    requests: HashMap<RequestId, TransferRequest>,
    notifications: Vec<Notification>,
    next_seq: u64,
}

impl State {
    fn record_for(&self, batch: &StockBatch) -> BatchRecord {
        let dispensed = self
            .dispenses
            .iter()
            .filter(|d| d.batch_id == batch.id)
            .map(|d| d.quantity)
            .sum();
        let archived = self
            .archives
            .iter()
            .filter(|a| a.batch_id == batch.id)
            .map(|a| a.quantity)
            .sum();
        BatchRecord {
            batch: batch.clone(),
            dispensed,
            archived,
        }
    }

    fn insert_batch(&mut self, new: NewBatch) -> StockBatch {
        self.next_seq += 1;
        let batch = StockBatch {
            id: BatchId::new(),
            medicine_id: new.medicine_id,
            branch_id: new.branch_id,
            quantity: new.quantity.value(),
            date_received: new.date_received,
            expiration_date: new.expiration_date,
            seq: self.next_seq,
        };
        self.batches.insert(batch.id, batch.clone());
        batch
    }

    fn available_of(&self, batch_id: BatchId) -> Result<u32> {
        let batch = self
            .batches
            .get(&batch_id)
            .ok_or_else(|| StockError::Validation(format!("unknown batch {batch_id}")))?;
        Ok(self.record_for(batch).available())
    }
}

/// All-in-one in-memory adapter behind a single `RwLock`.
///
/// The shared lock is what makes the multi-step mutations atomic: every
/// write path validates fully before touching the state, so a failed
/// operation leaves nothing behind. `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    stock_locks: Arc<Mutex<HashMap<(BranchId, MedicineId), Arc<Mutex<()>>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_branch(&self, branch: Branch) -> Result<()> {
        self.state.write().await.branches.insert(branch.id, branch);
        Ok(())
    }

    async fn insert_medicine(&self, medicine: Medicine) -> Result<()> {
        self.state
            .write()
            .await
            .medicines
            .insert(medicine.id, medicine);
        Ok(())
    }

    async fn insert_staff(&self, staff: StaffMember) -> Result<()> {
        self.state.write().await.staff.insert(staff.id, staff);
        Ok(())
    }

    async fn branch(&self, id: BranchId) -> Result<Option<Branch>> {
        Ok(self.state.read().await.branches.get(&id).cloned())
    }

    async fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>> {
        Ok(self.state.read().await.medicines.get(&id).cloned())
    }

    async fn staff(&self, id: StaffId) -> Result<Option<StaffMember>> {
        Ok(self.state.read().await.staff.get(&id).cloned())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_batch(&self, batch: NewBatch) -> Result<StockBatch> {
        Ok(self.state.write().await.insert_batch(batch))
    }

    async fn record_dispense(
        &self,
        batch_id: BatchId,
        quantity: Quantity,
        actor_id: StaffId,
        now: DateTime<Utc>,
    ) -> Result<Dispense> {
        let mut state = self.state.write().await;
        let available = state.available_of(batch_id)?;
        if available < quantity.value() {
            return Err(StockError::InsufficientStock {
                requested: quantity.value(),
                available,
            });
        }
        let branch_id = state.batches[&batch_id].branch_id;
        let dispense = Dispense {
            id: DispenseId::new(),
            batch_id,
            quantity: quantity.value(),
            branch_id,
            actor_id,
            request_id: None,
            timestamp: now,
        };
        state.dispenses.push(dispense.clone());
        Ok(dispense)
    }

    async fn record_archive(
        &self,
        batch_id: BatchId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Result<Archive> {
        let mut state = self.state.write().await;
        let available = state.available_of(batch_id)?;
        if available < quantity.value() {
            return Err(StockError::InsufficientStock {
                requested: quantity.value(),
                available,
            });
        }
        let archive = Archive {
            id: ArchiveId::new(),
            batch_id,
            quantity: quantity.value(),
            timestamp: now,
        };
        state.archives.push(archive.clone());
        Ok(archive)
    }

    async fn batch_records(
        &self,
        branch_id: BranchId,
        medicine_id: MedicineId,
    ) -> Result<Vec<BatchRecord>> {
        let state = self.state.read().await;
        Ok(state
            .batches
            .values()
            .filter(|b| b.branch_id == branch_id && b.medicine_id == medicine_id)
            .map(|b| state.record_for(b))
            .collect())
    }

    async fn all_batch_records(&self) -> Result<Vec<BatchRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<BatchRecord> =
            state.batches.values().map(|b| state.record_for(b)).collect();
        records.sort_by_key(|r| r.batch.seq);
        Ok(records)
    }

    async fn lock_stock(&self, branch_id: BranchId, medicine_id: MedicineId) -> StockGuard {
        let lock = {
            let mut registry = self.stock_locks.lock().await;
            registry
                .entry((branch_id, medicine_id))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn insert(&self, request: TransferRequest) -> Result<()> {
        self.state.write().await.requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<TransferRequest>> {
        Ok(self.state.read().await.requests.get(&id).cloned())
    }

    async fn pending_for_branch(&self, branch_id: BranchId) -> Result<Vec<TransferRequest>> {
        let state = self.state.read().await;
        let mut pending: Vec<TransferRequest> = state
            .requests
            .values()
            .filter(|r| r.to_branch_id == branch_id && r.status == RequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn transition(
        &self,
        id: RequestId,
        to: RequestStatus,
        confirmed_by: StaffId,
        now: DateTime<Utc>,
    ) -> Result<TransferRequest> {
        let mut state = self.state.write().await;
        let request = state
            .requests
            .get_mut(&id)
            .ok_or(StockError::RequestNotFound(id))?;
        if request.status != RequestStatus::Pending {
            return Err(StockError::AlreadyProcessed(id, request.status));
        }
        request.status = to;
        request.confirmed_by = Some(confirmed_by);
        request.updated_at = now;
        Ok(request.clone())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert(&self, notification: Notification) -> Result<()> {
        self.state.write().await.notifications.push(notification);
        Ok(())
    }

    async fn for_branch(&self, branch_id: BranchId) -> Result<Vec<Notification>> {
        Ok(self
            .state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| n.branch_id == branch_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransferExecutor for InMemoryStore {
    async fn execute_approval(
        &self,
        request_id: RequestId,
        confirmed_by: StaffId,
        plan: &AllocationPlan,
        receipt: NewBatch,
        now: DateTime<Utc>,
    ) -> Result<(TransferRequest, StockBatch)> {
        let mut state = self.state.write().await;

        let request = state
            .requests
            .get(&request_id)
            .ok_or(StockError::RequestNotFound(request_id))?
            .clone();
        if request.status != RequestStatus::Pending {
            return Err(StockError::AlreadyProcessed(request_id, request.status));
        }

        // Validate every line before mutating anything; a failure here must
        // leave the ledger and the request untouched.
        for line in plan.lines() {
            let batch = state
                .batches
                .get(&line.batch_id)
                .ok_or_else(|| {
                    StockError::Validation(format!("plan references unknown batch {}", line.batch_id))
                })?;
            if batch.branch_id != request.to_branch_id
                || batch.medicine_id != request.medicine_id
            {
                return Err(StockError::Validation(format!(
                    "plan batch {} is outside the source stock pool",
                    line.batch_id
                )));
            }
            let available = state.record_for(batch).available();
            if available < line.amount {
                return Err(StockError::InsufficientStock {
                    requested: line.amount,
                    available,
                });
            }
        }

        for line in plan.lines() {
            state.dispenses.push(Dispense {
                id: DispenseId::new(),
                batch_id: line.batch_id,
                quantity: line.amount,
                branch_id: request.to_branch_id,
                actor_id: confirmed_by,
                request_id: Some(request_id),
                timestamp: now,
            });
        }
        let receipt_batch = state.insert_batch(receipt);

        let request = state
            .requests
            .get_mut(&request_id)
            .ok_or(StockError::RequestNotFound(request_id))?;
        request.status = RequestStatus::Approved;
        request.confirmed_by = Some(confirmed_by);
        request.updated_at = now;

        Ok((request.clone(), receipt_batch))
    }
}
