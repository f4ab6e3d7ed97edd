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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for branches.
pub const CF_BRANCHES: &str = "branches";
/// Column Family for medicines.
pub const CF_MEDICINES: &str = "medicines";
/// Column Family for staff members.
pub const CF_STAFF: &str = "staff";
/// Column Family for stock batches.
pub const CF_BATCHES: &str = "batches";
/// Column Family for dispense records.
pub const CF_DISPENSES: &str = "dispenses";
/// Column Family for archive records.
pub const CF_ARCHIVES: &str = "archives";
/// Column Family for transfer requests.
pub const CF_REQUESTS: &str = "requests";
/// Column Family for notifications.
pub const CF_NOTIFICATIONS: &str = "notifications";
/// Column Family for store metadata (the batch seq counter).
pub const CF_META: &str = "meta";

const KEY_NEXT_SEQ: &[u8] = b"next_seq";

const ALL_CFS: [&str; 9] = [
    CF_BRANCHES,
    CF_MEDICINES,
    CF_STAFF,
    CF_BATCHES,
    CF_DISPENSES,
    CF_ARCHIVES,
    CF_REQUESTS,
    CF_NOTIFICATIONS,
    CF_META,
];

/// Persistent storage adapter backed by RocksDB.
///
/// Entities live in separate Column Families with JSON values. Read-validate-
/// write sequences are serialized by an internal write mutex, and each
/// multi-record mutation is flushed through a single `WriteBatch`, so the
/// atomic units of the workflow either commit wholly or not at all.
///
/// `Clone` shares the underlying `Arc<DB>` and locks.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
    stock_locks: Arc<Mutex<HashMap<(BranchId, MedicineId), Arc<Mutex<()>>>>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the given path, ensuring all
    /// required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
            stock_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            StockError::storage(std::io::Error::other(format!(
                "column family {name} not found"
            )))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf)?;
        let mut items = Vec::new();
        for entry in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = entry?;
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    fn next_seq(&self) -> Result<u64> {
        let current: u64 = self
            .get_json(CF_META, KEY_NEXT_SEQ)?
            .unwrap_or(0);
        let next = current + 1;
        self.put_json(CF_META, KEY_NEXT_SEQ, &next)?;
        Ok(next)
    }

    fn record_for(&self, batch: &StockBatch) -> Result<BatchRecord> {
        let dispensed = self
            .scan::<Dispense>(CF_DISPENSES)?
            .into_iter()
            .filter(|d| d.batch_id == batch.id)
            .map(|d| d.quantity)
            .sum();
        let archived = self
            .scan::<Archive>(CF_ARCHIVES)?
            .into_iter()
            .filter(|a| a.batch_id == batch.id)
            .map(|a| a.quantity)
            .sum();
        Ok(BatchRecord {
            batch: batch.clone(),
            dispensed,
            archived,
        })
    }

    fn get_batch(&self, id: BatchId) -> Result<StockBatch> {
        self.get_json::<StockBatch>(CF_BATCHES, id.0.as_bytes())?
            .ok_or_else(|| StockError::Validation(format!("unknown batch {id}")))
    }
}

#[async_trait]
impl CatalogStore for RocksDbStore {
    async fn insert_branch(&self, branch: Branch) -> Result<()> {
        self.put_json(CF_BRANCHES, &branch.id.0.to_be_bytes(), &branch)
    }

    async fn insert_medicine(&self, medicine: Medicine) -> Result<()> {
        self.put_json(CF_MEDICINES, &medicine.id.0.to_be_bytes(), &medicine)
    }

    async fn insert_staff(&self, staff: StaffMember) -> Result<()> {
        self.put_json(CF_STAFF, &staff.id.0.to_be_bytes(), &staff)
    }

    async fn branch(&self, id: BranchId) -> Result<Option<Branch>> {
        self.get_json(CF_BRANCHES, &id.0.to_be_bytes())
    }

    async fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>> {
        self.get_json(CF_MEDICINES, &id.0.to_be_bytes())
    }

    async fn staff(&self, id: StaffId) -> Result<Option<StaffMember>> {
        self.get_json(CF_STAFF, &id.0.to_be_bytes())
    }
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn insert_batch(&self, batch: NewBatch) -> Result<StockBatch> {
        let _write = self.write_lock.lock().await;
        let batch = StockBatch {
            id: BatchId::new(),
            medicine_id: batch.medicine_id,
            branch_id: batch.branch_id,
            quantity: batch.quantity.value(),
            date_received: batch.date_received,
            expiration_date: batch.expiration_date,
            seq: self.next_seq()?,
        };
        self.put_json(CF_BATCHES, batch.id.0.as_bytes(), &batch)?;
        Ok(batch)
    }

    async fn record_dispense(
        &self,
        batch_id: BatchId,
        quantity: Quantity,
        actor_id: StaffId,
        now: DateTime<Utc>,
    ) -> Result<Dispense> {
        let _write = self.write_lock.lock().await;
        let batch = self.get_batch(batch_id)?;
        let available = self.record_for(&batch)?.available();
        if available < quantity.value() {
            return Err(StockError::InsufficientStock {
                requested: quantity.value(),
                available,
            });
        }
        let dispense = Dispense {
            id: DispenseId::new(),
            batch_id,
            quantity: quantity.value(),
            branch_id: batch.branch_id,
            actor_id,
            request_id: None,
            timestamp: now,
        };
        self.put_json(CF_DISPENSES, dispense.id.0.as_bytes(), &dispense)?;
        Ok(dispense)
    }

    async fn record_archive(
        &self,
        batch_id: BatchId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Result<Archive> {
        let _write = self.write_lock.lock().await;
        let batch = self.get_batch(batch_id)?;
        let available = self.record_for(&batch)?.available();
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
        self.put_json(CF_ARCHIVES, archive.id.0.as_bytes(), &archive)?;
        Ok(archive)
    }

    async fn batch_records(
        &self,
        branch_id: BranchId,
        medicine_id: MedicineId,
    ) -> Result<Vec<BatchRecord>> {
        let batches = self.scan::<StockBatch>(CF_BATCHES)?;
        let mut records = Vec::new();
        for batch in batches
            .into_iter()
            .filter(|b| b.branch_id == branch_id && b.medicine_id == medicine_id)
        {
            records.push(self.record_for(&batch)?);
        }
        Ok(records)
    }

    async fn all_batch_records(&self) -> Result<Vec<BatchRecord>> {
        let batches = self.scan::<StockBatch>(CF_BATCHES)?;
        let mut records = Vec::with_capacity(batches.len());
        for batch in batches {
            records.push(self.record_for(&batch)?);
        }
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
impl RequestStore for RocksDbStore {
    async fn insert(&self, request: TransferRequest) -> Result<()> {
        self.put_json(CF_REQUESTS, request.id.0.as_bytes(), &request)
    }

    async fn get(&self, id: RequestId) -> Result<Option<TransferRequest>> {
        self.get_json(CF_REQUESTS, id.0.as_bytes())
    }

    async fn pending_for_branch(&self, branch_id: BranchId) -> Result<Vec<TransferRequest>> {
        let mut pending: Vec<TransferRequest> = self
            .scan::<TransferRequest>(CF_REQUESTS)?
            .into_iter()
            .filter(|r| r.to_branch_id == branch_id && r.status == RequestStatus::Pending)
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
        let _write = self.write_lock.lock().await;
        let mut request = self
            .get_json::<TransferRequest>(CF_REQUESTS, id.0.as_bytes())?
            .ok_or(StockError::RequestNotFound(id))?;
        if request.status != RequestStatus::Pending {
            return Err(StockError::AlreadyProcessed(id, request.status));
        }
        request.status = to;
        request.confirmed_by = Some(confirmed_by);
        request.updated_at = now;
        self.put_json(CF_REQUESTS, id.0.as_bytes(), &request)?;
        Ok(request)
    }
}

#[async_trait]
impl NotificationStore for RocksDbStore {
    async fn insert(&self, notification: Notification) -> Result<()> {
        self.put_json(CF_NOTIFICATIONS, notification.id.0.as_bytes(), &notification)
    }

    async fn for_branch(&self, branch_id: BranchId) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .scan::<Notification>(CF_NOTIFICATIONS)?
            .into_iter()
            .filter(|n| n.branch_id == branch_id)
            .collect();
        notifications.sort_by_key(|n| n.created_at);
        Ok(notifications)
    }
}

#[async_trait]
impl TransferExecutor for RocksDbStore {
    async fn execute_approval(
        &self,
        request_id: RequestId,
        confirmed_by: StaffId,
        plan: &AllocationPlan,
        receipt: NewBatch,
        now: DateTime<Utc>,
    ) -> Result<(TransferRequest, StockBatch)> {
        let _write = self.write_lock.lock().await;

        let mut request = self
            .get_json::<TransferRequest>(CF_REQUESTS, request_id.0.as_bytes())?
            .ok_or(StockError::RequestNotFound(request_id))?;
        if request.status != RequestStatus::Pending {
            return Err(StockError::AlreadyProcessed(request_id, request.status));
        }

        for line in plan.lines() {
            let batch = self.get_batch(line.batch_id)?;
            if batch.branch_id != request.to_branch_id
                || batch.medicine_id != request.medicine_id
            {
                return Err(StockError::Validation(format!(
                    "plan batch {} is outside the source stock pool",
                    line.batch_id
                )));
            }
            let available = self.record_for(&batch)?.available();
            if available < line.amount {
                return Err(StockError::InsufficientStock {
                    requested: line.amount,
                    available,
                });
            }
        }

        // All checks passed; stage every mutation in one WriteBatch.
        let mut wb = WriteBatch::default();
        let cf_dispenses = self.cf(CF_DISPENSES)?;
        for line in plan.lines() {
            let dispense = Dispense {
                id: DispenseId::new(),
                batch_id: line.batch_id,
                quantity: line.amount,
                branch_id: request.to_branch_id,
                actor_id: confirmed_by,
                request_id: Some(request_id),
                timestamp: now,
            };
            wb.put_cf(
                cf_dispenses,
                dispense.id.0.as_bytes(),
                serde_json::to_vec(&dispense)?,
            );
        }

        let seq: u64 = self.get_json(CF_META, KEY_NEXT_SEQ)?.unwrap_or(0) + 1;
        let receipt_batch = StockBatch {
            id: BatchId::new(),
            medicine_id: receipt.medicine_id,
            branch_id: receipt.branch_id,
            quantity: receipt.quantity.value(),
            date_received: receipt.date_received,
            expiration_date: receipt.expiration_date,
            seq,
        };
        wb.put_cf(
            self.cf(CF_META)?,
            KEY_NEXT_SEQ,
            serde_json::to_vec(&seq)?,
        );
        wb.put_cf(
            self.cf(CF_BATCHES)?,
            receipt_batch.id.0.as_bytes(),
            serde_json::to_vec(&receipt_batch)?,
        );

        request.status = RequestStatus::Approved;
        request.confirmed_by = Some(confirmed_by);
        request.updated_at = now;
        wb.put_cf(
            self.cf(CF_REQUESTS)?,
            request_id.0.as_bytes(),
            serde_json::to_vec(&request)?,
        );

        self.db.write(wb)?;
        Ok((request, receipt_batch))
    }
}
