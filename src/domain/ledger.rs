use crate::domain::ids::{ArchiveId, BatchId, BranchId, DispenseId, MedicineId, RequestId, StaffId};
use crate::error::{Result, StockError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A strictly positive number of stock units.
///
/// Wraps `u32` to enforce the domain rule that requested and dispensed
/// quantities are never zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(StockError::validation("quantity must be positive"))
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = StockError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One receipt of a medicine at a branch.
///
/// Immutable once created; deductions happen only through derived
/// [`Dispense`] and [`Archive`] records. `seq` is assigned monotonically by
/// the ledger store and breaks expiration ties in batch creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBatch {
    pub id: BatchId,
    pub medicine_id: MedicineId,
    pub branch_id: BranchId,
    pub quantity: u32,
    pub date_received: NaiveDate,
    pub expiration_date: NaiveDate,
    pub seq: u64,
}

/// A new batch about to be inserted; the store assigns id and seq.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBatch {
    pub medicine_id: MedicineId,
    pub branch_id: BranchId,
    pub quantity: Quantity,
    pub date_received: NaiveDate,
    pub expiration_date: NaiveDate,
}

/// A deduction against exactly one batch, representing stock leaving through
/// a transfer. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispense {
    pub id: DispenseId,
    pub batch_id: BatchId,
    pub quantity: u32,
    pub branch_id: BranchId,
    pub actor_id: StaffId,
    pub request_id: Option<RequestId>,
    pub timestamp: DateTime<Utc>,
}

/// A deduction for non-transfer reasons (spoilage, write-off).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub id: ArchiveId,
    pub batch_id: BatchId,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
}

/// A batch together with the deduction totals recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch: StockBatch,
    pub dispensed: u32,
    pub archived: u32,
}

impl BatchRecord {
    /// Remaining quantity: `quantity - dispensed - archived`, floored at zero.
    pub fn available(&self) -> u32 {
        self.batch
            .quantity
            .saturating_sub(self.dispensed)
            .saturating_sub(self.archived)
    }
}

/// The allocable stock of one (branch, medicine), ordered for FEFO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAvailability {
    batches: Vec<BatchAvailability>,
    total: u32,
}

/// One allocable batch with its remaining quantity (always > 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAvailability {
    pub batch_id: BatchId,
    pub expiration_date: NaiveDate,
    pub seq: u64,
    pub available: u32,
}

impl StockAvailability {
    /// Builds the availability view from raw ledger records.
    ///
    /// Batches with nothing left are excluded; the rest are sorted by
    /// ascending expiration date, ties broken by batch creation order.
    pub fn from_records(records: &[BatchRecord]) -> Self {
        let mut batches: Vec<BatchAvailability> = records
            .iter()
            .filter(|r| r.available() > 0)
            .map(|r| BatchAvailability {
                batch_id: r.batch.id,
                expiration_date: r.batch.expiration_date,
                seq: r.batch.seq,
                available: r.available(),
            })
            .collect();
        batches.sort_by_key(|b| (b.expiration_date, b.seq));
        let total = batches.iter().map(|b| b.available).sum();
        Self { batches, total }
    }

    pub fn batches(&self) -> &[BatchAvailability] {
        &self.batches
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
