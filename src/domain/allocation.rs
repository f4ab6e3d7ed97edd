use crate::domain::ids::BatchId;
use crate::domain::ledger::{Quantity, StockAvailability};
use crate::error::{Result, StockError};

/// One line of a dispense plan: take `amount` units from `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationLine {
    pub batch_id: BatchId,
    pub amount: u32,
}

/// A validated dispense plan whose line amounts sum exactly to the requested
/// quantity. Produced only by [`allocate`]; applied only by the ledger store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    lines: Vec<AllocationLine>,
    requested: Quantity,
}

impl AllocationPlan {
    pub fn lines(&self) -> &[AllocationLine] {
        &self.lines
    }

    pub fn requested(&self) -> Quantity {
        self.requested
    }
}

/// Allocates `requested` units across the available batches, first-expired
/// first-out.
///
/// Walks the availability sequence in order (ascending expiration, ties by
/// batch creation order) and takes `min(available, remaining)` from each
/// batch until the request is covered. The policy is a total order on
/// batches, so the plan for a given snapshot is unique.
///
/// Returns `InsufficientStock` without producing any plan when the total
/// available is short; callers must not apply partial allocations.
pub fn allocate(availability: &StockAvailability, requested: Quantity) -> Result<AllocationPlan> {
    if availability.total() < requested.value() {
        return Err(StockError::InsufficientStock {
            requested: requested.value(),
            available: availability.total(),
        });
    }

    let mut remaining = requested.value();
    let mut lines = Vec::new();
    for batch in availability.batches() {
        if remaining == 0 {
            break;
        }
        let amount = batch.available.min(remaining);
        lines.push(AllocationLine {
            batch_id: batch.batch_id,
            amount,
        });
        remaining -= amount;
    }

    debug_assert_eq!(remaining, 0);
    Ok(AllocationPlan { lines, requested })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{BranchId, MedicineId};
    use crate::domain::ledger::{BatchRecord, StockBatch};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(seq: u64, expires: NaiveDate, quantity: u32, dispensed: u32) -> BatchRecord {
        BatchRecord {
            batch: StockBatch {
                id: BatchId::new(),
                medicine_id: MedicineId(1),
                branch_id: BranchId(1),
                quantity,
                date_received: date(2024, 1, 1),
                expiration_date: expires,
                seq,
            },
            dispensed,
            archived: 0,
        }
    }

    fn qty(v: u32) -> Quantity {
        Quantity::new(v).unwrap()
    }

    #[test]
    fn test_allocation_exact_split_across_batches() {
        // Mirrors the 90 + 50 ledger: 120 requested takes 90 then 30.
        let records = vec![
            record(1, date(2025, 1, 1), 100, 10),
            record(2, date(2025, 6, 1), 50, 0),
        ];
        let availability = StockAvailability::from_records(&records);

        let plan = allocate(&availability, qty(120)).unwrap();
        let amounts: Vec<u32> = plan.lines().iter().map(|l| l.amount).collect();
        assert_eq!(amounts, vec![90, 30]);
        assert_eq!(plan.lines()[0].batch_id, records[0].batch.id);
        assert_eq!(plan.lines()[1].batch_id, records[1].batch.id);
    }

    #[test]
    fn test_allocation_amounts_sum_to_requested() {
        let records = vec![
            record(1, date(2025, 1, 1), 7, 0),
            record(2, date(2025, 2, 1), 11, 0),
            record(3, date(2025, 3, 1), 13, 0),
        ];
        let availability = StockAvailability::from_records(&records);

        for requested in [1, 7, 8, 18, 31] {
            let plan = allocate(&availability, qty(requested)).unwrap();
            let total: u32 = plan.lines().iter().map(|l| l.amount).sum();
            assert_eq!(total, requested);
        }
    }

    #[test]
    fn test_allocation_exhausts_earlier_expiry_first() {
        let earlier = record(2, date(2025, 1, 1), 10, 0);
        let later = record(1, date(2025, 6, 1), 10, 0);
        let availability = StockAvailability::from_records(&[later.clone(), earlier.clone()]);

        let plan = allocate(&availability, qty(10)).unwrap();
        assert_eq!(plan.lines().len(), 1);
        assert_eq!(plan.lines()[0].batch_id, earlier.batch.id);

        let plan = allocate(&availability, qty(11)).unwrap();
        assert_eq!(plan.lines()[0].batch_id, earlier.batch.id);
        assert_eq!(plan.lines()[0].amount, 10);
        assert_eq!(plan.lines()[1].batch_id, later.batch.id);
        assert_eq!(plan.lines()[1].amount, 1);
    }

    #[test]
    fn test_allocation_insufficient_stock() {
        let records = vec![
            record(1, date(2025, 1, 1), 100, 10),
            record(2, date(2025, 6, 1), 50, 0),
        ];
        let availability = StockAvailability::from_records(&records);

        let err = allocate(&availability, qty(200)).unwrap_err();
        assert!(matches!(
            err,
            StockError::InsufficientStock {
                requested: 200,
                available: 140,
            }
        ));
    }

    #[test]
    fn test_allocation_from_empty_ledger() {
        let availability = StockAvailability::from_records(&[]);
        assert!(matches!(
            allocate(&availability, qty(1)),
            Err(StockError::InsufficientStock {
                requested: 1,
                available: 0,
            })
        ));
    }
}
