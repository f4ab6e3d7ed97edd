use crate::domain::ids::{BranchId, MedicineId};
use crate::domain::ledger::StockAvailability;
use crate::domain::ports::SharedLedgerStore;
use crate::error::Result;

/// Computes real-time stock availability from the ledger.
///
/// Pure read path: batches of one (branch, medicine) joined with their
/// dispense/archive totals, filtered to allocable remainders and ordered for
/// FEFO. An empty ledger yields an empty view with total 0.
#[derive(Clone)]
pub struct AvailabilityCalculator {
    ledger: SharedLedgerStore,
}

impl AvailabilityCalculator {
    pub fn new(ledger: SharedLedgerStore) -> Self {
        Self { ledger }
    }

    pub async fn availability(
        &self,
        branch_id: BranchId,
        medicine_id: MedicineId,
    ) -> Result<StockAvailability> {
        let records = self.ledger.batch_records(branch_id, medicine_id).await?;
        Ok(StockAvailability::from_records(&records))
    }
}
