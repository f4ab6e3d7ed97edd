use crate::domain::ids::{BranchId, MedicineId};
use crate::domain::ledger::{NewBatch, Quantity};
use crate::error::{Result, StockError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

/// One row of an opening-stock CSV: `branch, medicine, quantity, received,
/// expires` with ISO dates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockRow {
    pub branch: u32,
    pub medicine: u32,
    pub quantity: u32,
    pub received: NaiveDate,
    pub expires: NaiveDate,
}

impl TryFrom<StockRow> for NewBatch {
    type Error = StockError;

    fn try_from(row: StockRow) -> Result<Self> {
        Ok(NewBatch {
            medicine_id: MedicineId(row.medicine),
            branch_id: BranchId(row.branch),
            quantity: Quantity::new(row.quantity)?,
            date_received: row.received,
            expiration_date: row.expires,
        })
    }
}

/// Reads opening-stock rows from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<StockRow>` lazily, so large stock
/// takes stream without loading the whole file. Whitespace is trimmed.
pub struct StockReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> StockReader<R> {
    /// Creates a new `StockReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn rows(self) -> impl Iterator<Item = Result<StockRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StockError::from))
    }
}
