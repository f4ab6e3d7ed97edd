use crate::domain::ledger::BatchRecord;
use crate::error::Result;
use std::io::Write;

/// Writes a per-batch availability report as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header plus one row per batch, in batch creation order.
    pub fn write_records(&mut self, records: &[BatchRecord]) -> Result<()> {
        self.writer.write_record([
            "branch",
            "medicine",
            "received",
            "expires",
            "quantity",
            "dispensed",
            "archived",
            "available",
        ])?;
        for record in records {
            self.writer.write_record([
                record.batch.branch_id.to_string(),
                record.batch.medicine_id.to_string(),
                record.batch.date_received.to_string(),
                record.batch.expiration_date.to_string(),
                record.batch.quantity.to_string(),
                record.dispensed.to_string(),
                record.archived.to_string(),
                record.available().to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
