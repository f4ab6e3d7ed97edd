pub mod report_writer;
pub mod stock_reader;
