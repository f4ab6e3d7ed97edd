pub mod availability;
pub mod transfer;
