pub mod allocation;
pub mod catalog;
pub mod ids;
pub mod ledger;
pub mod notification;
pub mod ports;
pub mod request;
