use crate::domain::ids::RequestId;
use crate::domain::request::RequestStatus;
use thiserror::Error;

pub type Result<T, E = StockError> = std::result::Result<T, E>;

/// Error taxonomy of the transfer workflow.
///
/// The first four variants are client-recoverable conditions and carry no
/// internal detail. `Storage` wraps persistence-layer faults; callers log the
/// source and surface a generic message to external clients.
#[derive(Error, Debug)]
pub enum StockError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transfer request {0} not found")]
    RequestNotFound(RequestId),
    #[error("transfer request {0} already {1}")]
    AlreadyProcessed(RequestId, RequestStatus),
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

impl From<serde_json::Error> for StockError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(err)
    }
}

impl From<std::io::Error> for StockError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err)
    }
}

impl From<csv::Error> for StockError {
    fn from(err: csv::Error) -> Self {
        Self::storage(err)
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StockError {
    fn from(err: rocksdb::Error) -> Self {
        Self::storage(err)
    }
}
