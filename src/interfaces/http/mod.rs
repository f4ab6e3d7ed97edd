pub mod dto;
pub mod routes;

use crate::application::transfer::TransferService;
use crate::domain::ports::SharedNotificationStore;
use std::sync::Arc;

pub use routes::router;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TransferService>,
    pub notifications: SharedNotificationStore,
}

impl AppState {
    pub fn new(service: Arc<TransferService>, notifications: SharedNotificationStore) -> Self {
        Self {
            service,
            notifications,
        }
    }
}
