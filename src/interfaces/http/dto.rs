use crate::application::transfer::{CreateTransferRequest, PendingRequestView};
use crate::domain::ids::{BatchId, BranchId, MedicineId, NotificationId, RequestId, StaffId};
use crate::domain::ledger::StockAvailability;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::request::{RequestStatus, TransferRequest};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequestBody {
    pub from_branch_id: u32,
    pub to_branch_id: u32,
    pub medicine_id: u32,
    pub quantity_requested: u32,
    pub requested_by: u32,
}

impl From<CreateTransferRequestBody> for CreateTransferRequest {
    fn from(body: CreateTransferRequestBody) -> Self {
        Self {
            from_branch_id: BranchId(body.from_branch_id),
            to_branch_id: BranchId(body.to_branch_id),
            medicine_id: MedicineId(body.medicine_id),
            quantity_requested: body.quantity_requested,
            requested_by: StaffId(body.requested_by),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub request_id: RequestId,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    pub confirmed_by: u32,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListRequestsParams {
    pub branch: u32,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferRequestDto {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub confirmed_by: Option<StaffId>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransferRequest> for TransferRequestDto {
    fn from(request: TransferRequest) -> Self {
        Self {
            request_id: request.id,
            status: request.status,
            confirmed_by: request.confirmed_by,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PendingRequestDto {
    pub request_id: RequestId,
    pub from_branch_id: BranchId,
    pub from_branch_name: String,
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub quantity_requested: u32,
    pub requested_by: StaffId,
    pub requester_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<PendingRequestView> for PendingRequestDto {
    fn from(view: PendingRequestView) -> Self {
        Self {
            request_id: view.request.id,
            from_branch_id: view.request.from_branch_id,
            from_branch_name: view.from_branch_name,
            medicine_id: view.request.medicine_id,
            medicine_name: view.medicine_name,
            quantity_requested: view.request.quantity_requested.value(),
            requested_by: view.request.requested_by,
            requester_name: view.requester_name,
            created_at: view.request.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchAvailabilityDto {
    pub batch_id: BatchId,
    pub expiration_date: NaiveDate,
    pub available: u32,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityDto {
    pub batches: Vec<BatchAvailabilityDto>,
    pub total: u32,
}

impl From<StockAvailability> for AvailabilityDto {
    fn from(availability: StockAvailability) -> Self {
        Self {
            total: availability.total(),
            batches: availability
                .batches()
                .iter()
                .map(|b| BatchAvailabilityDto {
                    batch_id: b.batch_id,
                    expiration_date: b.expiration_date,
                    available: b.available,
                })
                .collect(),
        }
    }
}

/// Notification as shown to the UI; the correlation suffix is stripped.
#[derive(Debug, Serialize)]
pub struct NotificationDto {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub reference_id: MedicineId,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationDto {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            message: notification.display_message().to_string(),
            reference_id: notification.reference_id,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}
