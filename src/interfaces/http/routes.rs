use crate::domain::ids::{BranchId, MedicineId, RequestId, StaffId};
use crate::error::StockError;
use crate::interfaces::http::AppState;
use crate::interfaces::http::dto;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use axum::routing::{get, post};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/transfer-requests",
            post(create_transfer_request).get(list_pending_requests),
        )
        .route("/transfer-requests/:id/approve", post(approve_request))
        .route("/transfer-requests/:id/reject", post(reject_request))
        .route("/branches/:id/stock/:medicine", get(branch_stock))
        .route("/branches/:id/notifications", get(branch_notifications))
        .with_state(state)
}

async fn create_transfer_request(
    State(state): State<AppState>,
    Json(body): Json<dto::CreateTransferRequestBody>,
) -> Response {
    match state.service.create(body.into()).await {
        Ok(request) => (
            StatusCode::CREATED,
            Json(dto::CreatedResponse {
                request_id: request.id,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_pending_requests(
    State(state): State<AppState>,
    Query(params): Query<dto::ListRequestsParams>,
) -> Response {
    if let Some(status) = params.status.as_deref()
        && status != "pending"
    {
        return json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            "only status=pending is supported",
        );
    }
    match state
        .service
        .pending_for_branch(BranchId(params.branch))
        .await
    {
        Ok(views) => {
            let list: Vec<dto::PendingRequestDto> =
                views.into_iter().map(Into::into).collect();
            Json(list).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<dto::ConfirmBody>,
) -> Response {
    match state
        .service
        .approve(RequestId(id), StaffId(body.confirmed_by))
        .await
    {
        Ok(request) => Json(dto::TransferRequestDto::from(request)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn reject_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<dto::ConfirmBody>,
) -> Response {
    match state
        .service
        .reject(RequestId(id), StaffId(body.confirmed_by), body.reason)
        .await
    {
        Ok(request) => Json(dto::TransferRequestDto::from(request)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn branch_stock(
    State(state): State<AppState>,
    Path((branch, medicine)): Path<(u32, u32)>,
) -> Response {
    match state
        .service
        .availability(BranchId(branch), MedicineId(medicine))
        .await
    {
        Ok(availability) => Json(dto::AvailabilityDto::from(availability)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn branch_notifications(State(state): State<AppState>, Path(branch): Path<u32>) -> Response {
    match state.notifications.for_branch(BranchId(branch)).await {
        Ok(notifications) => {
            let list: Vec<dto::NotificationDto> =
                notifications.into_iter().map(Into::into).collect();
            Json(list).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Maps the error taxonomy onto the HTTP contract. Storage faults are logged
/// in full and surfaced as a generic server error.
fn error_response(err: StockError) -> Response {
    match err {
        StockError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
        }
        StockError::RequestNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
        }
        StockError::AlreadyProcessed(..) => {
            json_error(StatusCode::CONFLICT, "already_processed", err.to_string())
        }
        StockError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", err.to_string())
        }
        StockError::Storage(source) => {
            error!(error = %source, "storage fault while handling request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal server error",
            )
        }
    }
}

fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
