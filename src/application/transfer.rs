use crate::application::availability::AvailabilityCalculator;
use crate::domain::allocation::{AllocationPlan, allocate};
use crate::domain::ids::{BranchId, MedicineId, RequestId, StaffId};
use crate::domain::ledger::{NewBatch, Quantity, StockAvailability};
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::ports::{
    SharedCatalogStore, SharedLedgerStore, SharedNotificationStore, SharedRequestStore,
    SharedTransferExecutor,
};
use crate::domain::request::{RequestStatus, TransferRequest};
use crate::error::{Result, StockError};
use chrono::{DateTime, Months, NaiveDate, Utc};
use tracing::{info, warn};

/// Expiration assigned to the receipt batch created at the requesting branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// The receipt inherits the earliest expiration among the consumed source
    /// batches, preserving expiry fidelity across the transfer.
    #[default]
    EarliestSource,
    /// One year from the transfer date, regardless of the source batches.
    /// Matches the behavior of the legacy system this replaces.
    OneYearFromTransfer,
}

impl ExpiryPolicy {
    fn receipt_expiration(
        &self,
        availability: &StockAvailability,
        plan: &AllocationPlan,
        today: NaiveDate,
    ) -> NaiveDate {
        match self {
            Self::OneYearFromTransfer => {
                today.checked_add_months(Months::new(12)).unwrap_or(today)
            }
            Self::EarliestSource => availability
                .batches()
                .iter()
                .filter(|b| plan.lines().iter().any(|l| l.batch_id == b.batch_id))
                .map(|b| b.expiration_date)
                .min()
                .unwrap_or(today),
        }
    }
}

/// Typed input for [`TransferService::create`], validated at the boundary
/// before anything reaches the allocation or executor paths.
#[derive(Debug, Clone)]
pub struct CreateTransferRequest {
    pub from_branch_id: BranchId,
    pub to_branch_id: BranchId,
    pub medicine_id: MedicineId,
    pub quantity_requested: u32,
    pub requested_by: StaffId,
}

/// A pending request enriched with catalog names for inbox listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequestView {
    pub request: TransferRequest,
    pub medicine_name: String,
    pub requester_name: String,
    pub from_branch_name: String,
}

/// Emits branch-inbox notifications for lifecycle events.
///
/// Emission is best-effort: catalog or store failures are logged at WARN and
/// swallowed, never rolling back the primary transition.
pub struct NotificationEmitter {
    catalog: SharedCatalogStore,
    notifications: SharedNotificationStore,
}

const UNKNOWN_BRANCH: &str = "another branch";

impl NotificationEmitter {
    pub fn new(catalog: SharedCatalogStore, notifications: SharedNotificationStore) -> Self {
        Self {
            catalog,
            notifications,
        }
    }

    pub async fn request_created(&self, request: &TransferRequest) {
        let from = self.branch_name(request.from_branch_id).await;
        let medicine = self.medicine_name(request.medicine_id).await;
        let text = format!(
            "{from} requests {} units of {medicine}",
            request.quantity_requested
        );
        self.emit(
            request.to_branch_id,
            NotificationKind::TransferRequested,
            &text,
            request,
        )
        .await;
    }

    pub async fn request_approved(&self, request: &TransferRequest) {
        let to = self.branch_name(request.to_branch_id).await;
        let medicine = self.medicine_name(request.medicine_id).await;
        let text = format!(
            "{to} approved the transfer of {} units of {medicine}",
            request.quantity_requested
        );
        self.emit(
            request.from_branch_id,
            NotificationKind::TransferApproved,
            &text,
            request,
        )
        .await;
    }

    pub async fn request_rejected(&self, request: &TransferRequest, reason: Option<&str>) {
        let to = self.branch_name(request.to_branch_id).await;
        let medicine = self.medicine_name(request.medicine_id).await;
        let mut text = format!(
            "{to} rejected the transfer of {} units of {medicine}",
            request.quantity_requested
        );
        if let Some(reason) = reason {
            text.push_str(": ");
            text.push_str(reason);
        }
        self.emit(
            request.from_branch_id,
            NotificationKind::TransferRejected,
            &text,
            request,
        )
        .await;
    }

    async fn emit(
        &self,
        branch_id: BranchId,
        kind: NotificationKind,
        text: &str,
        request: &TransferRequest,
    ) {
        let notification = Notification::new(
            branch_id,
            kind,
            text,
            request.id,
            request.medicine_id,
            Utc::now(),
        );
        if let Err(err) = self.notifications.insert(notification).await {
            warn!(
                request_id = %request.id,
                branch_id = %branch_id,
                error = %err,
                "failed to emit notification"
            );
        }
    }

    async fn branch_name(&self, id: BranchId) -> String {
        match self.catalog.branch(id).await {
            Ok(Some(branch)) => branch.name,
            Ok(None) => UNKNOWN_BRANCH.to_string(),
            Err(err) => {
                warn!(branch_id = %id, error = %err, "branch lookup failed");
                UNKNOWN_BRANCH.to_string()
            }
        }
    }

    async fn medicine_name(&self, id: MedicineId) -> String {
        match self.catalog.medicine(id).await {
            Ok(Some(medicine)) => medicine.name,
            Ok(None) => format!("medicine {id}"),
            Err(err) => {
                warn!(medicine_id = %id, error = %err, "medicine lookup failed");
                format!("medicine {id}")
            }
        }
    }
}

/// The transfer request lifecycle: create, approve, reject, list.
///
/// Owns the store ports and the availability calculator; approval serializes
/// on the supplying branch's stock guard and delegates the actual mutation to
/// the store-level [`TransferExecutor`](crate::domain::ports::TransferExecutor)
/// so status transition and ledger writes share one transaction boundary.
pub struct TransferService {
    catalog: SharedCatalogStore,
    ledger: SharedLedgerStore,
    requests: SharedRequestStore,
    executor: SharedTransferExecutor,
    calculator: AvailabilityCalculator,
    emitter: NotificationEmitter,
    expiry_policy: ExpiryPolicy,
}

impl TransferService {
    pub fn new(
        catalog: SharedCatalogStore,
        ledger: SharedLedgerStore,
        requests: SharedRequestStore,
        notifications: SharedNotificationStore,
        executor: SharedTransferExecutor,
    ) -> Self {
        let calculator = AvailabilityCalculator::new(ledger.clone());
        let emitter = NotificationEmitter::new(catalog.clone(), notifications);
        Self {
            catalog,
            ledger,
            requests,
            executor,
            calculator,
            emitter,
            expiry_policy: ExpiryPolicy::default(),
        }
    }

    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }

    /// Creates a Pending transfer request and notifies the supplying branch.
    pub async fn create(&self, input: CreateTransferRequest) -> Result<TransferRequest> {
        let quantity = Quantity::new(input.quantity_requested)?;
        if input.from_branch_id == input.to_branch_id {
            return Err(StockError::validation(
                "a branch cannot request stock from itself",
            ));
        }
        self.require_branch(input.from_branch_id).await?;
        self.require_branch(input.to_branch_id).await?;
        self.require_medicine(input.medicine_id).await?;
        self.require_staff(input.requested_by).await?;

        let request = TransferRequest::new(
            input.from_branch_id,
            input.to_branch_id,
            input.medicine_id,
            quantity,
            input.requested_by,
            Utc::now(),
        );
        self.requests.insert(request.clone()).await?;
        info!(
            request_id = %request.id,
            from = %request.from_branch_id,
            to = %request.to_branch_id,
            medicine = %request.medicine_id,
            quantity = %quantity,
            "transfer request created"
        );

        self.emitter.request_created(&request).await;
        Ok(request)
    }

    /// Approves a pending request: allocates FEFO out of the supplying (`to`)
    /// branch's stock, moves it to the requesting (`from`) branch, and marks
    /// the request Approved, all behind the stock guard.
    ///
    /// `InsufficientStock` leaves the request Pending and the ledger
    /// untouched; a request already resolved yields `AlreadyProcessed`.
    pub async fn approve(
        &self,
        request_id: RequestId,
        confirmed_by: StaffId,
    ) -> Result<TransferRequest> {
        self.require_staff(confirmed_by).await?;
        let request = self.require_request(request_id).await?;
        if request.status.is_terminal() {
            return Err(StockError::AlreadyProcessed(request_id, request.status));
        }

        // Serialize competing approvals for this stock pool. Held across
        // availability-read, allocation, and the executor commit so the
        // snapshot the plan was computed from stays valid.
        let _guard = self
            .ledger
            .lock_stock(request.to_branch_id, request.medicine_id)
            .await;

        // Authoritative status check happens inside the executor; this
        // re-read just avoids pointless allocation work for a lost race.
        let request = self.require_request(request_id).await?;
        if request.status.is_terminal() {
            return Err(StockError::AlreadyProcessed(request_id, request.status));
        }

        let availability = self
            .calculator
            .availability(request.to_branch_id, request.medicine_id)
            .await?;
        let plan = allocate(&availability, request.quantity_requested)?;

        let now = Utc::now();
        let today = now.date_naive();
        let receipt = NewBatch {
            medicine_id: request.medicine_id,
            branch_id: request.from_branch_id,
            quantity: request.quantity_requested,
            date_received: today,
            expiration_date: self
                .expiry_policy
                .receipt_expiration(&availability, &plan, today),
        };

        let (request, receipt_batch) = self
            .executor
            .execute_approval(request_id, confirmed_by, &plan, receipt, now)
            .await?;
        info!(
            request_id = %request.id,
            receipt_batch = %receipt_batch.id,
            quantity = request.quantity_requested.value(),
            "transfer request approved"
        );

        self.emitter.request_approved(&request).await;
        Ok(request)
    }

    /// Rejects a pending request and notifies the requesting branch,
    /// including the reason when given. The ledger is untouched.
    pub async fn reject(
        &self,
        request_id: RequestId,
        confirmed_by: StaffId,
        reason: Option<String>,
    ) -> Result<TransferRequest> {
        self.require_staff(confirmed_by).await?;
        let request = self
            .requests
            .transition(request_id, RequestStatus::Rejected, confirmed_by, Utc::now())
            .await?;
        info!(request_id = %request.id, "transfer request rejected");

        self.emitter
            .request_rejected(&request, reason.as_deref())
            .await;
        Ok(request)
    }

    /// Pending requests addressed to `branch_id`, enriched with catalog names.
    pub async fn pending_for_branch(&self, branch_id: BranchId) -> Result<Vec<PendingRequestView>> {
        let pending = self.requests.pending_for_branch(branch_id).await?;
        let mut views = Vec::with_capacity(pending.len());
        for request in pending {
            let medicine_name = match self.catalog.medicine(request.medicine_id).await? {
                Some(m) => m.name,
                None => format!("medicine {}", request.medicine_id),
            };
            let requester_name = match self.catalog.staff(request.requested_by).await? {
                Some(s) => s.name,
                None => format!("staff {}", request.requested_by),
            };
            let from_branch_name = match self.catalog.branch(request.from_branch_id).await? {
                Some(b) => b.name,
                None => UNKNOWN_BRANCH.to_string(),
            };
            views.push(PendingRequestView {
                request,
                medicine_name,
                requester_name,
                from_branch_name,
            });
        }
        Ok(views)
    }

    /// Availability snapshot for one (branch, medicine).
    pub async fn availability(
        &self,
        branch_id: BranchId,
        medicine_id: MedicineId,
    ) -> Result<StockAvailability> {
        self.calculator.availability(branch_id, medicine_id).await
    }

    async fn require_request(&self, id: RequestId) -> Result<TransferRequest> {
        self.requests
            .get(id)
            .await?
            .ok_or(StockError::RequestNotFound(id))
    }

    async fn require_branch(&self, id: BranchId) -> Result<()> {
        match self.catalog.branch(id).await? {
            Some(_) => Ok(()),
            None => Err(StockError::Validation(format!("unknown branch {id}"))),
        }
    }

    async fn require_medicine(&self, id: MedicineId) -> Result<()> {
        match self.catalog.medicine(id).await? {
            Some(_) => Ok(()),
            None => Err(StockError::Validation(format!("unknown medicine {id}"))),
        }
    }

    async fn require_staff(&self, id: StaffId) -> Result<()> {
        match self.catalog.staff(id).await? {
            Some(_) => Ok(()),
            None => Err(StockError::Validation(format!("unknown staff member {id}"))),
        }
    }
}
