use crate::domain::ids::{BranchId, MedicineId, RequestId, StaffId};
use crate::domain::ledger::Quantity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Approved and Rejected are terminal; no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A branch's approval-gated request to receive stock from another branch.
///
/// `from_branch_id` is the requester (and receiver of the stock);
/// `to_branch_id` is the branch asked to supply it. Created Pending and
/// transitions exactly once to Approved or Rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub id: RequestId,
    pub from_branch_id: BranchId,
    pub to_branch_id: BranchId,
    pub medicine_id: MedicineId,
    pub quantity_requested: Quantity,
    pub status: RequestStatus,
    pub requested_by: StaffId,
    pub confirmed_by: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRequest {
    pub fn new(
        from_branch_id: BranchId,
        to_branch_id: BranchId,
        medicine_id: MedicineId,
        quantity_requested: Quantity,
        requested_by: StaffId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            from_branch_id,
            to_branch_id,
            medicine_id,
            quantity_requested,
            status: RequestStatus::Pending,
            requested_by,
            confirmed_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
