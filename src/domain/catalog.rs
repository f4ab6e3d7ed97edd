use crate::domain::ids::{BranchId, MedicineId, StaffId};
use serde::{Deserialize, Serialize};

/// A clinic branch holding its own medicine stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
}

/// A medicine known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
}

/// A staff member who can request or confirm transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub branch_id: BranchId,
}
