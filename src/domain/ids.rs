use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! catalog_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

catalog_id!(
    /// Identifier of a clinic branch, assigned by the upstream catalog.
    BranchId
);
catalog_id!(
    /// Identifier of a medicine in the catalog.
    MedicineId
);
catalog_id!(
    /// Identifier of a staff member; used as the actor id on mutations.
    StaffId
);

entity_id!(
    /// Identifier of a transfer request.
    RequestId
);
entity_id!(
    /// Identifier of a stock batch.
    BatchId
);
entity_id!(
    /// Identifier of a dispense record.
    DispenseId
);
entity_id!(
    /// Identifier of an archive record.
    ArchiveId
);
entity_id!(
    /// Identifier of a notification.
    NotificationId
);
