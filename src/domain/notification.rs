use crate::domain::ids::{BranchId, MedicineId, NotificationId, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TransferRequested,
    TransferApproved,
    TransferRejected,
}

/// A branch-inbox message. Write-only from this core's perspective; the UI
/// reads it and flips `is_read`.
///
/// The stored message ends with a hidden `[req:<id>]` correlation suffix used
/// for support and debugging; [`Notification::display_message`] strips it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub branch_id: BranchId,
    pub kind: NotificationKind,
    pub message: String,
    pub reference_id: MedicineId,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        branch_id: BranchId,
        kind: NotificationKind,
        human_text: &str,
        request_id: RequestId,
        reference_id: MedicineId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            branch_id,
            kind,
            message: format!("{human_text} [req:{request_id}]"),
            reference_id,
            is_read: false,
            created_at: now,
        }
    }

    /// The message without the trailing correlation token.
    pub fn display_message(&self) -> &str {
        match self.message.rfind(" [req:") {
            Some(idx) if self.message.ends_with(']') => &self.message[..idx],
            _ => &self.message,
        }
    }

    /// Extracts the correlation token, if the suffix is intact.
    pub fn correlation_id(&self) -> Option<RequestId> {
        let start = self.message.rfind("[req:")?;
        let token = self.message[start + 5..].strip_suffix(']')?;
        token.parse::<uuid::Uuid>().ok().map(RequestId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_correlation_suffix() {
        let request_id = RequestId::new();
        let n = Notification::new(
            BranchId(1),
            NotificationKind::TransferRequested,
            "Main Clinic requests 20 units of Amoxicillin",
            request_id,
            MedicineId(5),
            Utc::now(),
        );

        assert!(n.message.ends_with(&format!("[req:{request_id}]")));
        assert_eq!(
            n.display_message(),
            "Main Clinic requests 20 units of Amoxicillin"
        );
        assert_eq!(n.correlation_id(), Some(request_id));
        assert!(!n.is_read);
    }

    #[test]
    fn test_display_message_without_suffix() {
        let mut n = Notification::new(
            BranchId(1),
            NotificationKind::TransferRejected,
            "rejected",
            RequestId::new(),
            MedicineId(5),
            Utc::now(),
        );
        n.message = "a plain message".to_string();
        assert_eq!(n.display_message(), "a plain message");
        assert_eq!(n.correlation_id(), None);
    }
}
