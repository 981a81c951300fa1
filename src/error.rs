//! Errors surfaced at the boundary of the tracker.

use crate::storage::entities::SubjectId;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Unknown activity category: {0:?}")]
    InvalidCategory(String),

    #[error("Invalid subject identifier {subject:?}: {reason}")]
    InvalidSubject { subject: String, reason: &'static str },

    #[error("Storage unavailable for {subject}: {source}")]
    StorageUnavailable {
        subject: SubjectId,
        #[source]
        source: anyhow::Error,
    },
}
