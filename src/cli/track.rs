use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    storage::{
        entities::{Category, SubjectId},
        entry_storage::EntryStorage,
    },
    tracker::ActivityTracker,
};

/// Keeps a session open until `shutdown` fires or `limit` passes on the tracker clock, then stops
/// it. Returns the recorded minutes.
pub async fn track_until_stopped<S: EntryStorage>(
    tracker: &ActivityTracker<S>,
    subject: &SubjectId,
    category: Category,
    limit: Option<Duration>,
    shutdown: CancellationToken,
) -> u32 {
    tracker.start_tracking(subject, category).await;

    let limit_reached = async {
        match limit {
            Some(limit) => tracker.clock().sleep(limit).await,
            None => std::future::pending().await,
        }
    };

    select! {
        _ = shutdown.cancelled() => info!("Tracking interrupted"),
        _ = limit_reached => info!("Tracking limit reached"),
    }

    tracker.stop_tracking(subject).await
}
