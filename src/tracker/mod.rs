//! [ActivityTracker] ties session timing, recording and aggregation together on top of an
//! [EntryStorage]. Recording is best-effort: storage failures are logged and swallowed, and
//! queries fall back to an empty history.

pub mod aggregation;
pub mod recorder;
pub mod seed;
pub mod session;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use aggregation::{CategoryTotals, DailyTotals, Period, WindowPolicy};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use session::{ActiveSession, SessionTable};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    error::TrackerError,
    storage::{
        entities::{Category, SubjectId, TimeEntry},
        entry_storage::EntryStorage,
    },
    utils::clock::Clock,
};

pub struct ActivityTracker<S: EntryStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    sessions: SessionTable,
    subject_locks: SubjectLocks,
}

impl<S: EntryStorage> ActivityTracker<S> {
    pub fn new(storage: S, clock: Box<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            sessions: SessionTable::default(),
            subject_locks: SubjectLocks::default(),
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Opens a session for the subject. A session that is already open gets stopped first, even
    /// if it tracks the same category.
    #[instrument(skip(self))]
    pub async fn start_tracking(&self, subject: &SubjectId, category: Category) {
        let now = self.clock.time();
        let session = ActiveSession {
            category,
            started: now,
        };
        if let Some(previous) = self.sessions.begin(subject.clone(), session) {
            debug!("Switching from {previous:?}");
            self.finish_session(subject, previous, now).await;
        }
    }

    /// Closes the open session and records the whole minutes it lasted. Returns the recorded
    /// minutes, 0 when there was nothing to stop.
    #[instrument(skip(self))]
    pub async fn stop_tracking(&self, subject: &SubjectId) -> u32 {
        match self.sessions.take(subject) {
            Some(session) => self.finish_session(subject, session, self.clock.time()).await,
            None => {
                debug!("No active session");
                0
            }
        }
    }

    pub fn active_session(&self, subject: &SubjectId) -> Option<ActiveSession> {
        self.sessions.get(subject)
    }

    async fn finish_session(
        &self,
        subject: &SubjectId,
        session: ActiveSession,
        now: DateTime<Utc>,
    ) -> u32 {
        let minutes = session.elapsed_minutes(now);
        if minutes > 0 {
            self.record_time_spent(subject, session.category, minutes).await;
        } else {
            debug!("Dropping sub-minute session {session:?}");
        }
        minutes
    }

    /// Adds minutes to today's bucket of the category. Zero minutes are ignored.
    #[instrument(skip(self))]
    pub async fn record_time_spent(&self, subject: &SubjectId, category: Category, minutes: u32) {
        if minutes == 0 {
            return;
        }

        let _guard = self.subject_locks.acquire(subject).await;

        let today = self.clock.today();
        let now = self.clock.time();
        let bucket_subject = subject.clone();
        let update = Box::new(move |entries: &mut Vec<TimeEntry>| {
            recorder::add_minutes(entries, &bucket_subject, today, category, minutes, now);
            true
        });

        match self.storage.update_entries(subject, update).await {
            Ok(outcome) => {
                let bucket = outcome
                    .entries
                    .iter()
                    .find(|v| v.is_bucket(today, category))
                    .map_or(minutes, |v| v.minutes);
                info!("Recorded {minutes} minutes of {category} on {today}, {bucket} in total")
            }
            // The storage doesn't write a history it failed to read, so only this increment is lost.
            Err(e) => error!("Failed to record {minutes} minutes of {category}: {e:?}"),
        }
    }

    /// Day by day totals for one of the named windows.
    pub async fn daily_series(&self, subject: &SubjectId, policy: WindowPolicy) -> Vec<DailyTotals> {
        let (start, end) = policy.window(self.clock.today());
        self.daily_series_between(subject, start, end).await
    }

    /// Day by day totals between start and end (inclusive), oldest first.
    pub async fn daily_series_between(
        &self,
        subject: &SubjectId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyTotals> {
        let entries = self.history(subject).await;
        aggregation::daily_series(&entries, start, end)
    }

    /// Minutes spent during the period over all categories.
    pub async fn total(&self, subject: &SubjectId, period: Period) -> u32 {
        self.category_totals(subject, period).await.total()
    }

    pub async fn category_totals(&self, subject: &SubjectId, period: Period) -> CategoryTotals {
        let (start, end) = period.window(self.clock.today());
        let entries = self.history(subject).await;
        aggregation::category_totals(&entries, start, end)
    }

    /// Stores a synthetic week of activity when the subject has no history. Returns whether
    /// anything was written.
    #[instrument(skip(self, rng))]
    pub async fn seed_if_empty(
        &self,
        subject: &SubjectId,
        rng: &mut (impl Rng + Send),
    ) -> Result<bool, TrackerError> {
        let _guard = self.subject_locks.acquire(subject).await;

        let history =
            seed::synthetic_history(subject, self.clock.today(), self.clock.time(), rng);
        let update = Box::new(move |entries: &mut Vec<TimeEntry>| {
            if !entries.is_empty() {
                return false;
            }
            *entries = history;
            true
        });

        let outcome = self
            .storage
            .update_entries(subject, update)
            .await
            .map_err(|source| TrackerError::StorageUnavailable {
                subject: subject.clone(),
                source,
            })?;
        if outcome.written {
            info!("Seeded {} entries", outcome.entries.len());
        } else {
            debug!("Subject already has {} entries", outcome.entries.len());
        }
        Ok(outcome.written)
    }

    async fn history(&self, subject: &SubjectId) -> Vec<TimeEntry> {
        self.storage.load_entries(subject).await.unwrap_or_else(|e| {
            warn!("Failed to load entries for {subject}, treating history as empty: {e:?}");
            vec![]
        })
    }
}

/// Serializes read-modify-write cycles of a single subject. Different subjects don't block
/// each other.
#[derive(Default)]
struct SubjectLocks {
    locks: Mutex<HashMap<SubjectId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SubjectLocks {
    async fn acquire(&self, subject: &SubjectId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(subject.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
