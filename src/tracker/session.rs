use std::{collections::HashMap, sync::Mutex};

use chrono::{DateTime, Utc};

use crate::storage::entities::{Category, SubjectId};

/// A tracking session that hasn't been stopped yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub category: Category,
    pub started: DateTime<Utc>,
}

impl ActiveSession {
    /// Whole minutes elapsed since the start. Partial minutes are dropped and a clock that went
    /// backwards counts as no time at all.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        let minutes = (now - self.started).num_minutes();
        u32::try_from(minutes.max(0)).unwrap_or(u32::MAX)
    }
}

/// Open sessions, at most one per subject.
#[derive(Default)]
pub struct SessionTable {
    active: Mutex<HashMap<SubjectId, ActiveSession>>,
}

impl SessionTable {
    /// Opens a session and returns the one it displaced, which the caller has to finalize.
    pub fn begin(&self, subject: SubjectId, session: ActiveSession) -> Option<ActiveSession> {
        self.lock().insert(subject, session)
    }

    pub fn take(&self, subject: &SubjectId) -> Option<ActiveSession> {
        self.lock().remove(subject)
    }

    pub fn get(&self, subject: &SubjectId) -> Option<ActiveSession> {
        self.lock().get(subject).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SubjectId, ActiveSession>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
