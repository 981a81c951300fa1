//!  Storage is organized through [entry_storage::EntryStorage].
//!  The basic idea is:
//!   - Every subject owns a separate history, read and written as a whole.
//!   - A history is a list of [entities::TimeEntry] buckets, one per day and category.
//!   - [entry_storage::FileEntryStorage] keeps a history as a JSON-lines file per subject.

pub mod entities;
pub mod entry_storage;
