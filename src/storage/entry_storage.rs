use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use super::entities::{SubjectId, TimeEntry};

/// Change applied to a whole history by [EntryStorage::update_entries]. Returns whether the
/// history has to be written back.
pub type EntryUpdate = Box<dyn FnOnce(&mut Vec<TimeEntry>) -> bool + Send>;

/// Result of [EntryStorage::update_entries].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// History after the update.
    pub entries: Vec<TimeEntry>,
    pub written: bool,
}

/// Durable per-subject history of [TimeEntry] buckets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryStorage: Send + Sync {
    /// Returns every stored bucket of the subject. A subject without history has no entries.
    async fn load_entries(&self, subject: &SubjectId) -> Result<Vec<TimeEntry>>;

    /// Replaces the whole history of the subject.
    async fn save_entries(&self, subject: &SubjectId, entries: &[TimeEntry]) -> Result<()>;

    /// Loads, changes and stores the history as one step. Nobody else, including other
    /// processes sharing the storage, can touch the subject in between. Nothing is written when
    /// loading fails.
    async fn update_entries(
        &self,
        subject: &SubjectId,
        update: EntryUpdate,
    ) -> Result<UpdateOutcome>;
}

/// Keeps a JSON-lines file per subject inside `entry_dir`.
pub struct FileEntryStorage {
    entry_dir: PathBuf,
}

impl FileEntryStorage {
    pub fn new(entry_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&entry_dir)?;

        Ok(Self { entry_dir })
    }

    fn subject_path(&self, subject: &SubjectId) -> PathBuf {
        self.entry_dir.join(format!("{subject}.jsonl"))
    }

    /// Waits for the advisory lock on the blocking pool. Waiting on a runtime worker could starve
    /// the task that currently holds the lock.
    async fn lock(file: &File, exclusive: bool) -> std::result::Result<(), std::io::Error> {
        let handle = file.try_clone().await?.into_std().await;
        tokio::task::spawn_blocking(move || {
            if exclusive {
                fs4::fs_std::FileExt::lock_exclusive(&handle)
            } else {
                fs4::fs_std::FileExt::lock_shared(&handle)
            }
        })
        .await?
    }

    /// Parses one entry per line. Lines that aren't valid entries, including ones that aren't
    /// valid UTF-8, are skipped: a write interrupted by a crash leaves a partial line behind.
    async fn parse_entries(
        reader: impl AsyncBufRead + Unpin,
        path: &Path,
    ) -> std::result::Result<Vec<TimeEntry>, std::io::Error> {
        let mut lines = reader.split(b'\n');
        let mut entries = vec![];
        while let Some(line) = lines.next_segment().await? {
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<TimeEntry>(&line) {
                Ok(v) => entries.push(v),
                Err(e) => warn!(
                    "Skipping illegal entry in {path:?} {}: {e}",
                    String::from_utf8_lossy(&line)
                ),
            }
        }
        Ok(entries)
    }

    async fn read_entries(path: &Path) -> Result<Vec<TimeEntry>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<TimeEntry>, std::io::Error> {
            debug!("Extracting {path:?}");
            let mut file = File::open(path).await?;
            FileEntryStorage::lock(&file, false).await?;
            let result = FileEntryStorage::parse_entries(BufReader::new(&mut file), path).await;
            file.unlock_async().await?;
            result
        }

        match extract(path).await {
            Ok(entries) => Ok(entries),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
            Err(e) => Err(e)?,
        }
    }

    async fn rewrite(file: &mut File, entries: &[TimeEntry]) -> Result<()> {
        let mut buffer = Vec::<u8>::new();
        for entry in entries {
            serde_json::to_writer(&mut buffer, entry)?;
            buffer.push(b'\n');
        }

        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn open_for_writing(path: &Path) -> Result<File> {
        Ok(File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?)
    }

    async fn update_locked(
        file: &mut File,
        path: &Path,
        update: EntryUpdate,
    ) -> Result<UpdateOutcome> {
        let mut entries = Self::parse_entries(BufReader::new(&mut *file), path).await?;
        let written = update(&mut entries);
        if written {
            Self::rewrite(file, &entries).await?;
        }
        Ok(UpdateOutcome { entries, written })
    }
}

#[async_trait]
impl EntryStorage for FileEntryStorage {
    async fn load_entries(&self, subject: &SubjectId) -> Result<Vec<TimeEntry>> {
        Self::read_entries(&self.subject_path(subject)).await
    }

    async fn save_entries(&self, subject: &SubjectId, entries: &[TimeEntry]) -> Result<()> {
        let path = self.subject_path(subject);
        debug!("Writing {} entries into {path:?}", entries.len());
        let mut file = Self::open_for_writing(&path).await?;
        // Truncation happens under the lock so readers never see a half emptied file.
        Self::lock(&file, true).await?;
        let result = Self::rewrite(&mut file, entries).await;
        file.unlock_async().await?;
        result
    }

    async fn update_entries(
        &self,
        subject: &SubjectId,
        update: EntryUpdate,
    ) -> Result<UpdateOutcome> {
        let path = self.subject_path(subject);
        let mut file = Self::open_for_writing(&path).await?;
        // The lock spans read and rewrite, so concurrent writers can't lose each other's changes.
        Self::lock(&file, true).await?;
        let result = Self::update_locked(&mut file, &path, update).await;
        file.unlock_async().await?;
        if let Ok(outcome) = &result {
            debug!(
                "Updated {path:?}, {} entries, written {}",
                outcome.entries.len(),
                outcome.written
            );
        }
        result
    }
}

/// Keeps histories in process memory. Nothing survives the process.
#[derive(Default)]
pub struct MemoryEntryStorage {
    entries: Mutex<HashMap<SubjectId, Vec<TimeEntry>>>,
}

impl MemoryEntryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStorage for MemoryEntryStorage {
    async fn load_entries(&self, subject: &SubjectId) -> Result<Vec<TimeEntry>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(subject).cloned().unwrap_or_default())
    }

    async fn save_entries(&self, subject: &SubjectId, new_entries: &[TimeEntry]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(subject.clone(), new_entries.to_vec());
        Ok(())
    }

    async fn update_entries(
        &self,
        subject: &SubjectId,
        update: EntryUpdate,
    ) -> Result<UpdateOutcome> {
        let mut all = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = all.get(subject).cloned().unwrap_or_default();
        let written = update(&mut entries);
        if written {
            all.insert(subject.clone(), entries.clone());
        }
        Ok(UpdateOutcome { entries, written })
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Arc};

    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::storage::entities::{Category, SubjectId, TimeEntry};

    use super::{EntryStorage, FileEntryStorage, MemoryEntryStorage};

    fn entry(subject: &SubjectId, day: u32, category: Category, minutes: u32) -> TimeEntry {
        TimeEntry {
            subject_id: subject.clone(),
            date: NaiveDate::from_ymd_opt(2018, 7, day).unwrap(),
            category,
            minutes,
            last_updated: Utc.with_ymd_and_hms(2018, 7, day, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_file_storage_missing_subject_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileEntryStorage::new(dir.path().join("entries"))?;
        let entries = storage.load_entries(&SubjectId::new("nobody")?).await?;
        assert!(entries.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_storage_replaces_history() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileEntryStorage::new(dir.path().to_owned())?;
        let subject = SubjectId::new("alice")?;

        let first = vec![
            entry(&subject, 4, Category::Training, 30),
            entry(&subject, 4, Category::Interviews, 10),
            entry(&subject, 5, Category::Training, 5),
        ];
        storage.save_entries(&subject, &first).await?;
        assert_eq!(storage.load_entries(&subject).await?, first);

        // A shorter history must not leave stale lines behind.
        let second = vec![entry(&subject, 4, Category::Training, 45)];
        storage.save_entries(&subject, &second).await?;
        assert_eq!(storage.load_entries(&subject).await?, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_storage_subjects_are_isolated() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileEntryStorage::new(dir.path().to_owned())?;
        let alice = SubjectId::new("alice")?;
        let bob = SubjectId::new("bob")?;

        storage
            .save_entries(&alice, &[entry(&alice, 4, Category::Applications, 3)])
            .await?;

        assert_eq!(storage.load_entries(&alice).await?.len(), 1);
        assert!(storage.load_entries(&bob).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_file_storage_skips_corrupted_lines() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileEntryStorage::new(dir.path().to_owned())?;
        let subject = SubjectId::new("alice")?;
        let valid = entry(&subject, 4, Category::Training, 30);
        let other = entry(&subject, 5, Category::Interviews, 10);

        let mut file = std::fs::File::create(dir.path().join("alice.jsonl"))?;
        writeln!(file, "{}", serde_json::to_string(&valid)?)?;
        file.write_all(b"\xff\xfe garbage\n")?;
        writeln!(file, "{}", serde_json::to_string(&other)?)?;
        write!(file, "{{\"subjectId\":\"alice\",\"date\":\"2018-07-")?;
        drop(file);

        assert_eq!(storage.load_entries(&subject).await?, vec![valid, other]);

        // Updating keeps the readable entries and drops the broken lines.
        let outcome = storage
            .update_entries(
                &subject,
                Box::new(|entries: &mut Vec<TimeEntry>| {
                    entries[0].minutes += 15;
                    true
                }),
            )
            .await?;
        assert_eq!(outcome.entries[0].minutes, 45);
        assert_eq!(storage.load_entries(&subject).await?, outcome.entries);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_without_change_leaves_file_alone() -> Result<()> {
        let dir = tempdir()?;
        let storage = FileEntryStorage::new(dir.path().to_owned())?;
        let subject = SubjectId::new("alice")?;
        let stored = vec![entry(&subject, 4, Category::Training, 30)];
        storage.save_entries(&subject, &stored).await?;

        let outcome = storage
            .update_entries(
                &subject,
                Box::new(|entries: &mut Vec<TimeEntry>| {
                    entries.clear();
                    false
                }),
            )
            .await?;

        assert!(!outcome.written);
        assert_eq!(storage.load_entries(&subject).await?, stored);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_updates_from_separate_storages_are_not_lost() -> Result<()> {
        let dir = tempdir()?;
        let storages = [
            Arc::new(FileEntryStorage::new(dir.path().to_owned())?),
            Arc::new(FileEntryStorage::new(dir.path().to_owned())?),
        ];
        let subject = SubjectId::new("alice")?;

        let handles = (0..40)
            .map(|i| {
                let storage = storages[i % 2].clone();
                let subject = subject.clone();
                tokio::spawn(async move {
                    let template = entry(&subject, 4, Category::Training, 0);
                    storage
                        .update_entries(
                            &subject,
                            Box::new(move |entries: &mut Vec<TimeEntry>| {
                                match entries.first_mut() {
                                    Some(first) => first.minutes += 1,
                                    None => entries.push(TimeEntry {
                                        minutes: 1,
                                        ..template
                                    }),
                                }
                                true
                            }),
                        )
                        .await
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await??;
        }

        let entries = storages[0].load_entries(&subject).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].minutes, 40);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_storage_round_trip() -> Result<()> {
        let storage = MemoryEntryStorage::new();
        let subject = SubjectId::new("alice")?;
        assert!(storage.load_entries(&subject).await?.is_empty());

        let entries = vec![entry(&subject, 4, Category::Interviews, 12)];
        storage.save_entries(&subject, &entries).await?;
        assert_eq!(storage.load_entries(&subject).await?, entries);
        Ok(())
    }
}
