use chrono::{DateTime, NaiveDate, Utc};

use crate::storage::entities::{Category, SubjectId, TimeEntry};

/// Adds minutes to the bucket of `date` and `category`, creating the bucket when it doesn't exist
/// yet. Returns the bucket total after the increment.
pub fn add_minutes(
    entries: &mut Vec<TimeEntry>,
    subject: &SubjectId,
    date: NaiveDate,
    category: Category,
    minutes: u32,
    now: DateTime<Utc>,
) -> u32 {
    match entries.iter_mut().find(|v| v.is_bucket(date, category)) {
        Some(entry) => {
            entry.minutes = entry.minutes.saturating_add(minutes);
            entry.last_updated = now;
            entry.minutes
        }
        None => {
            entries.push(TimeEntry {
                subject_id: subject.clone(),
                date,
                category,
                minutes,
                last_updated: now,
            });
            minutes
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::storage::entities::{Category, SubjectId};

    use super::add_minutes;

    #[test]
    fn test_increments_merge_into_one_bucket() {
        let subject = SubjectId::new("alice").unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 7, 4, 9, 0, 0).unwrap();
        let mut entries = vec![];

        assert_eq!(add_minutes(&mut entries, &subject, date, Category::Training, 30, now), 30);
        let later = now + Duration::minutes(20);
        assert_eq!(add_minutes(&mut entries, &subject, date, Category::Training, 15, later), 45);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].minutes, 45);
        assert_eq!(entries[0].last_updated, later);
    }

    #[test]
    fn test_different_keys_get_own_buckets() {
        let subject = SubjectId::new("alice").unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 7, 4, 9, 0, 0).unwrap();
        let mut entries = vec![];

        add_minutes(&mut entries, &subject, date, Category::Training, 1, now);
        add_minutes(&mut entries, &subject, date, Category::Interviews, 2, now);
        add_minutes(&mut entries, &subject, date.succ_opt().unwrap(), Category::Training, 3, now);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().map(|v| v.minutes).sum::<u32>(), 6);
    }

    #[test]
    fn test_bucket_saturates() {
        let subject = SubjectId::new("alice").unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let now = Utc.with_ymd_and_hms(2018, 7, 4, 9, 0, 0).unwrap();
        let mut entries = vec![];

        add_minutes(&mut entries, &subject, date, Category::Training, u32::MAX - 1, now);
        assert_eq!(
            add_minutes(&mut entries, &subject, date, Category::Training, 5, now),
            u32::MAX
        );
    }
}
