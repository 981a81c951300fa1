use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::{
    storage::entities::{Category, SubjectId, TimeEntry},
    utils::time::{day_range, trailing_start},
};

/// Number of days a synthetic history spans, ending today.
pub const SEED_DAYS: u32 = 7;

/// Range of minutes drawn for each category of a synthetic day.
pub fn seed_range(category: Category) -> RangeInclusive<u32> {
    match category {
        Category::Applications => 20..=59,
        Category::Interviews => 15..=44,
        Category::ResumeBuilding => 10..=34,
        Category::Training => 5..=24,
    }
}

/// Creates a plausible looking history so that a new subject doesn't start with empty views.
pub fn synthetic_history(
    subject: &SubjectId,
    today: NaiveDate,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Vec<TimeEntry> {
    day_range(trailing_start(today, SEED_DAYS), today)
        .flat_map(|date| Category::ALL.into_iter().map(move |category| (date, category)))
        .map(|(date, category)| TimeEntry {
            subject_id: subject.clone(),
            date,
            category,
            minutes: rng.gen_range(seed_range(category)),
            last_updated: now,
        })
        .collect()
}
