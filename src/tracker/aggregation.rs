use std::{collections::BTreeMap, fmt::Display};

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

use crate::{
    storage::entities::{Category, TimeEntry},
    utils::time::{day_label, day_range, trailing_start, week_bounds},
};

/// Minutes of a single day, split by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub day_label: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub minutes: CategoryTotals,
}

impl DailyTotals {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            day_label: day_label(date),
            date,
            minutes: CategoryTotals::default(),
        }
    }
}

/// Per-category minutes. `total` only changes through [CategoryTotals::add], so it always equals
/// the sum of the categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    applications: u32,
    interviews: u32,
    resume_building: u32,
    training: u32,
    total: u32,
}

impl CategoryTotals {
    pub fn add(&mut self, category: Category, minutes: u32) {
        let slot = match category {
            Category::Applications => &mut self.applications,
            Category::Interviews => &mut self.interviews,
            Category::ResumeBuilding => &mut self.resume_building,
            Category::Training => &mut self.training,
        };
        *slot = slot.saturating_add(minutes);
        self.total = self.total.saturating_add(minutes);
    }

    pub fn get(&self, category: Category) -> u32 {
        match category {
            Category::Applications => self.applications,
            Category::Interviews => self.interviews,
            Category::ResumeBuilding => self.resume_building,
            Category::Training => self.training,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

/// Named windows for day-by-day series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowPolicy {
    /// Seven days ending today.
    #[value(name = "trailing-7")]
    Trailing7,
    /// Monday to Sunday of the current week, including days that haven't happened yet.
    #[value(name = "current-week")]
    CurrentWeek,
}

impl WindowPolicy {
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            WindowPolicy::Trailing7 => (trailing_start(today, 7), today),
            WindowPolicy::CurrentWeek => week_bounds(today),
        }
    }
}

impl Display for WindowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowPolicy::Trailing7 => write!(f, "trailing-7"),
            WindowPolicy::CurrentWeek => write!(f, "current-week"),
        }
    }
}

/// Periods for totals. Week and month are trailing windows, not calendar ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Period {
    Today,
    Week,
    Month,
}

impl Period {
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days = match self {
            Period::Today => 1,
            Period::Week => 7,
            Period::Month => 30,
        };
        (trailing_start(today, days), today)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Today => write!(f, "today"),
            Period::Week => write!(f, "week"),
            Period::Month => write!(f, "month"),
        }
    }
}

/// Builds one record per day between start and end (inclusive), oldest first. Days without
/// entries are present with zeros.
pub fn daily_series(entries: &[TimeEntry], start: NaiveDate, end: NaiveDate) -> Vec<DailyTotals> {
    let mut days = day_range(start, end)
        .map(|date| (date, DailyTotals::empty(date)))
        .collect::<BTreeMap<_, _>>();

    for entry in entries {
        if let Some(day) = days.get_mut(&entry.date) {
            day.minutes.add(entry.category, entry.minutes);
        }
    }

    days.into_values().collect()
}

/// Sums entries between start and end (inclusive) by category.
pub fn category_totals(entries: &[TimeEntry], start: NaiveDate, end: NaiveDate) -> CategoryTotals {
    entries
        .iter()
        .filter(|v| v.within(start, end))
        .fold(CategoryTotals::default(), |mut totals, entry| {
            totals.add(entry.category, entry.minutes);
            totals
        })
}
