use std::{fmt::Display, str::FromStr, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// The closed set of activities whose time is measured.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Applications,
    Interviews,
    ResumeBuilding,
    Training,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Applications,
        Category::Interviews,
        Category::ResumeBuilding,
        Category::Training,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Applications => "applications",
            Category::Interviews => "interviews",
            Category::ResumeBuilding => "resumeBuilding",
            Category::Training => "training",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Category {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| TrackerError::InvalidCategory(s.to_string()))
    }
}

/// Identifier of the person whose activity is tracked. It doubles as a file name for
/// [FileEntryStorage](super::entry_storage::FileEntryStorage), so only a conservative set of
/// characters is accepted.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(Arc<str>);

impl SubjectId {
    pub fn new(value: impl AsRef<str>) -> Result<Self, TrackerError> {
        let value = value.as_ref();
        let invalid = |reason| TrackerError::InvalidSubject {
            subject: value.to_string(),
            reason,
        };
        if value.is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if value.starts_with('.') {
            return Err(invalid("identifier can't start with a dot"));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        {
            return Err(invalid("only ascii letters, digits and -_.@ are allowed"));
        }
        Ok(Self(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubjectId::new(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubjectId::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0.to_string()
    }
}

/// One aggregation bucket: minutes a subject spent on a category during a calendar day.
/// A subject never has two entries with the same `date` and `category`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub category: Category,
    pub minutes: u32,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_updated: DateTime<Utc>,
}

impl TimeEntry {
    pub fn is_bucket(&self, date: NaiveDate, category: Category) -> bool {
        self.date == date && self.category == category
    }

    /// Whether the entry falls into the inclusive range of days.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.date && self.date <= end
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::error::TrackerError;

    use super::{Category, SubjectId, TimeEntry};

    #[test]
    fn test_category_parsing_is_strict() {
        assert_eq!(
            "resumeBuilding".parse::<Category>().unwrap(),
            Category::ResumeBuilding
        );
        for name in ["Training", "resume-building", "", "sleeping"] {
            assert!(matches!(
                name.parse::<Category>(),
                Err(TrackerError::InvalidCategory(v)) if v == name
            ));
        }
    }

    #[test]
    fn test_subject_validation() {
        assert!(SubjectId::new("student-42@college.edu").is_ok());
        for value in ["", ".hidden", "../etc", "a/b", "a b"] {
            assert!(SubjectId::new(value).is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn test_entry_serialization_format() -> Result<()> {
        let entry = TimeEntry {
            subject_id: SubjectId::new("alice")?,
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            category: Category::ResumeBuilding,
            minutes: 25,
            last_updated: Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&entry)?;
        assert_eq!(
            json,
            serde_json::json!({
                "subjectId": "alice",
                "date": "2025-03-14",
                "category": "resumeBuilding",
                "minutes": 25,
                "lastUpdated": 1741946400,
            })
        );
        assert_eq!(serde_json::from_value::<TimeEntry>(json)?, entry);
        Ok(())
    }

    #[test]
    fn test_entry_with_bad_subject_is_rejected() {
        let json = r#"{"subjectId":"../x","date":"2025-03-14","category":"training","minutes":1,"lastUpdated":0}"#;
        assert!(serde_json::from_str::<TimeEntry>(json).is_err());
    }
}
