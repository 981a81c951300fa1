use chrono::{Duration, NaiveDate, Weekday};

/// Returns dates between start (inclusive) and end (inclusive).
pub fn day_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Returns first day of a window of `days` days that ends with `last` (inclusive).
pub fn trailing_start(last: NaiveDate, days: u32) -> NaiveDate {
    last - Duration::days(i64::from(days.saturating_sub(1)))
}

/// Monday and Sunday of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week = date.week(Weekday::Mon);
    (week.first_day(), week.last_day())
}

/// Three letter english weekday name, like `Mon`.
pub fn day_label(date: NaiveDate) -> String {
    date.format("%a").to_string()
}
