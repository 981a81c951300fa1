use std::fmt::Write;

use crate::{
    storage::entities::Category,
    tracker::aggregation::{CategoryTotals, DailyTotals},
};

pub fn format_minutes(minutes: u32) -> String {
    if minutes >= 60 {
        format!("{}h{}m", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}m")
    }
}

/// One line per day: label, date, every category and the total.
pub fn series_table(series: &[DailyTotals]) -> String {
    let mut table = String::from("day\tdate");
    for category in Category::ALL {
        let _ = write!(table, "\t{category}");
    }
    table.push_str("\ttotal\n");

    for day in series {
        let _ = write!(table, "{}\t{}", day.day_label, day.date);
        for category in Category::ALL {
            let _ = write!(table, "\t{}", format_minutes(day.minutes.get(category)));
        }
        let _ = writeln!(table, "\t{}", format_minutes(day.minutes.total()));
    }
    table
}

pub fn category_breakdown(totals: &CategoryTotals) -> String {
    let mut output = String::new();
    for category in Category::ALL {
        let _ = writeln!(output, "{category}\t{}", format_minutes(totals.get(category)));
    }
    let _ = writeln!(output, "total\t{}", format_minutes(totals.total()));
    output
}
