use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::filters::ValueRange;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar ranges offered as one-click date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    LastMonth,
    LastQuarter,
    LastYear,
    MonthToToday,
    QuarterToToday,
    YearToToday,
}

impl DatePreset {
    /// The range relative to `today`. `None` only at the edges of chrono's calendar.
    pub fn range(&self, today: NaiveDate) -> Option<ValueRange> {
        let (start, end) = match self {
            DatePreset::LastMonth => {
                let start = first_of_month(today)?.checked_sub_months(Months::new(1))?;
                (start, end_of_period(start, 1)?)
            }
            DatePreset::LastQuarter => {
                let start = first_of_quarter(today)?.checked_sub_months(Months::new(3))?;
                (start, end_of_period(start, 3)?)
            }
            DatePreset::LastYear => {
                let start = NaiveDate::from_ymd_opt(today.year() - 1, 1, 1)?;
                (start, end_of_period(start, 12)?)
            }
            DatePreset::MonthToToday => (trailing_start(today, 1)?, today),
            DatePreset::QuarterToToday => (trailing_start(today, 3)?, today),
            DatePreset::YearToToday => (trailing_start(today, 12)?, today),
        };
        Some(ValueRange::new(
            &start.format(DATE_FORMAT).to_string(),
            &end.format(DATE_FORMAT).to_string(),
        ))
    }
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
}

fn first_of_quarter(date: NaiveDate) -> Option<NaiveDate> {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1)
}

/// The last day of the period of `months` months starting at `start`.
fn end_of_period(start: NaiveDate, months: u32) -> Option<NaiveDate> {
    start.checked_add_months(Months::new(months))?.pred_opt()
}

/// The day after the same date `months` months ago.
fn trailing_start(today: NaiveDate, months: u32) -> Option<NaiveDate> {
    today.checked_sub_months(Months::new(months))?.succ_opt()
}

/// Common shift patterns offered as one-click time filters. Night shifts wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePreset {
    NineToFive,
    SevenToSevenDay,
    SevenToSevenNight,
    GraveyardShift,
}

impl TimePreset {
    pub fn range(&self) -> ValueRange {
        let (start, end) = match self {
            TimePreset::NineToFive => ("09:00:00", "17:00:00"),
            TimePreset::SevenToSevenDay => ("07:00:00", "19:00:00"),
            TimePreset::SevenToSevenNight => ("19:00:00", "07:00:00"),
            TimePreset::GraveyardShift => ("22:00:00", "06:00:00"),
        };
        ValueRange::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bounds(range: ValueRange) -> (String, String) {
        (range.start.unwrap(), range.end.unwrap())
    }

    #[test]
    fn last_month_spans_the_whole_previous_month() {
        let range = DatePreset::LastMonth.range(day(2024, 3, 31)).unwrap();
        assert_eq!(bounds(range), ("2024-02-01".into(), "2024-02-29".into()));
        let range = DatePreset::LastMonth.range(day(2024, 1, 15)).unwrap();
        assert_eq!(bounds(range), ("2023-12-01".into(), "2023-12-31".into()));
    }

    #[test]
    fn last_quarter_and_year() {
        let range = DatePreset::LastQuarter.range(day(2024, 5, 10)).unwrap();
        assert_eq!(bounds(range), ("2024-01-01".into(), "2024-03-31".into()));
        let range = DatePreset::LastQuarter.range(day(2024, 2, 10)).unwrap();
        assert_eq!(bounds(range), ("2023-10-01".into(), "2023-12-31".into()));
        let range = DatePreset::LastYear.range(day(2024, 5, 10)).unwrap();
        assert_eq!(bounds(range), ("2023-01-01".into(), "2023-12-31".into()));
    }

    #[test]
    fn trailing_ranges_end_today() {
        let range = DatePreset::MonthToToday.range(day(2024, 5, 10)).unwrap();
        assert_eq!(bounds(range), ("2024-04-11".into(), "2024-05-10".into()));
        let range = DatePreset::YearToToday.range(day(2024, 5, 10)).unwrap();
        assert_eq!(bounds(range), ("2023-05-11".into(), "2024-05-10".into()));
    }

    #[test]
    fn night_shifts_wrap() {
        let range = TimePreset::GraveyardShift.range();
        assert!(range.start() > range.end());
    }
}
