use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset of the hospital's wall clock from UTC, in hours.
const KYIV_UTC_OFFSET_HOURS: i64 = 2;

/// Current wall-clock time in Kyiv. Stored timestamps use this clock.
pub fn kyiv_now() -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(KYIV_UTC_OFFSET_HOURS)
}

pub fn kyiv_today() -> NaiveDate {
    kyiv_now().date()
}

/// A calendar month, written `YYYY-MM` in query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::containing(kyiv_today())
    }

    /// Parses `YYYY-MM`.
    pub fn parse(input: &str) -> Option<Self> {
        let (year, month) = input.trim().split_once('-')?;
        if year.len() != 4 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    /// Parses `YYYY-MM`, falling back to the current month.
    pub fn parse_or_current(input: Option<&str>) -> Self {
        input.and_then(Self::parse).unwrap_or_else(Self::current)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    /// The whole month as an inclusive range.
    pub fn range(&self) -> DateRange {
        DateRange {
            from: self.first_day(),
            to: self.last_day(),
        }
    }

    /// `MM-YYYY`, used in export file names.
    pub fn file_label(&self) -> String {
        format!("{:02}-{}", self.month, self.year)
    }

    /// Month name and year in Ukrainian, e.g. `Березень 2025`.
    pub fn display_name(&self) -> String {
        const NAMES: [&str; 12] = [
            "Січень", "Лютий", "Березень", "Квітень", "Травень", "Червень",
            "Липень", "Серпень", "Вересень", "Жовтень", "Листопад", "Грудень",
        ];
        format!("{} {}", NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// `None` when `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        if from <= to { Some(Self { from, to }) } else { None }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    /// `DD-MM-YYYY_DD-MM-YYYY`, used in export file names.
    pub fn file_label(&self) -> String {
        format!(
            "{}_{}",
            self.from.format("%d-%m-%Y"),
            self.to.format("%d-%m-%Y")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_month() {
        let period = MonthPeriod::parse("2024-03").unwrap();
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 3);
        assert_eq!(period.to_string(), "2024-03");

        assert_eq!(MonthPeriod::parse("2024-13"), None);
        assert_eq!(MonthPeriod::parse("24-03"), None);
        assert_eq!(MonthPeriod::parse("march"), None);
    }

    #[test]
    fn test_invalid_month_falls_back_to_current() {
        assert_eq!(MonthPeriod::parse_or_current(Some("bogus")), MonthPeriod::current());
        assert_eq!(MonthPeriod::parse_or_current(None), MonthPeriod::current());
    }

    #[test]
    fn test_december_rollover() {
        let december = MonthPeriod::new(2024, 12).unwrap();
        assert_eq!(december.next(), MonthPeriod::new(2025, 1).unwrap());
        assert_eq!(december.last_day(), date(2024, 12, 31));
        assert_eq!(MonthPeriod::new(2025, 1).unwrap().prev(), december);
    }

    #[test]
    fn test_month_range() {
        let february = MonthPeriod::new(2024, 2).unwrap().range();
        assert_eq!(february.from, date(2024, 2, 1));
        assert_eq!(february.to, date(2024, 2, 29));
        assert!(february.contains(date(2024, 2, 29)));
        assert!(!february.contains(date(2024, 3, 1)));
    }

    #[test]
    fn test_labels() {
        let period = MonthPeriod::new(2025, 3).unwrap();
        assert_eq!(period.file_label(), "03-2025");
        assert_eq!(period.display_name(), "Березень 2025");

        let range = DateRange::new(date(2025, 1, 5), date(2025, 2, 10)).unwrap();
        assert_eq!(range.file_label(), "05-01-2025_10-02-2025");
        assert!(DateRange::new(date(2025, 2, 10), date(2025, 1, 5)).is_none());
    }
}
