//! Statistics primitives shared by every report
//!
//! All ratios here return `0.0` for a zero denominator so no report can
//! ever carry `NaN` or an infinity.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `numerator / denominator`, `0.0` when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// `part / whole * 100`, `0.0` when `whole` is zero
pub fn percent(part: f64, whole: f64) -> f64 {
    ratio(part, whole) * 100.0
}

pub fn percent_of(part: usize, whole: usize) -> f64 {
    percent(part as f64, whole as f64)
}

/// Period-over-period change in percent, `0.0` when `previous` is zero
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

/// Arithmetic mean, `0.0` for an empty input
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    ratio(sum, count as f64)
}

/// Fractional days from `from` to `to`
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 86_400.0
}

/// Whether `timestamp` lies more than `days` days before `now`
pub fn older_than(timestamp: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> bool {
    now - timestamp > Duration::days(days)
}

/// Which earlier window a report compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonBasis {
    /// The window of equal length immediately before
    #[default]
    PreviousPeriod,
    /// The same window one year earlier
    PreviousYear,
}

impl FromStr for ComparisonBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "previous_period" | "previous" | "period" => Ok(Self::PreviousPeriod),
            "previous_year" | "year" => Ok(Self::PreviousYear),
            other => Err(format!(
                "compareWith must be previous_period or previous_year, got '{other}'"
            )),
        }
    }
}

impl fmt::Display for ComparisonBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreviousPeriod => f.write_str("previous_period"),
            Self::PreviousYear => f.write_str("previous_year"),
        }
    }
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// The `days` days ending at `now`, `None` when the start falls outside
    /// the representable date range
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Option<Self> {
        let start = now.checked_sub_signed(Duration::days(i64::from(days)))?;
        Some(Self { start, end: now })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Window of equal length ending where this one starts
    pub fn preceding(&self) -> Option<Self> {
        let length = self.end - self.start;
        Some(Self {
            start: self.start.checked_sub_signed(length)?,
            end: self.start,
        })
    }

    /// Same window shifted back 365 days
    pub fn year_earlier(&self) -> Option<Self> {
        let shift = Duration::days(365);
        Some(Self {
            start: self.start.checked_sub_signed(shift)?,
            end: self.end.checked_sub_signed(shift)?,
        })
    }

    pub fn comparison(&self, basis: ComparisonBasis) -> Option<Self> {
        match basis {
            ComparisonBasis::PreviousPeriod => self.preceding(),
            ComparisonBasis::PreviousYear => self.year_earlier(),
        }
    }
}

/// Calendar month as a closed range `[start, end]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRange {
    /// `YYYY-MM`
    pub month: String,
    pub start: DateTime<Utc>,
    /// Last millisecond of the month
    pub end: DateTime<Utc>,
}

impl MonthRange {
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// The month containing `now` and the `count - 1` months before it,
/// oldest first
pub fn trailing_months(now: DateTime<Utc>, count: u32) -> Vec<MonthRange> {
    let (mut year, mut month) = (now.year(), now.month());
    let mut months = Vec::with_capacity(count as usize);

    for _ in 0..count {
        months.push(month_range(year, month));
        if month == 1 {
            year -= 1;
            month = 12;
        } else {
            month -= 1;
        }
    }

    months.reverse();
    months
}

fn month_range(year: i32, month: u32) -> MonthRange {
    let first = first_instant(year, month);
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = first_instant(next_year, next_month) - Duration::milliseconds(1);

    MonthRange {
        month: format!("{year:04}-{month:02}"),
        start: first,
        end,
    }
}

fn first_instant(year: i32, month: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_zero_denominators() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(percent_of(0, 0), 0.0);
        assert_eq!(percent_change(10.0, 0.0), 0.0);
        assert_eq!(mean(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_percentages() {
        assert_eq!(percent_of(2, 4), 50.0);
        assert_eq!(percent_change(150.0, 100.0), 50.0);
        assert_eq!(percent_change(50.0, 100.0), -50.0);
        assert_eq!(mean([1.0, 2.0, 6.0]), 3.0);
    }

    #[test]
    fn test_window_is_half_open() {
        let now = at(2026, 3, 31);
        let window = ReportWindow::trailing_days(now, 30).unwrap();
        assert!(window.contains(window.start));
        assert!(!window.contains(now));
        assert!(window.contains(now - Duration::seconds(1)));

        let previous = window.preceding().unwrap();
        assert_eq!(previous.end, window.start);
        assert_eq!(previous.end - previous.start, Duration::days(30));
        assert!(!previous.contains(window.start));
    }

    #[test]
    fn test_year_earlier_comparison() {
        let window = ReportWindow::trailing_days(at(2026, 3, 31), 7).unwrap();
        let year = window.comparison(ComparisonBasis::PreviousYear).unwrap();
        assert_eq!(window.start - year.start, Duration::days(365));
    }

    #[test]
    fn test_windows_past_the_date_range_are_none() {
        assert!(ReportWindow::trailing_days(at(2026, 3, 31), u32::MAX).is_none());

        // fits, but the window before it does not
        let early = DateTime::<Utc>::MIN_UTC + Duration::days(10);
        let window = ReportWindow::trailing_days(early, 8).unwrap();
        assert!(window.preceding().is_none());
        assert!(window.comparison(ComparisonBasis::PreviousYear).is_none());
    }

    #[test]
    fn test_comparison_basis_parsing() {
        assert_eq!(
            "previous_year".parse::<ComparisonBasis>(),
            Ok(ComparisonBasis::PreviousYear)
        );
        assert_eq!(
            "previous_period".parse::<ComparisonBasis>(),
            Ok(ComparisonBasis::PreviousPeriod)
        );
        assert!("fortnight".parse::<ComparisonBasis>().is_err());
    }

    #[test]
    fn test_older_than() {
        let now = at(2026, 3, 31);
        assert!(older_than(now - Duration::days(31), now, 30));
        assert!(!older_than(now - Duration::days(30), now, 30));
    }

    #[test]
    fn test_trailing_months_cross_year() {
        let months = trailing_months(at(2026, 2, 15), 6);
        let labels: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(
            labels,
            vec!["2025-09", "2025-10", "2025-11", "2025-12", "2026-01", "2026-02"]
        );

        let feb = &months[5];
        assert_eq!(feb.start, Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        assert!(feb.contains(Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap()));
        assert!(!feb.contains(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()));
    }
}
