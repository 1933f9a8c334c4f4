/// Date-range and ratio helpers for dashboard endpoints
///
/// Dashboard queries take optional `startDate`/`endDate` query parameters.
/// A missing bound falls back to the edge of the current year, and given
/// bounds are widened to whole days.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use tenantry_shared::dashboard::{percentage, start_and_end_date};
///
/// let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
/// let range = start_and_end_date(None, None, today);
///
/// assert_eq!(range.start_date.to_rfc3339(), "2024-01-01T00:00:00+00:00");
/// assert_eq!(percentage(1, 3), 33.33);
/// ```

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Inclusive range used to filter `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start_date <= instant && instant <= self.end_date
    }
}

/// Body of a dashboard response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: i64,
    pub count: i64,
    pub percent: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl DashboardSummary {
    pub fn new(total: i64, count: i64, range: DateRange) -> Self {
        Self {
            total,
            count,
            percent: percentage(count, total),
            start_date: range.start_date,
            end_date: range.end_date,
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Resolves optional bounds against `today`
///
/// - start: given → start of that day, missing → January 1st of `today`'s year
/// - end: given → end of that day, missing → December 31st of `today`'s year
pub fn start_and_end_date(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> DateRange {
    let year = today.year();

    let start_day = start.unwrap_or_else(|| NaiveDate::from_yo_opt(year, 1).unwrap_or(today));
    let end_day = end.unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(today));

    DateRange {
        start_date: start_of_day(start_day),
        end_date: end_of_day(end_day),
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last).and_utc()
}

/// `value / total * 100` rounded to two decimals; zero when `total` is zero
pub fn percentage(value: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let ratio = value as f64 / total as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}
