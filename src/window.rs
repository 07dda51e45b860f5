use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// One per-year lookup window: `[start, end)` covering the same calendar
/// day as the reference date, in the configured timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearWindow {
    pub year: i32,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Windows for every elapsed year back to `start_year` inclusive, most
/// recent first. Pure and restartable; yields nothing when `start_year`
/// is not in the past.
pub fn year_windows(
    today: NaiveDate,
    start_year: i32,
    tz: Tz,
) -> impl Iterator<Item = YearWindow> {
    let current = today.year();
    (1..=current.saturating_sub(start_year)).map(move |i| {
        let year = current - i;
        let start = local_midnight(same_day_in_year(today, year), tz);
        YearWindow {
            year,
            start,
            end: start + Duration::days(1),
        }
    })
}

/// Substitutes `year` into `date`. Feb 29 has no counterpart in a common
/// year; it maps to the next valid day (Mar 1), which is where
/// `with_year` draws the line.
pub fn same_day_in_year(date: NaiveDate, year: i32) -> NaiveDate {
    date.with_year(year)
        .or_else(|| date.succ_opt().and_then(|next| next.with_year(year)))
        .unwrap_or(date)
}

/// A DST gap can remove local midnight entirely; the day then starts at
/// the first hour that exists.
fn local_midnight(day: NaiveDate, tz: Tz) -> DateTime<Tz> {
    (0..24)
        .find_map(|h| {
            let t = day.and_time(NaiveTime::MIN) + Duration::hours(h);
            tz.from_local_datetime(&t).earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
}
