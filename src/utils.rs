use chrono::{Datelike, Duration, NaiveDate};

use crate::error::AppError;

pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{value}', expected YYYY-MM-DD")))
}

/// Monday and Sunday of the ISO week containing `day`.
pub fn iso_week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_bounds_midweek() {
        assert_eq!(
            iso_week_bounds(date(2025, 6, 20)),
            (date(2025, 6, 16), date(2025, 6, 22))
        );
    }

    #[test]
    fn sunday_belongs_to_previous_monday() {
        assert_eq!(
            iso_week_bounds(date(2025, 6, 22)),
            (date(2025, 6, 16), date(2025, 6, 22))
        );
        assert_eq!(
            iso_week_bounds(date(2025, 6, 16)),
            (date(2025, 6, 16), date(2025, 6, 22))
        );
    }

    #[test]
    fn week_crossing_year_end() {
        assert_eq!(
            iso_week_bounds(date(2025, 1, 1)),
            (date(2024, 12, 30), date(2025, 1, 5))
        );
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(parse_date("2025-06-20").is_ok());
        assert!(parse_date("20/06/2025").is_err());
        assert!(parse_date("2025-02-30").is_err());
    }
}
