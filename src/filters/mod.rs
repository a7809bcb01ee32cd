use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::errors::ServiceError;

/// Query parameters accepted by the route list endpoint. All filters are
/// optional and compose with AND.
#[derive(Debug, Default, Deserialize)]
pub struct RouteFilter {
    pub source: Option<String>,
    pub destination: Option<String>,
}

/// Query parameters accepted by the trip list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TripFilter {
    pub date: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
}

impl TripFilter {
    /// Parses the `date` filter into the half-open UTC window covering that
    /// calendar day. `None` when the filter is absent.
    pub fn departure_window(
        &self,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ServiceError> {
        let raw = match &self.date {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ServiceError::validation(
                "date",
                "Invalid date format. Please use the format YYYY-MM-DD.",
            )
        })?;

        let start = day.and_time(NaiveTime::MIN).and_utc();
        Ok(Some((start, start + Duration::days(1))))
    }
}

/// Escapes LIKE wildcards and wraps the needle for a case-insensitive
/// substring match.
pub fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_date_yields_no_window() {
        let filter = TripFilter::default();
        assert!(filter.departure_window().unwrap().is_none());
    }

    #[test]
    fn malformed_date_is_rejected_with_expected_format() {
        for raw in ["10-01-2025", "2025/01/10", "2025-1-10", "not a date"] {
            let filter = TripFilter {
                date: Some(raw.to_string()),
                ..TripFilter::default()
            };
            match filter.departure_window() {
                Err(ServiceError::Validation { field, message }) => {
                    assert_eq!(field, "date");
                    assert!(message.contains("YYYY-MM-DD"));
                }
                other => panic!("expected validation error for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn window_covers_exactly_one_calendar_day() {
        let filter = TripFilter {
            date: Some("2025-01-10".to_string()),
            ..TripFilter::default()
        };
        let (start, end) = filter.departure_window().unwrap().unwrap();

        let departing = "2025-01-10T11:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(departing >= start && departing < end);

        let next_month = "2025-02-01T11:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(!(next_month >= start && next_month < end));

        let midnight_after = "2025-01-11T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(!(midnight_after < end));
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Station A"), "%Station A%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
    }
}
