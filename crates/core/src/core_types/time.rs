//! Calendar-to-elapsed-seconds conversion.
//!
//! All event times and layer time axes are seconds relative to one reference
//! origin per session: midnight, January 1st of the setup year. Converting a
//! calendar moment happens exactly once at domain setup; everything downstream
//! works in plain `f64` seconds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A calendar date plus seconds-of-day, as supplied by the caller at setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarMoment {
    pub year: i32,
    /// Month of year (1-12)
    pub month: u32,
    /// Day of month (1-31)
    pub day: u32,
    /// Seconds since midnight, may be fractional
    pub seconds_of_day: f64,
}

impl CalendarMoment {
    pub fn new(year: i32, month: u32, day: u32, seconds_of_day: f64) -> Self {
        Self {
            year,
            month,
            day,
            seconds_of_day,
        }
    }
}

/// Time origin of one session: midnight on January 1st of the reference year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTime {
    year: i32,
}

impl ReferenceTime {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Seconds elapsed from the reference origin to `moment`.
    ///
    /// Returns `None` for calendar moments that do not exist (e.g. Feb 30).
    pub fn elapsed_seconds(&self, moment: &CalendarMoment) -> Option<f64> {
        let origin = NaiveDate::from_ymd_opt(self.year, 1, 1)?;
        let date = NaiveDate::from_ymd_opt(moment.year, moment.month, moment.day)?;
        let days = date.signed_duration_since(origin).num_days() as f64;
        Some(days * 86_400.0 + moment.seconds_of_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_origin_is_zero() {
        let reference = ReferenceTime::new(2024);
        let t = reference
            .elapsed_seconds(&CalendarMoment::new(2024, 1, 1, 0.0))
            .unwrap();
        assert_relative_eq!(t, 0.0);
    }

    #[test]
    fn test_elapsed_within_year() {
        let reference = ReferenceTime::new(2024);
        // Feb 2nd, 12:00:00 = 32 days + 43200 s
        let t = reference
            .elapsed_seconds(&CalendarMoment::new(2024, 2, 2, 43_200.0))
            .unwrap();
        assert_relative_eq!(t, 32.0 * 86_400.0 + 43_200.0);
    }

    #[test]
    fn test_leap_day_counts() {
        let reference = ReferenceTime::new(2024);
        // 2024 is a leap year: March 1st is day 60
        let t = reference
            .elapsed_seconds(&CalendarMoment::new(2024, 3, 1, 0.0))
            .unwrap();
        assert_relative_eq!(t, 60.0 * 86_400.0);
    }

    #[test]
    fn test_invalid_date_rejected() {
        let reference = ReferenceTime::new(2024);
        assert!(reference
            .elapsed_seconds(&CalendarMoment::new(2024, 2, 30, 0.0))
            .is_none());
    }
}
