use crate::utils::error::{AllocError, Result};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The day a batch of bikes is collected. One allocation run happens per recovery date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecoveryDate(NaiveDate);

impl RecoveryDate {
    /// Parses the strict `YYYY-MM-DD` form.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || AllocError::InvalidRecoveryDate {
            value: value.to_string(),
        };

        // chrono accepts unpadded fields, so the length check keeps the format strict
        if value.len() != 10 {
            return Err(invalid());
        }
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Self)
            .map_err(|_| invalid())
    }

    /// Midnight at the start of the day before the recovery.
    pub fn submission_deadline(&self) -> NaiveDateTime {
        let day_before = self.0.checked_sub_days(Days::new(1)).unwrap_or(self.0);
        day_before.and_time(NaiveTime::MIN)
    }

    pub fn is_submission_open(&self, now: NaiveDateTime) -> bool {
        now <= self.submission_deadline()
    }

    pub fn is_deadline_past(&self, now: NaiveDateTime) -> bool {
        !self.is_submission_open(now)
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.0 < today
    }
}

impl fmt::Display for RecoveryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for RecoveryDate {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecoveryDate {
    type Error = AllocError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RecoveryDate> for String {
    fn from(value: RecoveryDate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_strict_format() {
        assert!(RecoveryDate::parse("2026-10-21").is_ok());
        assert!(RecoveryDate::parse("2026-2-1").is_err());
        assert!(RecoveryDate::parse("21/10/2026").is_err());
        assert!(RecoveryDate::parse("2026-02-30").is_err());
        assert!(RecoveryDate::parse("").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let date = RecoveryDate::parse("2026-03-04").unwrap();
        assert_eq!(date.to_string(), "2026-03-04");
        assert_eq!(date, "2026-03-04".parse().unwrap());
    }

    #[test]
    fn test_submission_deadline_is_midnight_of_day_before() {
        let date = RecoveryDate::parse("2026-10-21").unwrap();
        assert_eq!(date.submission_deadline(), at("2026-10-20", "00:00:00"));

        assert!(date.is_submission_open(at("2026-10-19", "23:59:59")));
        assert!(date.is_submission_open(at("2026-10-20", "00:00:00")));
        assert!(!date.is_submission_open(at("2026-10-20", "00:00:01")));
        assert!(date.is_deadline_past(at("2026-10-21", "09:00:00")));
    }

    #[test]
    fn test_is_past() {
        let date = RecoveryDate::parse("2026-10-21").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
        assert!(!date.is_past(today));
        assert!(date.is_past(today.succ_opt().unwrap()));
    }

    #[test]
    fn test_serde_as_string() {
        let date = RecoveryDate::parse("2026-10-21").unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2026-10-21\"");
        let back: RecoveryDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
        assert!(serde_json::from_str::<RecoveryDate>("\"tomorrow\"").is_err());
    }
}
