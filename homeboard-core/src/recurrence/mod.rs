//! Weekly recurring rules ("piano every Tuesday 4-5pm").

mod engine;
mod store;

pub use engine::{expand, expand_rules};
pub use store::RuleStore;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{HomeboardError, HomeboardResult};
use crate::timezone::parse_timezone;

pub const DEFAULT_RULE_CATEGORY: &str = "recurring";
pub const DEFAULT_RULE_TIMEZONE: &str = "America/Chicago";

fn default_category() -> Option<String> {
    Some(DEFAULT_RULE_CATEGORY.to_string())
}

fn default_timezone() -> String {
    DEFAULT_RULE_TIMEZONE.to_string()
}

/// A stored weekly rule: one weekday, one wall-clock time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Assigned by [`RuleStore::add`]; `None` until stored.
    #[serde(default)]
    pub id: Option<u32>,
    pub title: String,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_category")]
    pub category: Option<String>,
    /// First date the rule applies. `None` means since forever.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last date the rule applies. `None` means it recurs forever.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn new(
        title: impl Into<String>,
        day: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        RecurrenceRule {
            id: None,
            title: title.into(),
            day_of_week: day.num_days_from_monday() as u8,
            start_time,
            end_time,
            timezone: default_timezone(),
            location: None,
            category: default_category(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn weekday(&self) -> Option<Weekday> {
        Weekday::try_from(self.day_of_week).ok()
    }

    /// Checks applied when a rule is written. Expansion does not call this.
    pub fn validate(&self) -> HomeboardResult<()> {
        if self.title.trim().is_empty() {
            return Err(HomeboardError::InvalidRule("title is empty".into()));
        }
        if self.weekday().is_none() {
            return Err(HomeboardError::InvalidRule(format!(
                "day_of_week {} is not 0-6",
                self.day_of_week
            )));
        }
        if self.end_time <= self.start_time {
            return Err(HomeboardError::InvalidRule(format!(
                "end time {} is not after start time {}",
                self.end_time, self.start_time
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(HomeboardError::InvalidRule(format!(
                    "end date {end} is before start date {start}"
                )));
            }
        }
        parse_timezone(&self.timezone)
            .map_err(|_| HomeboardError::InvalidRule(format!("unknown timezone '{}'", self.timezone)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let rule: RecurrenceRule = serde_json::from_str(
            r#"{"title": "Piano", "day_of_week": 1, "start_time": "16:00:00", "end_time": "17:00:00"}"#,
        )
        .unwrap();
        assert_eq!(rule.id, None);
        assert_eq!(rule.timezone, DEFAULT_RULE_TIMEZONE);
        assert_eq!(rule.category.as_deref(), Some(DEFAULT_RULE_CATEGORY));
        assert_eq!(rule.weekday(), Some(Weekday::Tue));
    }

    #[test]
    fn test_validate_rejects_inverted_times() {
        let rule = RecurrenceRule::new("Swim", Weekday::Wed, hm(10, 0), hm(9, 0));
        assert!(matches!(rule.validate(), Err(HomeboardError::InvalidRule(_))));

        let zero = RecurrenceRule::new("Swim", Weekday::Wed, hm(10, 0), hm(10, 0));
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_dates() {
        let mut rule = RecurrenceRule::new("Swim", Weekday::Wed, hm(9, 0), hm(10, 0));
        rule.start_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        rule.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(rule.validate().is_err());

        rule.end_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_weekday_and_timezone() {
        let mut rule = RecurrenceRule::new("Swim", Weekday::Wed, hm(9, 0), hm(10, 0));
        rule.day_of_week = 7;
        assert!(rule.validate().is_err());

        rule.day_of_week = 2;
        rule.timezone = "Atlantis/Deep".into();
        assert!(rule.validate().is_err());
    }
}
