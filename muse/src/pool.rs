//! Content pool resolution
//!
//! Builds the candidate pool for a moment: the time-of-day bucket, the
//! current category, the `anytime` items and every date pattern that matches
//! the active date, concatenated in that order.

use crate::config::{ContentConfig, DayPartHours};
use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Time-of-day bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    /// Part of the day an hour falls in; morning wins where ranges overlap
    pub fn from_hour(hour: u32, hours: &DayPartHours) -> Self {
        if hours.is_morning(hour) {
            DayPart::Morning
        } else if hours.is_afternoon(hour) {
            DayPart::Afternoon
        } else {
            DayPart::Evening
        }
    }

    /// Bucket that contributes at `hour`
    ///
    /// Morning and afternoon apply only inside their hours and only when the
    /// table has items for them; otherwise selection falls through to
    /// evening. `None` when no time bucket has anything to offer.
    pub fn select(hour: u32, hours: &DayPartHours, content: &ContentConfig) -> Option<Self> {
        let has = |part: DayPart| !content.bucket(part).is_empty();

        if hours.is_morning(hour) && has(DayPart::Morning) {
            Some(DayPart::Morning)
        } else if hours.is_afternoon(hour) && has(DayPart::Afternoon) {
            Some(DayPart::Afternoon)
        } else if has(DayPart::Evening) {
            Some(DayPart::Evening)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Evening => "evening",
        }
    }
}

/// Resolves the effective content pool
#[derive(Debug, Clone)]
pub struct PoolResolver {
    hours: DayPartHours,
    mock_date: Option<String>,
}

impl PoolResolver {
    pub fn new(hours: DayPartHours, mock_date: Option<String>) -> Self {
        Self { hours, mock_date }
    }

    pub fn day_part(&self, now: &DateTime<FixedOffset>) -> DayPart {
        DayPart::from_hour(now.hour(), &self.hours)
    }

    /// Date string the patterns are tested against
    pub fn active_date(&self, now: &DateTime<FixedOffset>) -> String {
        match &self.mock_date {
            Some(date) => date.clone(),
            None => now.format("%Y-%m-%d").to_string(),
        }
    }

    /// Build the pool for `now`
    ///
    /// Duplicates are kept. The result is empty only when nothing in the
    /// content table applies.
    pub fn resolve<'a>(
        &self,
        now: &DateTime<FixedOffset>,
        content: &'a ContentConfig,
        category: Option<&str>,
    ) -> Vec<&'a str> {
        let part = DayPart::select(now.hour(), &self.hours, content);
        let date = self.active_date(now);

        let mut pool: Vec<&'a str> = part
            .map(|p| content.bucket(p).iter().map(String::as_str).collect())
            .unwrap_or_default();

        if let Some(items) = category
            .filter(|c| !c.is_empty())
            .and_then(|c| content.category(c))
        {
            pool.extend(items.iter().map(String::as_str));
        }

        pool.extend(content.anytime().iter().map(String::as_str));

        for items in content.matching_dates(&date) {
            pool.extend(items.iter().map(String::as_str));
        }

        debug!(
            "Resolved pool of {} items ({}, category={:?}, date={})",
            pool.len(),
            part.map_or("no bucket", |p| p.name()),
            category,
            date
        );

        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 14, hour, 30, 0)
            .unwrap()
    }

    fn content() -> ContentConfig {
        ContentConfig::from_json_str(
            r#"{
                "morning": ["m1", "m2"],
                "afternoon": ["a1"],
                "evening": ["e1"],
                "anytime": ["any"],
                "rain": ["wet"],
                "....-03-14": ["pi day"],
                "2024-..-..": ["this year"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_day_part_boundaries() {
        let hours = DayPartHours::default();
        assert_eq!(DayPart::from_hour(2, &hours), DayPart::Evening);
        assert_eq!(DayPart::from_hour(3, &hours), DayPart::Morning);
        assert_eq!(DayPart::from_hour(11, &hours), DayPart::Morning);
        assert_eq!(DayPart::from_hour(12, &hours), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(16, &hours), DayPart::Afternoon);
        assert_eq!(DayPart::from_hour(17, &hours), DayPart::Evening);
        assert_eq!(DayPart::from_hour(23, &hours), DayPart::Evening);
    }

    #[test]
    fn test_morning_excludes_other_parts() {
        let resolver = PoolResolver::new(DayPartHours::default(), Some("1999-12-31".into()));
        let content = content();
        let pool = resolver.resolve(&at(10), &content, None);
        assert_eq!(pool, vec!["m1", "m2", "any"]);
    }

    #[test]
    fn test_full_concatenation_order() {
        let resolver = PoolResolver::new(DayPartHours::default(), None);
        let content = content();
        let pool = resolver.resolve(&at(18), &content, Some("rain"));
        assert_eq!(pool, vec!["e1", "wet", "any", "pi day", "this year"]);
    }

    #[test]
    fn test_mock_date_overrides_clock() {
        let resolver = PoolResolver::new(DayPartHours::default(), Some("2024-01-01".into()));
        let content = ContentConfig::from_entries([
            ("anytime", vec!["any".to_string()]),
            (r"\d{4}-01-01", vec!["happy new year".to_string()]),
        ])
        .unwrap();
        for hour in [1, 10, 14, 20] {
            let pool = resolver.resolve(&at(hour), &content, None);
            assert!(pool.contains(&"happy new year"));
        }
    }

    #[test]
    fn test_unknown_or_empty_category_contributes_nothing() {
        let resolver = PoolResolver::new(DayPartHours::default(), Some("1999-12-31".into()));
        let content = content();
        assert_eq!(resolver.resolve(&at(13), &content, Some("")), vec!["a1", "any"]);
        assert_eq!(resolver.resolve(&at(13), &content, Some("snow")), vec!["a1", "any"]);
    }

    #[test]
    fn test_missing_morning_falls_through_to_evening() {
        let resolver = PoolResolver::new(DayPartHours::default(), Some("1999-12-31".into()));
        let content = ContentConfig::from_json_str(r#"{"evening": ["e"], "anytime": ["a"]}"#).unwrap();
        assert_eq!(resolver.resolve(&at(10), &content, None), vec!["e", "a"]);
    }

    #[test]
    fn test_missing_morning_falls_through_to_afternoon() {
        let hours = DayPartHours {
            afternoon_start: 8,
            afternoon_end: 17,
            ..DayPartHours::default()
        };
        let resolver = PoolResolver::new(hours, Some("1999-12-31".into()));
        let content = ContentConfig::from_json_str(
            r#"{"afternoon": ["p"], "evening": ["e"], "anytime": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(resolver.resolve(&at(10), &content, None), vec!["p", "a"]);
    }

    #[test]
    fn test_missing_afternoon_falls_through_to_evening() {
        let resolver = PoolResolver::new(DayPartHours::default(), Some("1999-12-31".into()));
        let content = ContentConfig::from_json_str(
            r#"{"morning": ["m"], "evening": ["e"], "anytime": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(resolver.resolve(&at(14), &content, None), vec!["e", "a"]);
    }

    #[test]
    fn test_no_time_buckets_contributes_nothing() {
        let resolver = PoolResolver::new(DayPartHours::default(), Some("1999-12-31".into()));
        let content = ContentConfig::from_json_str(r#"{"morning": [], "anytime": []}"#).unwrap();
        assert!(resolver.resolve(&at(9), &content, None).is_empty());
        assert_eq!(DayPart::select(9, &DayPartHours::default(), &content), None);
    }

    #[test]
    fn test_custom_hours() {
        let hours = DayPartHours {
            morning_start: 6,
            morning_end: 10,
            afternoon_start: 10,
            afternoon_end: 20,
        };
        assert_eq!(DayPart::from_hour(5, &hours), DayPart::Evening);
        assert_eq!(DayPart::from_hour(19, &hours), DayPart::Afternoon);
    }
}
