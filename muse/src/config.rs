//! Muse configuration

use crate::error::{MuseError, Result};
use crate::pool::DayPart;
use chrono::NaiveDate;
use regex::Regex;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuseConfig {
    /// Rotation and tick settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Hour boundaries of the time-of-day buckets
    #[serde(default)]
    pub day_parts: DayPartHours,

    /// Clock settings
    #[serde(default)]
    pub clock: ClockConfig,

    /// Where content comes from besides this file
    #[serde(default)]
    pub source: SourceConfig,

    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Content pool keyed by bucket, weather category or date pattern
    #[serde(default)]
    pub compliments: ContentConfig,
}

impl Default for MuseConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            day_parts: DayPartHours::default(),
            clock: ClockConfig::default(),
            source: SourceConfig::default(),
            daemon: DaemonConfig::default(),
            compliments: ContentConfig::default(),
        }
    }
}

/// Rotation schedule configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Time between ticks in milliseconds
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,

    /// Transition duration handed to the renderer
    #[serde(default = "default_fade_speed")]
    pub fade_speed_ms: u64,

    /// Size of the daily rotation window
    #[serde(default = "default_max_items_per_day")]
    pub max_items_per_day: usize,

    /// Random instead of sequential rotation
    #[serde(default)]
    pub random: bool,

    /// Override for date-pattern matching (`YYYY-MM-DD`)
    #[serde(default)]
    pub mock_date: Option<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval(),
            fade_speed_ms: default_fade_speed(),
            max_items_per_day: default_max_items_per_day(),
            random: false,
            mock_date: None,
        }
    }
}

/// Hour boundaries for the morning and afternoon buckets
///
/// Anything outside both ranges is evening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPartHours {
    #[serde(default = "default_morning_start")]
    pub morning_start: u32,
    #[serde(default = "default_morning_end")]
    pub morning_end: u32,
    #[serde(default = "default_afternoon_start")]
    pub afternoon_start: u32,
    #[serde(default = "default_afternoon_end")]
    pub afternoon_end: u32,
}

impl Default for DayPartHours {
    fn default() -> Self {
        Self {
            morning_start: default_morning_start(),
            morning_end: default_morning_end(),
            afternoon_start: default_afternoon_start(),
            afternoon_end: default_afternoon_end(),
        }
    }
}

impl DayPartHours {
    pub fn is_morning(&self, hour: u32) -> bool {
        hour >= self.morning_start && hour < self.morning_end
    }

    pub fn is_afternoon(&self, hour: u32) -> bool {
        hour >= self.afternoon_start && hour < self.afternoon_end
    }
}

/// Clock configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClockConfig {
    /// IANA timezone (e.g., "Europe/Oslo"); host local time when unset
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Content source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path or http(s) URL of a JSON content document
    #[serde(default)]
    pub remote_file: Option<String>,
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Socket path for IPC
    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    /// Rotation cursor file
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            state_path: default_state_path(),
            log_level: default_log_level(),
        }
    }
}

// Default value functions
fn default_update_interval() -> u64 {
    60_000 * 60 // one hour
}

fn default_fade_speed() -> u64 {
    1000
}

fn default_max_items_per_day() -> usize {
    5
}

fn default_morning_start() -> u32 {
    3
}

fn default_morning_end() -> u32 {
    12
}

fn default_afternoon_start() -> u32 {
    12
}

fn default_afternoon_end() -> u32 {
    17
}

fn default_socket_path() -> String {
    "/run/muse/muse.sock".to_string()
}

fn default_state_path() -> String {
    "/var/lib/muse/state.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_anytime() -> Vec<String> {
    [
        "Hello there!",
        "Have a great day!",
        "You look nice today!",
        "Take a deep breath.",
        "Keep going!",
        "Something good is coming.",
        "Stay curious.",
        "You've got this.",
        "Smile, it suits you.",
        "Make today count.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl MuseConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| MuseError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.schedule.update_interval_ms == 0 {
            return Err(MuseError::InvalidConfig(
                "update_interval_ms must be positive".into(),
            ));
        }
        if self.schedule.max_items_per_day == 0 {
            return Err(MuseError::InvalidConfig(
                "max_items_per_day must be at least 1".into(),
            ));
        }
        if let Some(date) = &self.schedule.mock_date {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                MuseError::InvalidConfig(format!("mock_date {:?} is not YYYY-MM-DD", date))
            })?;
        }

        let hours = &self.day_parts;
        for (name, hour) in [
            ("morning_start", hours.morning_start),
            ("morning_end", hours.morning_end),
            ("afternoon_start", hours.afternoon_start),
            ("afternoon_end", hours.afternoon_end),
        ] {
            if hour > 23 {
                return Err(MuseError::InvalidConfig(format!(
                    "{} must be an hour between 0 and 23, got {}",
                    name, hour
                )));
            }
        }

        if let Some(tz) = &self.clock.timezone {
            tz.parse::<chrono_tz::Tz>()
                .map_err(|_| MuseError::InvalidConfig(format!("Invalid timezone: {}", tz)))?;
        }

        Ok(())
    }
}

/// A non-reserved content key: a weather category, a date pattern, or both
#[derive(Debug, Clone)]
pub struct KeyedContent {
    pub key: String,
    pub pattern: Regex,
    pub items: Vec<String>,
}

/// Content pool, classified once at load time
///
/// The reserved keys `morning`, `afternoon`, `evening` and `anytime` become
/// buckets. Every other key is kept in document order with its compiled
/// pattern, so it can be looked up as a category and tested against the date.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    morning: Vec<String>,
    afternoon: Vec<String>,
    evening: Vec<String>,
    anytime: Vec<String>,
    keyed: Vec<KeyedContent>,
}

const RESERVED_KEYS: [&str; 4] = ["morning", "afternoon", "evening", "anytime"];

impl ContentConfig {
    /// Build from `(key, items)` pairs in document order
    ///
    /// A repeated key replaces the earlier items.
    pub fn from_entries<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let mut content = Self::empty();

        for (key, items) in entries {
            let key = key.into();
            match key.as_str() {
                "morning" => content.morning = items,
                "afternoon" => content.afternoon = items,
                "evening" => content.evening = items,
                "anytime" => content.anytime = items,
                _ => {
                    if let Some(existing) = content.keyed.iter_mut().find(|k| k.key == key) {
                        existing.items = items;
                        continue;
                    }
                    let pattern = Regex::new(&key).map_err(|source| MuseError::InvalidPattern {
                        key: key.clone(),
                        source,
                    })?;
                    content.keyed.push(KeyedContent {
                        key,
                        pattern,
                        items,
                    });
                }
            }
        }

        Ok(content)
    }

    /// A table with no items at all
    pub fn empty() -> Self {
        Self {
            morning: Vec::new(),
            afternoon: Vec::new(),
            evening: Vec::new(),
            anytime: Vec::new(),
            keyed: Vec::new(),
        }
    }

    /// Parse a JSON content document
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MuseError::RemoteParse(e.to_string()))
    }

    /// Items of a time-of-day bucket
    pub fn bucket(&self, part: DayPart) -> &[String] {
        match part {
            DayPart::Morning => &self.morning,
            DayPart::Afternoon => &self.afternoon,
            DayPart::Evening => &self.evening,
        }
    }

    pub fn anytime(&self) -> &[String] {
        &self.anytime
    }

    /// Items stored under an exact category key
    pub fn category(&self, category: &str) -> Option<&[String]> {
        self.keyed
            .iter()
            .find(|k| k.key == category)
            .map(|k| k.items.as_slice())
    }

    /// Items of every key whose pattern matches `date`, in document order
    pub fn matching_dates<'a>(&'a self, date: &str) -> Vec<&'a [String]> {
        self.keyed
            .iter()
            .filter(|k| k.pattern.is_match(date))
            .map(|k| k.items.as_slice())
            .collect()
    }

    /// Non-reserved keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keyed.iter().map(|k| k.key.as_str())
    }

    /// Total items across all keys
    pub fn item_count(&self) -> usize {
        self.morning.len()
            + self.afternoon.len()
            + self.evening.len()
            + self.anytime.len()
            + self.keyed.iter().map(|k| k.items.len()).sum::<usize>()
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            anytime: default_anytime(),
            ..Self::empty()
        }
    }
}

impl Serialize for ContentConfig {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (key, items) in RESERVED_KEYS.iter().zip([
            &self.morning,
            &self.afternoon,
            &self.evening,
            &self.anytime,
        ]) {
            if !items.is_empty() || *key == "anytime" {
                map.serialize_entry(key, items)?;
            }
        }
        for keyed in &self.keyed {
            map.serialize_entry(&keyed.key, &keyed.items)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ContentConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ContentVisitor;

        impl<'de> Visitor<'de> for ContentVisitor {
            type Value = ContentConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table mapping content keys to lists of strings")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, items)) = map.next_entry::<String, Vec<String>>()? {
                    entries.push((key, items));
                }
                ContentConfig::from_entries(entries).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(ContentVisitor)
    }
}
