//! Clock and calendar capability
//!
//! Everything time-dependent reads "now" through [`Clock`], so tests can pin
//! or advance time.

use crate::error::{MuseError, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current time with its UTC offset
    fn now(&self) -> DateTime<FixedOffset>;

    /// Ordinal day of the year (1-based)
    fn day_of_year(&self) -> u32 {
        self.now().ordinal()
    }

    fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// Milliseconds since the Unix epoch
    fn epoch_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Current date as `YYYY-MM-DD`
    fn date_string(&self) -> String {
        self.now().format("%Y-%m-%d").to_string()
    }
}

/// System clock in the host zone or a configured IANA zone
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock for a named zone (e.g., "America/New_York")
    pub fn with_timezone(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| MuseError::InvalidConfig(format!("Invalid timezone: {}", name)))?;
        Ok(Self { timezone: Some(tz) })
    }

    /// Clock for an optional zone name, falling back to local time
    pub fn from_config(name: Option<&str>) -> Result<Self> {
        match name {
            Some(name) => Self::with_timezone(name),
            None => Ok(Self::new()),
        }
    }

    pub fn timezone_name(&self) -> &str {
        self.timezone.as_ref().map(|tz| tz.name()).unwrap_or("local")
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match &self.timezone {
            Some(tz) => Utc::now().with_timezone(tz).fixed_offset(),
            None => Local::now().fixed_offset(),
        }
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// UTC clock at the given epoch milliseconds
    pub fn at_millis(millis: i64) -> Self {
        let now = DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or_default()
            .fixed_offset();
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.lock();
        *now += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.lock()
    }
}
