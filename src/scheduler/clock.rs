//! Exchange trading hours

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::errors::{Result, TradingError};

/// Minutes since local midnight
///
/// Deserializes from an `"HH:MM"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinuteOfDay(u32);

impl MinuteOfDay {
    pub const MAX: u32 = 24 * 60;

    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour >= 24 || minute >= 60 {
            return Err(TradingError::Configuration(format!(
                "invalid time of day {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Wraps values past midnight
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes % Self::MAX)
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }
}

impl std::str::FromStr for MinuteOfDay {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| TradingError::Configuration(format!("expected HH:MM, got {:?}", s)))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| TradingError::Configuration(format!("bad time {:?}: {}", s, e)))
        };
        Self::new(parse(hour)?, parse(minute)?)
    }
}

impl TryFrom<String> for MinuteOfDay {
    type Error = TradingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MinuteOfDay> for String {
    fn from(value: MinuteOfDay) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Daily session bounds, `[open, close)` in exchange-local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingWindow {
    pub open: MinuteOfDay,
    pub close: MinuteOfDay,
}

impl TradingWindow {
    pub fn new(open: MinuteOfDay, close: MinuteOfDay) -> Result<Self> {
        if open >= close {
            return Err(TradingError::Configuration(format!(
                "trading window opens at {} but closes at {}",
                open, close
            )));
        }
        Ok(Self { open, close })
    }

    pub fn contains(&self, minute: u32) -> bool {
        minute >= self.open.minutes() && minute < self.close.minutes()
    }
}

/// Exchange-local calendar position of an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
}

impl LocalTime {
    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn is_weekday(&self) -> bool {
        !matches!(self.weekday, Weekday::Sat | Weekday::Sun)
    }
}

/// Decides whether the exchange is open at a given instant
#[derive(Debug, Clone)]
pub struct MarketClock {
    timezone: Tz,
    window: TradingWindow,
}

impl MarketClock {
    pub fn new(timezone: Tz, window: TradingWindow) -> Self {
        Self { timezone, window }
    }

    /// Build a clock from an IANA zone name, falling back to UTC if the name is unknown
    pub fn from_zone_name(name: &str, window: TradingWindow) -> Self {
        let timezone = name.parse::<Tz>().unwrap_or_else(|e| {
            warn!("Unknown exchange time zone {:?} ({}), using UTC", name, e);
            Tz::UTC
        });
        Self::new(timezone, window)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn window(&self) -> TradingWindow {
        self.window
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> LocalTime {
        let local = now.with_timezone(&self.timezone);
        LocalTime {
            weekday: local.weekday(),
            hour: local.hour(),
            minute: local.minute(),
        }
    }

    /// Monday to Friday, inside the configured window
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = self.local_time(now);
        local.is_weekday() && self.window.contains(local.minute_of_day())
    }
}
