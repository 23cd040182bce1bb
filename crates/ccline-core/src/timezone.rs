//! Local timezone resolution
//!
//! Window arithmetic happens in UTC. The timezone only matters when a time of
//! day is shown to the user, e.g. the window reset time or a calendar event.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

use crate::error::{CclineError, Result};

/// Timezone used for displayed clock times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneConfig {
    pub tz: Tz,
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        let tz = get_local_timezone();
        Self {
            is_utc: tz == Tz::UTC,
            tz,
        }
    }
}

impl TimezoneConfig {
    /// Build from `--timezone` / `--utc`; `--utc` wins
    pub fn from_cli(timezone: Option<&str>, use_utc: bool) -> Result<Self> {
        if use_utc {
            return Ok(Self::utc());
        }
        match timezone {
            Some(name) => {
                let tz = Tz::from_str(name).map_err(|_| {
                    CclineError::InvalidTimezone(format!(
                        "'{}'. Use format like 'America/New_York', 'Asia/Tokyo', or 'UTC'",
                        name
                    ))
                })?;
                Ok(Self {
                    tz,
                    is_utc: tz == Tz::UTC,
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn utc() -> Self {
        Self {
            tz: Tz::UTC,
            is_utc: true,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }

    /// `HH:MM` in the configured zone
    pub fn clock_time(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%H:%M").to_string()
    }
}

/// Detect the local timezone: `TZ` first, then the OS setting, then UTC
pub fn get_local_timezone() -> Tz {
    if let Ok(name) = std::env::var("TZ")
        && let Ok(tz) = Tz::from_str(&name)
    {
        debug!("Using timezone from TZ environment variable: {}", name);
        return tz;
    }

    match iana_time_zone::get_timezone() {
        Ok(name) => Tz::from_str(&name).unwrap_or_else(|_| {
            debug!("Unknown system timezone '{}', falling back to UTC", name);
            Tz::UTC
        }),
        Err(e) => {
            debug!("Could not detect local timezone: {:?}, falling back to UTC", e);
            Tz::UTC
        }
    }
}
