//! Defaults for timers whose jobs carry no timezone of their own.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::timer::ScheduleOptions;
use crate::SchedulerError;

/// Timer factory settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA zone used when a job sets neither `timezone` nor `utc`.
    #[serde(default = "utc_name")]
    pub default_timezone: String,
}

fn utc_name() -> String {
    "UTC".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_timezone: utc_name(),
        }
    }
}

impl SchedulerConfig {
    /// The default zone, parsed.
    ///
    /// # Errors
    ///
    /// `SchedulerError::InvalidTimezone` for an unknown zone name.
    pub fn parse_timezone(&self) -> Result<Tz, SchedulerError> {
        parse_timezone(&self.default_timezone)
    }
}

/// Parse an IANA timezone name such as `"Europe/Paris"`.
pub fn parse_timezone(name: &str) -> Result<Tz, SchedulerError> {
    name.parse::<Tz>()
        .map_err(|_| SchedulerError::InvalidTimezone(name.to_string()))
}

/// Zone a job's schedule is evaluated in: `utc` wins, then the job's own
/// timezone, then `fallback`.
pub(crate) fn zone_for(options: &ScheduleOptions, fallback: Tz) -> Result<Tz, SchedulerError> {
    if options.utc {
        return Ok(Tz::UTC);
    }
    options
        .timezone
        .as_deref()
        .map_or(Ok(fallback), parse_timezone)
}
