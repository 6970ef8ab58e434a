//! Engine configuration: the canonical business timezone and slot grid.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::day::DstPolicy;
use crate::error::ValidationError;

/// Default spacing of slot start times, independent of slot duration.
pub const DEFAULT_SLOT_STEP_MINUTES: u32 = 15;

/// Settings shared by the resolver, the slot generator and the mutation API.
///
/// Deserializes from `{ "business_timezone": "Europe/London",
/// "slot_step_minutes": 15, "dst_policy": "skip" }`; every field is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile", into = "ConfigFile")]
pub struct EngineConfig {
    /// Every absolute instant is reduced to time-of-day in this zone.
    pub business_timezone: Tz,
    pub slot_step_minutes: u32,
    pub dst_policy: DstPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            business_timezone: Tz::UTC,
            slot_step_minutes: DEFAULT_SLOT_STEP_MINUTES,
            dst_policy: DstPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Default settings in the named IANA timezone.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidTimezone` if `name` is not a known zone.
    pub fn from_timezone_name(name: &str) -> Result<Self, ValidationError> {
        Ok(Self::default().with_timezone(parse_timezone(name)?))
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.business_timezone = tz;
        self
    }

    pub fn with_slot_step(mut self, minutes: u32) -> Self {
        self.slot_step_minutes = minutes;
        self
    }

    pub fn with_dst_policy(mut self, policy: DstPolicy) -> Self {
        self.dst_policy = policy;
        self
    }
}

/// Parse an IANA timezone name such as `"America/New_York"`.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

/// On-disk shape of [`EngineConfig`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    business_timezone: Option<String>,
    slot_step_minutes: Option<u32>,
    dst_policy: Option<DstPolicy>,
}

impl TryFrom<ConfigFile> for EngineConfig {
    type Error = ValidationError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let mut config = Self::default();
        if let Some(name) = file.business_timezone {
            config.business_timezone = parse_timezone(&name)?;
        }
        if let Some(step) = file.slot_step_minutes {
            if step == 0 {
                return Err(ValidationError::InvalidDuration(step));
            }
            config.slot_step_minutes = step;
        }
        if let Some(policy) = file.dst_policy {
            config.dst_policy = policy;
        }
        Ok(config)
    }
}

impl From<EngineConfig> for ConfigFile {
    fn from(config: EngineConfig) -> Self {
        Self {
            business_timezone: Some(config.business_timezone.name().to_string()),
            slot_step_minutes: Some(config.slot_step_minutes),
            dst_policy: Some(config.dst_policy),
        }
    }
}
