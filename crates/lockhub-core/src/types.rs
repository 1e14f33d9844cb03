//! Core identifier and tag types.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Unique command identifier (`cmd_` followed by hex).
pub type CommandId = String;

/// Device identifier (`doorlock_<site>_<number>`).
pub type DeviceId = String;

/// Sync-session identifier, generated by the device per check-in.
pub type SessionId = String;

/// Physical site a device is installed at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Otista,
    Kemayoran,
}

impl Location {
    /// Get the location tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Otista => "otista",
            Location::Kemayoran => "kemayoran",
        }
    }

    /// Parse a location tag.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "otista" => Some(Location::Otista),
            "kemayoran" => Some(Location::Kemayoran),
            _ => None,
        }
    }

    /// Display name used when auto-creating a device record.
    pub fn display_name(&self) -> String {
        let tag = self.as_str();
        let mut chars = tag.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        format!("{} Doorlock", capitalized)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Location::parse(s).ok_or_else(|| Error::Validation(format!("unknown location: {}", s)))
    }
}

/// Validate a device identifier against the `doorlock_<site>_<number>` shape.
///
/// The site segment is lowercase ASCII letters, the trailing segment digits;
/// both must be non-empty.
pub fn validate_device_id(device_id: &str) -> Result<(), Error> {
    let invalid = || Error::Validation(format!("invalid device id: {}", device_id));

    let rest = device_id.strip_prefix("doorlock_").ok_or_else(invalid)?;
    let (site, number) = rest.split_once('_').ok_or_else(invalid)?;

    if site.is_empty() || !site.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(invalid());
    }
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    Ok(())
}
