//! Protocol primitives passed between the façade and a directory engine.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timeout applied to searches when the caller does not supply one (milliseconds).
pub const DEFAULT_SEARCH_TIMEOUT_MS: u64 = 30_000;

/// LDAP protocol version negotiated for a session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ProtocolVersion {
    /// LDAPv2 (RFC 1777).
    V2,
    /// LDAPv3 (RFC 4511).
    #[default]
    V3,
}

impl ProtocolVersion {
    /// Numeric version as carried on the wire.
    #[must_use]
    pub const fn number(self) -> i32 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

impl TryFrom<i32> for ProtocolVersion {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(Error::invalid_parameter(format!(
                "unsupported LDAP version {other}"
            ))),
        }
    }
}

impl From<ProtocolVersion> for i32 {
    fn from(version: ProtocolVersion) -> Self {
        version.number()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LDAPv{}", self.number())
    }
}

/// How far a search traverses from its base entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

/// Search deadline split into whole seconds and remaining microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timeval {
    /// Whole seconds.
    pub seconds: u64,
    /// Remaining microseconds, always below one million.
    pub microseconds: u32,
}

impl Timeval {
    /// Splits a millisecond count into seconds and microseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        // Always below 1_000_000, fits in u32.
        #[allow(clippy::cast_possible_truncation)]
        let microseconds = ((millis % 1000) * 1000) as u32;
        Self {
            seconds: millis / 1000,
            microseconds,
        }
    }

    /// Converts back into a [`Duration`].
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.seconds)
            .saturating_add(Duration::from_micros(self.microseconds as u64))
    }
}

impl Default for Timeval {
    fn default() -> Self {
        Self::from_millis(DEFAULT_SEARCH_TIMEOUT_MS)
    }
}

impl From<Duration> for Timeval {
    fn from(duration: Duration) -> Self {
        Self {
            seconds: duration.as_secs(),
            microseconds: duration.subsec_micros(),
        }
    }
}
