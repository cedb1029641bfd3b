//! # warden-types: Core types for `Warden`
//!
//! This crate contains shared types used across the `Warden` system:
//! - Identifiers ([`PrincipalId`], [`RecordKey`], [`CollectionName`])
//! - Temporal types ([`Timestamp`])
//!
//! Identifiers are validated at construction: they are trimmed, must be
//! non-empty and may not contain control characters. Once built they are
//! immutable, so every holder can rely on those properties.

use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers - Clone (small owned strings)
// ============================================================================

/// Maximum accepted identifier length, in bytes.
pub const MAX_ID_LENGTH: usize = 128;

/// Error returned when an identifier fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} is {len} bytes long, the limit is {MAX_ID_LENGTH}")]
    TooLong { kind: &'static str, len: usize },

    #[error("{kind} contains a control character")]
    ControlCharacter { kind: &'static str },
}

fn validate_id(kind: &'static str, raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if trimmed.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong {
            kind,
            len: trimmed.len(),
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(IdError::ControlCharacter { kind });
    }
    Ok(trimmed.to_string())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps an identifier.
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, IdError> {
                validate_id($kind, raw.as_ref()).map(Self)
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Unique identifier of a principal (a user, admin, or service actor).
    PrincipalId,
    "principal id"
);

string_id!(
    /// Unique key of a record within its owning collection.
    RecordKey,
    "record key"
);

string_id!(
    /// Name of a collection of records (e.g. `accounts`, `animals`).
    CollectionName,
    "collection name"
);

// ============================================================================
// Timestamp - Copy (8-byte value with monotonic guarantee)
// ============================================================================

/// Wall-clock timestamp with monotonic guarantee within a store.
///
/// Audit trails need real-world time; monotonicity keeps history entries
/// strictly ordered when the system clock is adjusted or two mutations land
/// in the same nanosecond.
///
/// Stored as nanoseconds since Unix epoch (1970-01-01 00:00:00 UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch (1970-01-01 00:00:00 UTC).
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from nanoseconds since Unix epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Returns the timestamp as nanoseconds since Unix epoch.
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch (truncates nanoseconds).
    pub fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Creates a timestamp for the current time.
    ///
    /// A clock set before the Unix epoch reads as [`Timestamp::EPOCH`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(Self::EPOCH, |d| Self(d.as_nanos() as u64))
    }

    /// Creates a timestamp ensuring monotonicity: `max(now, last + 1ns)`.
    ///
    /// # Arguments
    ///
    /// * `last` - The previous timestamp, if any. Pass `None` for the first timestamp.
    pub fn now_monotonic(last: Option<Timestamp>) -> Self {
        let now = Self::now();
        match last {
            Some(prev) if now.0 <= prev.0 => Timestamp(prev.0.saturating_add(1)),
            _ => now,
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display as seconds.nanoseconds for readability
        let secs = self.0 / 1_000_000_000;
        let nanos = self.0 % 1_000_000_000;
        write!(f, "{secs}.{nanos:09}")
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl From<u64> for Timestamp {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
