//! Object mapper between raw JSON and typed records.
//!
//! All records in this crate derive serde traits; this module adds the two
//! entry points the client uses and the scalar types whose wire form needs
//! care: exact decimals and server timestamps.

use crate::error::{MapError, MapResult};
use bigdecimal::BigDecimal;
use chrono::{NaiveDateTime, Timelike, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Converts raw JSON into a typed record.
pub fn structure<T: DeserializeOwned>(raw: Value) -> MapResult<T> {
    serde_json::from_value(raw).map_err(|e| MapError::Structure {
        target: std::any::type_name::<T>(),
        message: e.to_string(),
    })
}

/// Converts a typed record into raw JSON.
pub fn unstructure<T: Serialize>(value: &T) -> MapResult<Value> {
    serde_json::to_value(value).map_err(|e| MapError::Unstructure {
        source_type: std::any::type_name::<T>(),
        message: e.to_string(),
    })
}

/// An exact decimal amount, such as a bonus in dollars.
///
/// Accepted on input as a JSON number or a string. Always emitted as a JSON
/// number carrying exactly the stored digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(BigDecimal);

impl Money {
    /// Wraps a decimal value.
    pub fn new(value: BigDecimal) -> Self {
        Self(value)
    }

    /// Returns the underlying decimal.
    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_inner(self) -> BigDecimal {
        self.0
    }
}

impl FromStr for Money {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| MapError::invalid("decimal", s))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<BigDecimal> for Money {
    fn from(value: BigDecimal) -> Self {
        Self(value)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let number = serde_json::Number::from_str(&self.0.to_string())
            .map_err(<S::Error as serde::ser::Error>::custom)?;
        number.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n.to_string().parse().map_err(D::Error::custom),
            Value::String(s) => s.parse().map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a decimal number or string, got {other}"
            ))),
        }
    }
}

/// A naive UTC timestamp as exchanged with the server.
///
/// Parsing accepts 0 to 9 fractional digits and an optional `Z` or
/// `+HH:MM`/`-HH:MM` suffix (offsets are folded into UTC). Output is always
/// `YYYY-MM-DDTHH:MM:SS.ffffff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerTimestamp(NaiveDateTime);

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
// "YYYY-MM-DDTHH:MM:SS"
const SECONDS_LEN: usize = 19;

impl ServerTimestamp {
    /// Wraps a naive UTC date-time.
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value)
    }

    /// Returns the current UTC time truncated to microseconds.
    pub fn now() -> Self {
        let now = Utc::now().naive_utc();
        let micros = now.nanosecond() / 1_000 * 1_000;
        Self(now.with_nanosecond(micros).unwrap_or(now))
    }

    /// Returns the underlying naive date-time.
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Parses any accepted server form.
    pub fn parse(raw: &str) -> MapResult<Self> {
        let trimmed = raw.trim();
        if !trimmed.is_ascii() {
            return Err(MapError::invalid("timestamp", raw));
        }

        let (body, offset_secs) =
            split_offset(trimmed).ok_or_else(|| MapError::invalid("timestamp", raw))?;
        let (seconds, fraction) = match body.split_once('.') {
            Some((seconds, fraction)) => (seconds, Some(fraction)),
            None => (body, None),
        };

        let mut value = NaiveDateTime::parse_from_str(seconds, SECONDS_FORMAT)
            .map_err(|_| MapError::invalid("timestamp", raw))?;

        if let Some(fraction) = fraction {
            if fraction.is_empty()
                || fraction.len() > 9
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(MapError::invalid("timestamp", raw));
            }
            let nanos: u32 = format!("{fraction:0<9}")
                .parse()
                .map_err(|_| MapError::invalid("timestamp", raw))?;
            value = value
                .with_nanosecond(nanos)
                .ok_or_else(|| MapError::invalid("timestamp", raw))?;
        }

        if offset_secs != 0 {
            value = value
                .checked_sub_signed(chrono::Duration::seconds(offset_secs))
                .ok_or_else(|| MapError::invalid("timestamp", raw))?;
        }

        Ok(Self(value))
    }

    /// Renders the canonical microsecond form.
    pub fn to_canonical(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }
}

/// Splits a trailing `Z` or `±HH:MM` suffix off, returning the offset in seconds.
fn split_offset(raw: &str) -> Option<(&str, i64)> {
    if let Some(body) = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        return Some((body, 0));
    }
    if raw.len() <= SECONDS_LEN {
        return Some((raw, 0));
    }

    let tail_start = raw.len() - 6;
    let tail = &raw[tail_start..];
    let sign = match tail.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return Some((raw, 0)),
    };
    if tail.as_bytes()[3] != b':' {
        return None;
    }
    let hours: i64 = tail[1..3].parse().ok()?;
    let minutes: i64 = tail[4..6].parse().ok()?;
    Some((&raw[..tail_start], sign * (hours * 3600 + minutes * 60)))
}

impl FromStr for ServerTimestamp {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl From<NaiveDateTime> for ServerTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl Serialize for ServerTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for ServerTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}
