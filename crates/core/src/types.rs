use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Crypto amounts, principals and rates.
pub type Amount = rust_decimal::Decimal;

/// Fractional digits shown for crypto amounts (satoshi precision).
pub const AMOUNT_SCALE: u32 = 8;

/// Seconds in one accrual day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Milliseconds in one accrual day.
pub const MILLIS_PER_DAY: i64 = SECONDS_PER_DAY * 1_000;

/// Opaque server-side identifier of a mining session.
///
/// The backend emits integer row ids, other deployments emit strings;
/// both are accepted and normalised to their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) if text.trim().is_empty() => {
                Err(de::Error::custom("session_id must not be empty"))
            }
            RawId::Text(text) => Ok(Self(text)),
            RawId::Signed(n) => Ok(Self(n.to_string())),
            RawId::Unsigned(n) => Ok(Self(n.to_string())),
        }
    }
}
