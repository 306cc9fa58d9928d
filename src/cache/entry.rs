//! Cache Entry Module
//!
//! Defines the on-disk envelope (value plus expiry) and its JSON codec.

use chrono::{DateTime, Duration, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// == Ttl ==
/// Lifetime requested for an entry at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Whole seconds from now; zero or negative means already expired
    Seconds(i64),
    /// Arbitrary signed duration from now
    Duration(Duration),
}

impl Ttl {
    /// Computes the absolute expiry instant relative to `now`.
    ///
    /// Saturates at the representable range instead of overflowing.
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let delta = match *self {
            Ttl::Seconds(secs) => Duration::try_seconds(secs),
            Ttl::Duration(d) => Some(d),
        };
        let negative = match *self {
            Ttl::Seconds(secs) => secs < 0,
            Ttl::Duration(d) => d < Duration::zero(),
        };

        delta
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(if negative {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::Seconds(secs)
    }
}

impl From<u64> for Ttl {
    fn from(secs: u64) -> Self {
        Ttl::Seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::Duration(d)
    }
}

impl From<std::time::Duration> for Ttl {
    fn from(d: std::time::Duration) -> Self {
        Duration::from_std(d)
            .map(Ttl::Duration)
            .unwrap_or(Ttl::Seconds(i64::MAX))
    }
}

// == Decode Error ==
/// Entry bytes are malformed, truncated or missing a required field.
#[derive(Error, Debug)]
#[error("Corrupt cache entry: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

// == Envelope ==
/// The persisted unit: one per entry file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<V> {
    /// The stored value
    pub value: V,
    /// Write timestamp (Unix milliseconds on disk)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp (Unix milliseconds on disk), None = no expiration
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl<V> Envelope<V> {
    // == Constructor ==
    /// Wraps a value with an expiry computed from the optional TTL.
    pub fn new(value: V, ttl: Option<Ttl>) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| ttl.expires_at(now)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Same as [`Envelope::is_expired`] against a fixed instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if no expiration is set.
    ///
    /// Returns a zero duration once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            let remaining = expires.signed_duration_since(Utc::now());
            remaining.max(Duration::zero())
        })
    }
}

impl<V: Serialize> Envelope<V> {
    // == Encode ==
    /// Serializes the envelope into the bytes written to disk.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// An envelope whose value has not yet been converted to the caller's type.
pub type RawEnvelope = Envelope<Value>;

impl RawEnvelope {
    // == Decode ==
    /// Parses entry bytes without knowing the caller's value type.
    ///
    /// Truncation, trailing garbage, a non-object document and missing
    /// `value`/`expires_at` fields all fail.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let document: Value = serde_json::from_slice(bytes)?;
        if !document.is_object() {
            return Err(DecodeError(de::Error::custom(
                "cache entry is not a JSON object",
            )));
        }
        Ok(serde_json::from_value(document)?)
    }

    /// Converts the untyped value into the caller's type.
    pub fn into_value<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(self.value)
    }
}
