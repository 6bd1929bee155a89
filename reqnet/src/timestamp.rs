//! Unix timestamps for signed request expiration dates.
//!
//! A signed request carries an expiration date after which the currency
//! contract refuses to broadcast it. The contract never stores that date, so a
//! retrieved request has none and it must be supplied again to recompute the
//! signing hash.

use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Seconds since the Unix epoch (1970-01-01T00:00:00Z).
///
/// Serialized as a plain JSON integer, which is what the payment gateway and
/// the contract's `uint256 _expirationDate` expect.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimestamp(u64);

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl From<u64> for UnixTimestamp {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl UnixTimestamp {
    /// Creates a new [`UnixTimestamp`] from a raw seconds value.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the current system time.
    ///
    /// A clock set before the epoch reads as the epoch itself.
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self(now)
    }

    /// Returns the timestamp as raw seconds since the Unix epoch.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Whether this timestamp is strictly after the current time.
    #[must_use]
    pub fn is_future(&self) -> bool {
        *self > Self::now()
    }
}
