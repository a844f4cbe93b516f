// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::Display;
use std::ops::Add;
use std::time::Duration;
#[cfg(not(any(test, feature = "test_utils")))]
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

#[cfg(any(test, feature = "test_utils"))]
use mock_instant::SystemTimeError;
#[cfg(any(test, feature = "test_utils"))]
use mock_instant::thread_local::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: u64 = 1_000_000;

/// Microseconds since the UNIX epoch based on system time.
///
/// Submission and comment instants are compared with this precision, two events recorded within
/// the same microsecond are considered equal.
#[derive(
    Copy, Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_micros(value: u64) -> Self {
        Self(value)
    }

    pub const fn from_secs(value: u64) -> Self {
        Self(value.saturating_mul(MICROS_PER_SEC))
    }

    pub fn now() -> Self {
        let now = SystemTime::now();
        now.try_into().expect("system time went backwards")
    }

    /// Current time, but never earlier than `previous`.
    ///
    /// Used whenever a record gets rewritten so `last_updated` can only move forwards, even if the
    /// local clock is behind the clock which produced the previous value.
    pub fn advance_from(previous: Timestamp) -> Self {
        Self::now().max(previous)
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    pub const fn as_secs(&self) -> u64 {
        self.0 / MICROS_PER_SEC
    }

    /// Time elapsed between `earlier` and this timestamp, zero if `earlier` is in the future.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

impl From<Timestamp> for u64 {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = SystemTimeError;

    fn try_from(system_time: SystemTime) -> Result<Self, Self::Error> {
        let duration = system_time.duration_since(UNIX_EPOCH)?;
        Ok(Self(duration.as_micros() as u64))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
