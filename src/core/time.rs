// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Bag timestamp type.
//!
//! ROS1 bags store time as two unsigned 32-bit little-endian integers
//! (seconds, nanoseconds). Both `time` and `duration` wire values use this
//! layout. Ordering compares seconds first, then nanoseconds; arithmetic
//! normalizes nanosecond carry and borrow.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{BagError, Result};

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A bag timestamp: seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    /// Whole seconds
    pub sec: u32,
    /// Nanoseconds, normalized to `0..1_000_000_000`
    pub nsec: u32,
}

impl Time {
    /// The zero timestamp.
    pub const ZERO: Time = Time { sec: 0, nsec: 0 };

    /// The latest representable timestamp.
    pub const MAX: Time = Time {
        sec: u32::MAX,
        nsec: (NANOS_PER_SEC - 1) as u32,
    };

    /// Create a timestamp from seconds and nanoseconds.
    pub const fn new(sec: u32, nsec: u32) -> Self {
        Time { sec, nsec }
    }

    /// Total nanoseconds since the epoch.
    pub fn to_nanos(self) -> u64 {
        self.sec as u64 * NANOS_PER_SEC as u64 + self.nsec as u64
    }

    /// Add two timestamps, normalizing nanosecond carry.
    ///
    /// Fails with [`BagError::InvalidTimeArithmetic`] when the normalized
    /// result does not fit the unsigned second/nanosecond fields.
    pub fn add(self, other: Time) -> Result<Time> {
        normalize(
            self.sec as i64 + other.sec as i64,
            self.nsec as i64 + other.nsec as i64,
        )
    }

    /// Subtract `other` from `self`, normalizing nanosecond borrow.
    ///
    /// Fails with [`BagError::InvalidTimeArithmetic`] when the result would
    /// be negative in either normalized field.
    pub fn sub(self, other: Time) -> Result<Time> {
        normalize(
            self.sec as i64 - other.sec as i64,
            self.nsec as i64 - other.nsec as i64,
        )
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}

/// Normalize a (seconds, nanoseconds) pair into a valid [`Time`].
///
/// `nsec >= 10^9` rolls into `sec`; negative `nsec` borrows from `sec`.
fn normalize(mut sec: i64, mut nsec: i64) -> Result<Time> {
    sec += nsec.div_euclid(NANOS_PER_SEC);
    nsec = nsec.rem_euclid(NANOS_PER_SEC);

    if sec < 0 || sec > u32::MAX as i64 {
        return Err(BagError::invalid_time(sec, nsec));
    }
    Ok(Time {
        sec: sec as u32,
        nsec: nsec as u32,
    })
}
