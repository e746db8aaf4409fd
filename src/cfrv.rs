//! Conflict-free replicated versions
//!
//! Two versions generated concurrently on different replicas can still be
//! totally ordered. The implementation here is the Lamport scalar: each
//! replica issues versions from a monotonically increasing counter stamped
//! with its own process id, and ties on the counter are broken by the pid.
//!
//! The comparison helpers take `Option<&Version>` so that comparing against
//! "no version" is well defined: nothing is treated as the null version for
//! equality, and any version is greater than nothing.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Behaviour shared by every kind of conflict-free replicated version.
pub trait Cfrv: fmt::Display + Sized {
    fn is_zero(&self) -> bool;
    fn equals(&self, other: Option<&Self>) -> bool;
    fn greater(&self, other: Option<&Self>) -> bool;
    fn greater_equal(&self, other: Option<&Self>) -> bool;
    fn lesser(&self, other: Option<&Self>) -> bool;
    fn lesser_equal(&self, other: Option<&Self>) -> bool;
}

/// Issues versions for keyed objects and keeps the state needed to do so.
pub trait Factory {
    type Version: Cfrv;

    /// Next version for `key`
    fn next(&mut self, key: &str) -> Self::Version;

    /// Observe a version generated elsewhere
    fn update(&mut self, key: &str, version: &Self::Version);

    /// Parse a version from its display form
    fn parse(&self, s: &str) -> Result<Self::Version>;
}

/// Lamport scalar version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    /// Monotonically increasing counter, starts at one
    pub scalar: u64,
    /// Process id used to break ties, should not be zero
    pub pid: u64,
}

/// The zero version, which does not exist.
pub const NULL_VERSION: Version = Version { scalar: 0, pid: 0 };

impl Version {
    pub fn new(scalar: u64, pid: u64) -> Self {
        Self { scalar, pid }
    }

    /// Parse `"<scalar>.<pid>"`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 {
            return Err(AppError::parse(format!(
                "incorrect number of version components, could not parse '{}'",
                s
            )));
        }

        let scalar = parse_component(parts[0])
            .ok_or_else(|| AppError::parse(format!("could not parse scalar component: '{}'", parts[0])))?;
        let pid = parse_component(parts[1])
            .ok_or_else(|| AppError::parse(format!("could not parse pid component: '{}'", parts[1])))?;

        Ok(Self { scalar, pid })
    }
}

/// Digits only; `u64::from_str` would also accept a leading `+`
fn parse_component(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scalar, self.pid)
    }
}

impl FromStr for Version {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scalar
            .cmp(&other.scalar)
            .then_with(|| self.pid.cmp(&other.pid))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Cfrv for Version {
    fn is_zero(&self) -> bool {
        self.scalar == 0 && self.pid == 0
    }

    fn equals(&self, other: Option<&Self>) -> bool {
        match other {
            None => self.is_zero(),
            Some(o) => self == o,
        }
    }

    fn greater(&self, other: Option<&Self>) -> bool {
        other.map_or(true, |o| self > o)
    }

    fn greater_equal(&self, other: Option<&Self>) -> bool {
        other.map_or(true, |o| self >= o)
    }

    fn lesser(&self, other: Option<&Self>) -> bool {
        other.map_or(false, |o| self < o)
    }

    fn lesser_equal(&self, other: Option<&Self>) -> bool {
        match other {
            None => self.is_zero(),
            Some(o) => self <= o,
        }
    }
}

/// Per-key Lamport scalar factory.
///
/// Not synchronized; wrap it in a lock when it is shared between threads.
#[derive(Debug, Clone)]
pub struct VersionFactory {
    pid: u64,
    latest: HashMap<String, u64>,
}

impl VersionFactory {
    pub fn new(pid: u64) -> Self {
        Self {
            pid,
            latest: HashMap::new(),
        }
    }

    pub fn pid(&self) -> u64 {
        self.pid
    }

    /// Latest scalar observed or issued for `key`
    pub fn latest(&self, key: &str) -> u64 {
        self.latest.get(key).copied().unwrap_or(0)
    }
}

impl Factory for VersionFactory {
    type Version = Version;

    fn next(&mut self, key: &str) -> Version {
        let scalar = self.latest.entry(key.to_string()).or_insert(0);
        *scalar += 1;
        Version {
            scalar: *scalar,
            pid: self.pid,
        }
    }

    fn update(&mut self, key: &str, version: &Version) {
        let scalar = self.latest.entry(key.to_string()).or_insert(0);
        if version.scalar > *scalar {
            *scalar = version.scalar;
        }
    }

    fn parse(&self, s: &str) -> Result<Version> {
        Version::parse(s)
    }
}
