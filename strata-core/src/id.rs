//! Task identifiers assigned by the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ParseError;

/// 128-bit identifier of a fragment instance or export task.
///
/// The two halves are opaque; the pair is the only lookup key used by
/// the managers. Ordering is derived so ids can live in ordered
/// collections, it carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub hi: i64,
    pub lo: i64,
}

impl TaskId {
    pub const fn new(hi: i64, lo: i64) -> Self {
        Self { hi, lo }
    }

    /// Create a random id from a v4 UUID
    pub fn random() -> Self {
        Self::from(Uuid::new_v4())
    }
}

impl From<Uuid> for TaskId {
    fn from(uuid: Uuid) -> Self {
        let (hi, lo) = uuid.as_u64_pair();
        Self {
            hi: hi as i64,
            lo: lo as i64,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}-{:x}", self.hi as u64, self.lo as u64)
    }
}

impl FromStr for TaskId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hi, lo) = s
            .split_once('-')
            .ok_or_else(|| ParseError::InvalidTaskId(s.to_string()))?;

        let hi = u64::from_str_radix(hi, 16).map_err(|_| ParseError::InvalidTaskId(s.to_string()))?;
        let lo = u64::from_str_radix(lo, 16).map_err(|_| ParseError::InvalidTaskId(s.to_string()))?;

        Ok(Self::new(hi as i64, lo as i64))
    }
}
