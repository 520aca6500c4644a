use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Stable identity of a curve inside a profile.
///
/// Curves are reordered, split and merged freely; the id survives all of
/// that while the display index does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveId(Ulid);

impl CurveId {
    /// Fresh id; ULIDs sort by creation time.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for CurveId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
