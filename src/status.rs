//! Three-level severity used by assignments and requisitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of an assignment or of a whole command line.
///
/// Ordered `Valid < Incomplete < Error`, so the status of an aggregate is
/// simply the maximum of its parts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Input is acceptable as-is
    #[default]
    Valid,
    /// More typing could make the input acceptable
    Incomplete,
    /// Input is invalid as typed
    Error,
}

impl Status {
    /// Worst of two statuses
    pub fn combine(self, other: Status) -> Status {
        self.max(other)
    }

    /// Worst status of an iterator, `Valid` when empty
    pub fn worst(statuses: impl IntoIterator<Item = Status>) -> Status {
        statuses.into_iter().fold(Status::Valid, Status::combine)
    }

    /// Single character code used in markup strings (`V`, `I`, `E`)
    pub fn code(self) -> char {
        match self {
            Status::Valid => 'V',
            Status::Incomplete => 'I',
            Status::Error => 'E',
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Status::Valid)
    }

    pub fn is_error(self) -> bool {
        matches!(self, Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Valid => "VALID",
            Status::Incomplete => "INCOMPLETE",
            Status::Error => "ERROR",
        };
        f.write_str(s)
    }
}
