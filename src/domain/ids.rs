//! Row identifier type
//!
//! The source table carries an integer identifier column that strictly
//! increases with insertion order. [`RowId`] wraps that value so checkpoints,
//! pagination bounds and row ids cannot be confused with counts or sizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monotonic row identifier
///
/// The value `0` doubles as the "nothing exported yet" checkpoint.
///
/// # Examples
///
/// ```
/// use rowship::domain::ids::RowId;
/// use std::str::FromStr;
///
/// let id = RowId::from_str(" 12500\n").unwrap();
/// assert_eq!(id.value(), 12500);
/// assert_eq!(id.to_string(), "12500");
/// assert!(RowId::from_str("-3").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// The starting checkpoint: nothing has been exported
    pub const ZERO: RowId = RowId(0);

    /// Creates a new RowId
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Whether this is the zero checkpoint
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RowId {
    type Err = String;

    /// Parses a decimal identifier, ignoring surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Row ID cannot be empty".to_string());
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|e| format!("Invalid row ID '{trimmed}': {e}"))
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
