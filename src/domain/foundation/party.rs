//! Party enum identifying the two sides of a consultation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two parties to a consultation.
///
/// Every consultation has exactly one citizen and one paralegal.
/// Used to address per-party state such as recording consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Citizen,
    Paralegal,
}

impl Party {
    /// Returns the other side of the consultation.
    pub fn other(&self) -> Party {
        match self {
            Party::Citizen => Party::Paralegal,
            Party::Paralegal => Party::Citizen,
        }
    }

    /// Stable string form used in persistence and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Citizen => "citizen",
            Party::Paralegal => "paralegal",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
