//! Validity states of token transactions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validity of one transaction within a token graph.
///
/// Codes are stable: wallets persist them as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Validity {
    /// Not decided (or not a token transaction of this graph).
    #[default]
    Unknown,
    /// Valid.
    Valid,
    /// Not SLP, or malformed SLP.
    Malformed,
    /// Valid inputs do not cover the declared outputs.
    InsufficientInputs,
    /// NFT1 child whose group parent is not valid.
    BadNftParent,
}

impl Validity {
    /// The persisted integer code.
    pub fn code(self) -> u8 {
        match self {
            Validity::Unknown => 0,
            Validity::Valid => 1,
            Validity::Malformed => 2,
            Validity::InsufficientInputs => 3,
            Validity::BadNftParent => 4,
        }
    }

    /// Map a persisted code back to a state.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Validity::Unknown),
            1 => Some(Validity::Valid),
            2 => Some(Validity::Malformed),
            3 => Some(Validity::InsufficientInputs),
            4 => Some(Validity::BadNftParent),
            _ => None,
        }
    }

    /// True for [`Validity::Valid`].
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }

    /// True for every `Invalid-*` state (codes above 1).
    pub fn is_invalid(self) -> bool {
        self.code() > 1
    }

    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Validity::Unknown => "Unknown",
            Validity::Valid => "Valid",
            Validity::Malformed => "Invalid: not SLP / malformed SLP",
            Validity::InsufficientInputs => "Invalid: insufficient valid inputs",
            Validity::BadNftParent => "Invalid: bad parent for child NFT",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<Validity> for u8 {
    fn from(v: Validity) -> u8 {
        v.code()
    }
}

impl TryFrom<u8> for Validity {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Validity::from_code(code).ok_or_else(|| format!("unknown validity code {code}"))
    }
}
