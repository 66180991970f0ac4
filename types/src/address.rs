//! Wallet-address identity for challenge participants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant's wallet address.
///
/// The coordinator treats addresses as opaque identities issued by the wallet
/// layer; it never derives or verifies keys itself (the settlement program
/// does signature checking on-chain).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerAddress(String);

impl PlayerAddress {
    /// Create a new address from a raw string.
    ///
    /// No validation happens here; callers accepting external input check
    /// [`PlayerAddress::is_valid`] at the boundary.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl fmt::Display for PlayerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PlayerAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
