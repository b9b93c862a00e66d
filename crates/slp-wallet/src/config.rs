//! Wallet-layer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which coins count as spendable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Leave unconfirmed coins out of the spendable balance.
    pub confirmed_only: bool,
}

/// Post office hosts and request settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostOfficeConfig {
    /// Post office base URLs.
    pub hosts: Vec<String>,
    /// Timeout for each postage request, in seconds.
    pub timeout_secs: u64,
}

impl Default for PostOfficeConfig {
    fn default() -> Self {
        Self { hosts: Vec::new(), timeout_secs: 5 }
    }
}

impl PostOfficeConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
