use serde::{Deserialize, Serialize};

use crate::config::RulesConfig;

pub const DEFAULT_LOW_STOCK_THRESHOLD: u64 = 50;
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

/// Thresholds backing the stock and expiry rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Totals strictly below this (and above zero) raise a low-stock warning.
    pub low_stock_threshold: u64,
    /// Lots expiring within this many days (inclusive) raise an expiry warning.
    pub expiry_window_days: i64,
}

impl AlertPolicy {
    pub fn new(low_stock_threshold: u64, expiry_window_days: i64) -> Self {
        let expiry_window_days = if expiry_window_days > 0 {
            expiry_window_days
        } else {
            DEFAULT_EXPIRY_WINDOW_DAYS
        };

        Self {
            low_stock_threshold,
            expiry_window_days,
        }
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_EXPIRY_WINDOW_DAYS)
    }
}

impl From<&RulesConfig> for AlertPolicy {
    fn from(config: &RulesConfig) -> Self {
        Self::new(config.low_stock_threshold, config.expiry_window_days)
    }
}
