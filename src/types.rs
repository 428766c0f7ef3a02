use std::fmt::{Display, Formatter};

use serde::Deserialize;

/// Canonical verification-code width: 5 digits, everywhere.
pub const VERIFICATION_CODE_MIN: i32 = 10_000;
pub const VERIFICATION_CODE_MAX: i32 = 99_999;

/// Polling fallback cadence for the live feeds.
pub const POLL_INTERVAL_SECS: u64 = 2;

/// Delay before the one-time redirect event after an order completes.
pub const REDIRECT_DELAY_SECS: u64 = 2;

/// Order-creation rate limit: sliding window, advisory only.
pub const INTAKE_WINDOW_SECS: u64 = 60;
pub const INTAKE_MAX_PER_WINDOW: usize = 5;

#[derive(Debug)]
pub struct PoolInitializationError(pub String);

impl Display for PoolInitializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub pg_database_url: String,
    pub redis_database_uri: String,
    pub admin_token: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_owned()
}

/// Rejections raised by the order intake path before anything is persisted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderIntakeError {
    #[error("Order must contain at least one item")]
    EmptyBasket,
    #[error("Item '{0}' has a non-positive quantity")]
    BadQuantity(String),
    #[error("Item '{0}' has a negative price")]
    BadPrice(String),
    #[error("Submitted total {submitted} does not match computed total {computed}")]
    TotalMismatch { submitted: i32, computed: i32 },
    #[error("Order total exceeds the representable amount")]
    TotalOverflow,
    #[error("The shop is not accepting orders right now")]
    ShopClosed,
    #[error("Too many order attempts, try again in a minute")]
    Throttled,
}
