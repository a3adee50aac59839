use std::time::Duration;
use thiserror::Error;

/// Max-age applied when a preflight response carries no usable `Access-Control-Max-Age`.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);
/// Upper bound for any cached preflight grant.
pub const MAXIMUM_MAX_AGE: Duration = Duration::from_secs(86_400);
pub const DEFAULT_CACHE_SIZE: usize = 1_024;
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerOptions {
    pub default_max_age: Duration,
    pub maximum_max_age: Duration,
    /// Preflight cache capacity in entries; the entry closest to expiry is evicted first.
    pub max_size: usize,
    /// Redirect hops tolerated per request before the chain counts as a loop.
    pub max_redirects: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            default_max_age: DEFAULT_MAX_AGE,
            maximum_max_age: MAXIMUM_MAX_AGE,
            max_size: DEFAULT_CACHE_SIZE,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("default max-age ({default:?}) exceeds the maximum max-age ({maximum:?})")]
    DefaultMaxAgeAboveMaximum { default: Duration, maximum: Duration },
    #[error("preflight cache size must be at least one entry")]
    ZeroCacheSize,
}

impl ManagerOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_max_age > self.maximum_max_age {
            return Err(ValidationError::DefaultMaxAgeAboveMaximum {
                default: self.default_max_age,
                maximum: self.maximum_max_age,
            });
        }

        if self.max_size == 0 {
            return Err(ValidationError::ZeroCacheSize);
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "options_test.rs"]
mod options_test;
