//! Runtime pagination settings read from the environment.

use crate::error::ConfigError;

/// What to do when a caller asks for more rows per page than allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverMaxPolicy {
    /// Fail with `PaginationRange`.
    Reject,
    /// Serve `max_per_page` rows and report that in the envelope.
    Clamp,
}

/// Reported `total_pages` when a query matches nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyTotalPages {
    Zero,
    One,
}

#[derive(Clone, Copy, Debug)]
pub struct PaginationSettings {
    pub default_per_page: u32,
    pub max_per_page: u32,
    pub over_max: OverMaxPolicy,
    pub empty_total_pages: EmptyTotalPages,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        PaginationSettings {
            default_per_page: 20,
            max_per_page: 50,
            over_max: OverMaxPolicy::Reject,
            empty_total_pages: EmptyTotalPages::One,
        }
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Validation(format!("{} must be a positive integer, got '{}'", key, v))),
        Err(_) => Ok(default),
    }
}

impl PaginationSettings {
    /// `PAGE_SIZE_DEFAULT`, `PAGE_SIZE_MAX`, `PAGE_SIZE_OVER_MAX` (reject|clamp), `EMPTY_TOTAL_PAGES` (one|zero).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let over_max = match std::env::var("PAGE_SIZE_OVER_MAX").ok().as_deref().map(str::trim) {
            None | Some("reject") => OverMaxPolicy::Reject,
            Some("clamp") => OverMaxPolicy::Clamp,
            Some(other) => {
                return Err(ConfigError::Validation(format!(
                    "PAGE_SIZE_OVER_MAX must be reject or clamp, got '{}'",
                    other
                )))
            }
        };
        let empty_total_pages = match std::env::var("EMPTY_TOTAL_PAGES").ok().as_deref().map(str::trim) {
            None | Some("one") => EmptyTotalPages::One,
            Some("zero") => EmptyTotalPages::Zero,
            Some(other) => {
                return Err(ConfigError::Validation(format!(
                    "EMPTY_TOTAL_PAGES must be one or zero, got '{}'",
                    other
                )))
            }
        };
        let settings = PaginationSettings {
            default_per_page: env_u32("PAGE_SIZE_DEFAULT", defaults.default_per_page)?,
            max_per_page: env_u32("PAGE_SIZE_MAX", defaults.max_per_page)?,
            over_max,
            empty_total_pages,
        };
        settings.check()?;
        Ok(settings)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.default_per_page == 0 || self.max_per_page == 0 {
            return Err(ConfigError::Validation("page sizes must be positive".into()));
        }
        if self.default_per_page > self.max_per_page {
            return Err(ConfigError::Validation(format!(
                "default page size {} exceeds max {}",
                self.default_per_page, self.max_per_page
            )));
        }
        Ok(())
    }
}
