//! Application settings configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::api::query::{Scope, MAX_PAGE_SIZE};

/// Default number of issues fetched per search page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Project used by `list` and `create` when none is given.
    pub default_project: Option<String>,
    /// Scope used by `list` when none is given.
    pub default_scope: Scope,
    /// Issues fetched per search page.
    pub page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_project: None,
            default_scope: Scope::All,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Settings {
    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }
}
