// Link building settings read from configuration

use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use waymark_core::BaseUri;
use waymark_core::recorder::DEFAULT_CACHE_CAPACITY;

/// Configuration key holding [`LinkSettings`].
pub const SETTINGS_KEY: &str = "waymark";

/// Settings for building links, read from the `waymark` section:
///
/// ```toml
/// [waymark]
/// base_uri = "https://api.example.com/v1"
/// recorder_cache_capacity = 512
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Prepended to every link. Root-relative links when unset.
    pub base_uri: Option<String>,
    /// Stand-ins kept per invocation recorder.
    pub recorder_cache_capacity: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            base_uri: None,
            recorder_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl LinkSettings {
    pub fn validate(&self) -> Result<()> {
        if self.recorder_cache_capacity == 0 {
            return Err(ConfigError::InvalidSettings(
                "recorder_cache_capacity must be greater than zero".to_string(),
            ));
        }
        self.base_uri().map(|_| ())
    }

    /// The parsed base URI.
    pub fn base_uri(&self) -> Result<BaseUri> {
        match &self.base_uri {
            Some(base) => {
                BaseUri::parse(base).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
            }
            None => Ok(BaseUri::root()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = LinkSettings::default();

        assert_eq!(settings.recorder_cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(settings.base_uri().unwrap(), BaseUri::root());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let settings = LinkSettings {
            recorder_cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidSettings(_))));

        let settings = LinkSettings {
            base_uri: Some("localhost:8080".to_string()),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
