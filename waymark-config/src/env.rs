// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Loads environment variables as configuration keys.
///
/// `APP_API_VERSION` with prefix `APP` becomes the key `api_version`.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// All matching variables, keyed by their lowercased, unprefixed name.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let mut config = HashMap::new();

        for (key, value) in env::vars() {
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        let trimmed = rest.trim_start_matches('_');
                        if !trimmed.is_empty() {
                            config.insert(trimmed.to_lowercase(), value);
                        }
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        Ok(config)
    }

    /// The variable for a configuration key: dots and dashes map to
    /// underscores, the name is uppercased and prefixed.
    pub fn var_name(&self, key: &str) -> String {
        let name: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }

    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_name() {
        assert_eq!(EnvLoader::default().var_name("api.base-path"), "API_BASE_PATH");
        assert_eq!(
            EnvLoader::new(Some("WAYMARK".to_string())).var_name("api.version"),
            "WAYMARK_API_VERSION"
        );
    }

    #[test]
    fn test_missing_var_uses_default() {
        let loader = EnvLoader::new(Some("WAYMARK_TEST".to_string()));

        assert!(loader.load_var("missing.var.67890").is_err());
        assert_eq!(loader.load_var_or("missing.var.67890", "fallback"), "fallback");
    }

    #[test]
    fn test_path_is_loaded() {
        if std::env::var("PATH").is_ok() {
            assert!(EnvLoader::default().load_var("path").is_ok());
            assert!(EnvLoader::default().load().unwrap().contains_key("path"));
        }
    }
}
