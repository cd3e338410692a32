// Configuration management for Waymark
// Collects settings from the environment, .env and JSON/TOML files and
// resolves `${...}` placeholders in handler mappings.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{LinkSettings, SETTINGS_KEY};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use waymark_core::{
    CachingMappingDiscoverer, DescriptorMappingDiscoverer, InvocationRecorder, PlaceholderResolver,
    PropertyResolvingMappingDiscoverer, WebHandler,
};

/// Discoverer stack of [`ConfigManager::web_handler`]: placeholders resolve
/// against the manager's values.
pub type ConfiguredDiscoverer = CachingMappingDiscoverer<
    PropertyResolvingMappingDiscoverer<DescriptorMappingDiscoverer, ConfigManager>,
>;

/// Main configuration manager
///
/// Cloning is cheap; clones share the same values.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only environment variables starting with `prefix` are loaded.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        debug!(count = env_vars.len(), prefix = ?self.env_prefix, "Loaded environment variables");

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load a `.env` file into the process environment, then the environment.
    ///
    /// Without a path a missing `.env` in the working directory is ignored.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv() {
                    debug!(error = %e, "No .env file loaded");
                }
            }
        }
        self.load_env()
    }

    /// Load configuration from a file, merging its top-level keys.
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path.as_ref())?;
        debug!(path = %path.as_ref().display(), format = ?format, "Loaded configuration file");
        self.merge_value(data);
        Ok(())
    }

    /// Load a file, picking the format from its name.
    pub fn load_file_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let loader = ConfigLoader::auto(path.as_ref())?;
        self.load_file(path, loader.format())
    }

    /// Merge configuration from a string in the given format.
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.merge_value(data);
        Ok(())
    }

    fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            let mut config = self.config.write();
            for (key, value) in map {
                config.insert(key, value);
            }
        }
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.config.write().insert(key.to_string(), json_value);
        Ok(())
    }

    /// Get a value by key. Dotted keys (`api.version`) descend into nested
    /// tables.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        Ok(serde_json::from_value(value)?)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Copy every value of `other` into this manager.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }

        let other_config = other.config.read();
        let mut config = self.config.write();
        for (key, value) in other_config.iter() {
            config.insert(key.clone(), value.clone());
        }
    }

    /// Find `key` as given, as a dotted path, then in its environment form
    /// (`api.base-path` as `api_base_path`).
    fn lookup(&self, key: &str) -> Option<Value> {
        let config = self.config.read();

        if let Some(value) = config.get(key) {
            return Some(value.clone());
        }

        let mut segments = key.split('.');
        let nested = segments.next().and_then(|first| {
            segments.try_fold(config.get(first)?, |value, segment| value.get(segment))
        });
        if let Some(value) = nested {
            return Some(value.clone());
        }

        let env_key: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        config.get(&env_key).cloned()
    }

    /// The `waymark` section, defaults filled in.
    pub fn link_settings(&self) -> Result<LinkSettings> {
        let settings = match self.lookup(SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value)?,
            None => LinkSettings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// A web handler resolving links against the configured base URI, with
    /// `${…}` placeholders in mappings read from this manager.
    ///
    /// Mappings are cached once resolved, so values set afterwards only reach
    /// methods not linked to yet.
    pub fn web_handler(&self) -> Result<WebHandler<ConfiguredDiscoverer>> {
        let settings = self.link_settings()?;
        let discoverer = CachingMappingDiscoverer::new(PropertyResolvingMappingDiscoverer::new(
            DescriptorMappingDiscoverer::new(),
            self.clone(),
        ));
        Ok(WebHandler::with_discoverer(discoverer).with_base_uri(settings.base_uri()?))
    }

    /// A recorder sized by the configured cache capacity.
    pub fn recorder(&self) -> Result<InvocationRecorder> {
        let settings = self.link_settings()?;
        Ok(InvocationRecorder::with_capacity(settings.recorder_cache_capacity))
    }
}

/// Scalars resolve to their string form; tables and arrays do not resolve.
impl PlaceholderResolver for ConfigManager {
    fn resolve(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_dotted_lookup() {
        let manager = ConfigManager::new();
        manager
            .load_str("[api]\nversion = \"v2\"\nport = 8080\n", FileFormat::Toml)
            .unwrap();

        assert_eq!(manager.get_string("api.version").unwrap(), "v2");
        assert_eq!(manager.get_int("api.port").unwrap(), 8080);
        assert!(!manager.has("api.missing"));
    }

    #[test]
    fn test_env_style_lookup() {
        let manager = ConfigManager::new();
        manager.set("api_base_path", "/api").unwrap();

        assert_eq!(manager.resolve("api.base-path").as_deref(), Some("/api"));
    }

    #[test]
    fn test_resolve_scalars_only() {
        let manager = ConfigManager::new();
        manager.set("flag", true).unwrap();
        manager.set("list", vec![1, 2]).unwrap();

        assert_eq!(manager.resolve("flag").as_deref(), Some("true"));
        assert_eq!(manager.resolve("list"), None);
        assert_eq!(manager.resolve("missing"), None);
    }

    #[test]
    fn test_link_settings() {
        let manager = ConfigManager::new();
        assert_eq!(manager.link_settings().unwrap(), LinkSettings::default());

        manager
            .load_str(
                r#"{"waymark": {"base_uri": "http://localhost:8080/api", "recorder_cache_capacity": 8}}"#,
                FileFormat::Json,
            )
            .unwrap();

        assert_eq!(manager.recorder().unwrap().capacity(), 8);
        assert_eq!(
            manager.web_handler().unwrap().base_uri().to_string(),
            "http://localhost:8080/api"
        );
    }

    #[test]
    fn test_get_wrong_type() {
        let manager = ConfigManager::new();
        manager.set("port", "eighty").unwrap();

        assert!(matches!(manager.get_int("port"), Err(ConfigError::ValueConversion(_))));
        assert!(matches!(manager.get_int("missing"), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_merge() {
        let first = ConfigManager::new();
        let second = ConfigManager::new();
        second.set("key", "value").unwrap();

        first.merge(&second);
        first.merge(&first.clone());

        assert_eq!(first.keys(), vec!["key".to_string()]);
    }
}
