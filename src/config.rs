//! Client configuration.
//!
//! Everything the request pipeline reads from its host application: the
//! default adapter, caching defaults, the application key and the runtime
//! mode. All fields have defaults so a partial JSON document is enough.

use crate::cache::CacheOption;
use crate::http::headers::default_user_agent;
use crate::socket::AdapterOptions;
use serde::Deserialize;

/// Application runtime mode. Caching only happens in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Production,
    #[default]
    Development,
    Testing,
}

impl RuntimeMode {
    pub fn is_production(&self) -> bool {
        matches!(self, RuntimeMode::Production)
    }
}

/// Remote access configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteConfig {
    /// Adapter used when a call does not name one.
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Options handed to every adapter built from this configuration.
    #[serde(default)]
    pub adapter_options: AdapterOptions,

    /// Global cache setting for GET requests.
    #[serde(default)]
    pub cache: Option<CacheOption>,

    /// Application identifier added to every request's parameters.
    #[serde(default)]
    pub appkey: Option<String>,

    #[serde(default)]
    pub mode: RuntimeMode,

    /// User-Agent sent when a request sets none.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            adapter_options: AdapterOptions::new(),
            cache: None,
            appkey: None,
            mode: RuntimeMode::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl RemoteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = adapter.into();
        self
    }

    pub fn with_appkey(mut self, appkey: impl Into<String>) -> Self {
        self.appkey = Some(appkey.into());
        self
    }

    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache(mut self, cache: impl Into<CacheOption>) -> Self {
        self.cache = Some(cache.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set one adapter option.
    pub fn with_adapter_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.adapter_options.insert(key.into(), value.into());
        self
    }
}

fn default_adapter() -> String {
    "socket".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = RemoteConfig::default();
        assert_eq!(config.adapter, "socket");
        assert_eq!(config.mode, RuntimeMode::Development);
        assert!(config.cache.is_none());
        assert!(config.user_agent.starts_with("remotekit/"));
    }

    #[test]
    fn test_partial_json() {
        let config = RemoteConfig::from_json_str(
            r#"{"appkey":"k1","mode":"production","cache":300,"adapter_options":{"timeout":5}}"#,
        )
        .unwrap();
        assert_eq!(config.appkey.as_deref(), Some("k1"));
        assert!(config.mode.is_production());
        assert_eq!(config.cache, Some(CacheOption::Ttl(300)));
        assert_eq!(config.adapter_options.get("timeout"), Some(&json!(5)));
        assert_eq!(config.adapter, "socket");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(RemoteConfig::from_json_str(r#"{"mode":"staging"}"#).is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = RemoteConfig::new()
            .with_adapter("test")
            .with_appkey("abc")
            .with_mode(RuntimeMode::Production)
            .with_cache(true)
            .with_adapter_option("timeout", 3);

        assert_eq!(config.adapter, "test");
        assert_eq!(config.cache, Some(CacheOption::Enabled(true)));
        assert_eq!(config.adapter_options.get("timeout"), Some(&json!(3)));
    }
}
