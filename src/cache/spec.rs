//! Per-call cache decision.
//!
//! The global configuration and the per-call option are both a
//! [`CacheOption`]; [`CacheSpec::resolve`] folds them into one decision,
//! with the call taking precedence. Outside production caching is always
//! off.

use crate::cache::{DEFAULT_STORAGE, REMOTE_NAMESPACE};
use crate::config::RuntimeMode;
use serde::Deserialize;
use std::time::Duration;

/// Explicit cache settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CacheOptions {
    /// Name of the storage backend.
    #[serde(default)]
    pub storage: Option<String>,
    /// Lifetime in seconds; `0` means the backend default.
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl CacheOptions {
    /// Overlay `option` on these settings.
    fn apply(mut self, option: &CacheOption) -> Self {
        match option {
            CacheOption::Enabled(_) => {}
            CacheOption::Ttl(ttl) => self.ttl = Some(*ttl),
            CacheOption::Storage(name) => self.storage = Some(name.clone()),
            CacheOption::Custom(custom) => {
                if custom.storage.is_some() {
                    self.storage = custom.storage.clone();
                }
                if custom.ttl.is_some() {
                    self.ttl = custom.ttl;
                }
                if custom.namespace.is_some() {
                    self.namespace = custom.namespace.clone();
                }
            }
        }
        self
    }

    fn resolved(self) -> ResolvedCache {
        ResolvedCache {
            storage: self.storage.unwrap_or_else(|| DEFAULT_STORAGE.to_string()),
            ttl: self.ttl.filter(|&t| t > 0).map(Duration::from_secs),
            namespace: self
                .namespace
                .unwrap_or_else(|| REMOTE_NAMESPACE.to_string()),
        }
    }
}

/// How a caller or the configuration asks for caching.
///
/// Deserializes from a bool (on/off), an integer (TTL in seconds), a string
/// (storage name) or a map ([`CacheOptions`]).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CacheOption {
    Enabled(bool),
    Ttl(u64),
    Storage(String),
    Custom(CacheOptions),
}

impl From<bool> for CacheOption {
    fn from(enabled: bool) -> Self {
        CacheOption::Enabled(enabled)
    }
}

impl From<u64> for CacheOption {
    fn from(ttl: u64) -> Self {
        CacheOption::Ttl(ttl)
    }
}

impl From<&str> for CacheOption {
    fn from(storage: &str) -> Self {
        CacheOption::Storage(storage.to_string())
    }
}

impl From<CacheOptions> for CacheOption {
    fn from(options: CacheOptions) -> Self {
        CacheOption::Custom(options)
    }
}

/// Where and for how long one GET result is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCache {
    pub storage: String,
    pub ttl: Option<Duration>,
    pub namespace: String,
}

/// Resolved caching decision for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheSpec {
    Disabled,
    Enabled(ResolvedCache),
}

impl CacheSpec {
    /// Fold the per-call option over the global one.
    ///
    /// An explicit `false` on the call always disables. With no per-call
    /// option the global setting decides alone; with one, caching is on and
    /// the call's values override the global ones.
    pub fn resolve(
        per_call: Option<&CacheOption>,
        global: Option<&CacheOption>,
        mode: RuntimeMode,
    ) -> CacheSpec {
        if matches!(per_call, Some(CacheOption::Enabled(false))) || !mode.is_production() {
            return CacheSpec::Disabled;
        }

        let base = match global {
            None | Some(CacheOption::Enabled(false)) => None,
            Some(option) => Some(CacheOptions::default().apply(option)),
        };

        let options = match (per_call, base) {
            (None, None) => return CacheSpec::Disabled,
            (None, Some(base)) => base,
            (Some(option), base) => base.unwrap_or_default().apply(option),
        };

        CacheSpec::Enabled(options.resolved())
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CacheSpec::Enabled(_))
    }

    pub fn settings(&self) -> Option<&ResolvedCache> {
        match self {
            CacheSpec::Enabled(resolved) => Some(resolved),
            CacheSpec::Disabled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROD: RuntimeMode = RuntimeMode::Production;

    #[test]
    fn test_disabled_without_any_option() {
        assert_eq!(CacheSpec::resolve(None, None, PROD), CacheSpec::Disabled);
    }

    #[test]
    fn test_global_true_uses_defaults() {
        let spec = CacheSpec::resolve(None, Some(&CacheOption::Enabled(true)), PROD);
        let settings = spec.settings().unwrap();
        assert_eq!(settings.storage, DEFAULT_STORAGE);
        assert_eq!(settings.ttl, None);
        assert_eq!(settings.namespace, REMOTE_NAMESPACE);
    }

    #[test]
    fn test_per_call_overrides_global() {
        let global = CacheOption::Custom(CacheOptions {
            storage: Some("shared".into()),
            ttl: Some(600),
            namespace: None,
        });
        let spec = CacheSpec::resolve(Some(&CacheOption::Ttl(30)), Some(&global), PROD);
        let settings = spec.settings().unwrap();
        assert_eq!(settings.storage, "shared");
        assert_eq!(settings.ttl, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_per_call_string_is_storage() {
        let spec = CacheSpec::resolve(Some(&"disk".into()), None, PROD);
        assert_eq!(spec.settings().unwrap().storage, "disk");
    }

    #[test]
    fn test_explicit_false_wins() {
        let spec = CacheSpec::resolve(
            Some(&CacheOption::Enabled(false)),
            Some(&CacheOption::Enabled(true)),
            PROD,
        );
        assert_eq!(spec, CacheSpec::Disabled);
    }

    #[test]
    fn test_per_call_enables_over_global_false() {
        let spec = CacheSpec::resolve(
            Some(&CacheOption::Enabled(true)),
            Some(&CacheOption::Enabled(false)),
            PROD,
        );
        assert!(spec.is_enabled());
    }

    #[test]
    fn test_non_production_always_disabled() {
        for mode in [RuntimeMode::Development, RuntimeMode::Testing] {
            let spec = CacheSpec::resolve(
                Some(&CacheOption::Ttl(60)),
                Some(&CacheOption::Enabled(true)),
                mode,
            );
            assert_eq!(spec, CacheSpec::Disabled);
        }
    }

    #[test]
    fn test_zero_ttl_means_backend_default() {
        let spec = CacheSpec::resolve(Some(&CacheOption::Ttl(0)), None, PROD);
        assert_eq!(spec.settings().unwrap().ttl, None);
    }

    #[test]
    fn test_deserialize_variants() {
        let parse = |s: &str| serde_json::from_str::<CacheOption>(s).unwrap();
        assert_eq!(parse("false"), CacheOption::Enabled(false));
        assert_eq!(parse("120"), CacheOption::Ttl(120));
        assert_eq!(parse(r#""memory""#), CacheOption::Storage("memory".into()));
        assert_eq!(
            parse(r#"{"storage":"m","ttl":5}"#),
            CacheOption::Custom(CacheOptions {
                storage: Some("m".into()),
                ttl: Some(5),
                namespace: None,
            })
        );
    }
}
