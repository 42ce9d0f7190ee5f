//! Credentials for the `Authorization` request header.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

/// Scheme used when credentials are configured without one.
pub const DEFAULT_SCHEME: &str = "basic";

/// Stored HTTP credentials.
///
/// All fields are optional so a partially filled configuration can be held
/// without error; [`build_authorization`] decides whether it is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Authentication scheme name, e.g. `basic` or `digest`.
    #[serde(default)]
    pub httpauth: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl AuthConfig {
    /// Credentials with the default scheme.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            httpauth: None,
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Set the scheme name.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.httpauth = Some(scheme.into());
        self
    }
}

/// Build the `Authorization` header value for `config`.
///
/// Returns an empty string unless both username and password are non-empty.
/// The credentials are sent as `base64(username:password)` behind the
/// capitalized scheme name, whatever the scheme.
pub fn build_authorization(config: &AuthConfig) -> String {
    let (username, password) = match (&config.username, &config.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => return String::new(),
    };

    let scheme = config
        .httpauth
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SCHEME);

    let creds = format!("{}:{}", username, password);
    let encoded = general_purpose::STANDARD.encode(creds);
    format!("{} {}", capitalize(scheme), encoded)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_by_default() {
        // base64("user:pass") = "dXNlcjpwYXNz"
        let header = build_authorization(&AuthConfig::new("user", "pass"));
        assert_eq!(header, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_digest_scheme_capitalized() {
        let header = build_authorization(&AuthConfig::new("user", "pass").scheme("digest"));
        assert_eq!(header, "Digest dXNlcjpwYXNz");
    }

    #[test]
    fn test_scheme_case_normalized() {
        let header = build_authorization(&AuthConfig::new("user", "pass").scheme("BASIC"));
        assert_eq!(header, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_empty_password() {
        assert_eq!(build_authorization(&AuthConfig::new("user", "")), "");
    }

    #[test]
    fn test_empty_username() {
        assert_eq!(build_authorization(&AuthConfig::new("", "pass")), "");
    }

    #[test]
    fn test_missing_credentials() {
        assert_eq!(build_authorization(&AuthConfig::default()), "");
    }

    #[test]
    fn test_deserialize() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"httpauth":"digest","username":"u","password":"p"}"#)
                .unwrap();
        assert_eq!(config.httpauth.as_deref(), Some("digest"));
        assert_eq!(build_authorization(&config), "Digest dTpw");
    }
}
