use crate::base::neterror::NetError;
use crate::http::auth::{build_authorization, AuthConfig};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use http::HeaderMap;
use std::str::FromStr;

/// User-Agent sent when the caller and the configuration set none.
pub fn default_user_agent() -> String {
    format!("remotekit/{}", env!("CARGO_PKG_VERSION"))
}

/// Build a header map from name/value pairs.
///
/// Names are matched case-insensitively; a repeated name replaces the
/// earlier value.
pub fn header_map<'a, I>(pairs: I) -> Result<HeaderMap, NetError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
        let value = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Fill in the headers every outgoing request carries.
///
/// Sets `User-Agent` when missing, and `Authorization` when missing and the
/// stored credentials produce a value. Headers the caller set are kept.
pub fn canonize_headers(
    mut headers: HeaderMap,
    user_agent: &str,
    auth: Option<&AuthConfig>,
) -> HeaderMap {
    if !headers.contains_key(USER_AGENT) {
        match HeaderValue::from_str(user_agent) {
            Ok(v) => {
                headers.insert(USER_AGENT, v);
            }
            Err(_) => {
                tracing::warn!(user_agent = %user_agent, "configured user agent is not a valid header value");
            }
        }
    }

    if !headers.contains_key(AUTHORIZATION) {
        if let Some(config) = auth {
            let value = build_authorization(config);
            if !value.is_empty() {
                if let Ok(mut v) = HeaderValue::from_str(&value) {
                    v.set_sensitive(true);
                    headers.insert(AUTHORIZATION, v);
                }
            }
        }
    }

    headers
}
