//! Request parameters and URL canonicalization.
//!
//! [`ParameterMap`] keeps insertion order and replaces values in place, the
//! same way an ordered header map does. Query strings found on a URL are
//! folded into the map so that every request leaves with a single, merged
//! parameter set that always carries the application key.

use crate::base::neterror::NetError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use url::{form_urlencoded, Url};

/// Name of the parameter that identifies the calling application.
pub const APPKEY_PARAM: &str = "appkey";

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Flatten to the string that goes on the wire.
    ///
    /// Lists are joined with commas. This loses the element boundaries
    /// (`["a,b"]` and `["a", "b"]` become the same string) and is kept as-is
    /// for compatibility with existing servers.
    pub fn flatten(&self) -> String {
        match self {
            ParamValue::Scalar(s) => s.clone(),
            ParamValue::List(items) => items.join(","),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Scalar(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Scalar(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::List(items)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(items: Vec<&str>) -> Self {
        ParamValue::List(items.into_iter().map(str::to_owned).collect())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Scalar(n.to_string())
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Scalar(s) => serializer.serialize_str(s),
            ParamValue::List(items) => items.serialize(serializer),
        }
    }
}

/// Insertion-ordered parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a parameter. An existing name keeps its position and takes the
    /// new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        if let Some((_, v)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            *v = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Merge `other` over `self`: colliding names take the value from `other`.
    pub fn merge(&mut self, other: ParameterMap) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    pub fn parse_query(query: &str) -> Self {
        let mut map = ParameterMap::new();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            map.insert(name.into_owned(), value.into_owned());
        }
        map
    }

    /// Encode as `application/x-www-form-urlencoded`, flattening lists.
    pub fn to_form_urlencoded(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.iter() {
            serializer.append_pair(name, &value.flatten());
        }
        serializer.finish()
    }
}

impl Serialize for ParameterMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterMap
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParameterMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Split the query off `url`, merge `params` over it and inject the
/// application key.
///
/// Explicit parameters win over ones parsed from the URL. `appkey` is only
/// added when configured and not already present. The returned URL carries
/// no query; callers attach the merged parameters themselves.
pub fn canonize_url(
    url: &str,
    params: ParameterMap,
    appkey: Option<&str>,
) -> Result<(Url, ParameterMap), NetError> {
    let mut url = parse_absolute(url)?;

    let mut merged = url
        .query()
        .map(ParameterMap::parse_query)
        .unwrap_or_default();
    url.set_query(None);
    merged.merge(params);

    if let Some(key) = appkey {
        if !merged.contains(APPKEY_PARAM) {
            merged.insert(APPKEY_PARAM, key);
        }
    }

    Ok((url, merged))
}

/// Attach `params` to `url` as its query string.
pub fn attach_query(url: &mut Url, params: &ParameterMap) {
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&params.to_form_urlencoded()));
    }
}

/// Parse a URL that must carry a scheme and a host.
pub fn parse_absolute(url: &str) -> Result<Url, NetError> {
    let parsed = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(NetError::InvalidUrl);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut params = ParameterMap::new();
        params.insert("a", "1");
        params.insert("b", "2");
        params.insert("a", "3");

        let names: Vec<_> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(params.get("a"), Some(&ParamValue::from("3")));
    }

    #[test]
    fn test_flatten_list() {
        let value = ParamValue::from(vec!["x", "y", "z"]);
        assert_eq!(value.flatten(), "x,y,z");
    }

    #[test]
    fn test_flatten_is_lossy() {
        let one = ParamValue::from(vec!["a,b"]);
        let two = ParamValue::from(vec!["a", "b"]);
        assert_eq!(one.flatten(), two.flatten());
    }

    #[test]
    fn test_form_encoding() {
        let params = ParameterMap::new()
            .with("q", "hello world")
            .with("tags", vec!["a", "b"]);
        assert_eq!(params.to_form_urlencoded(), "q=hello+world&tags=a%2Cb");
    }

    #[test]
    fn test_parse_query_decodes() {
        let params = ParameterMap::parse_query("a=1&b=hello%20there");
        assert_eq!(params.get("b"), Some(&ParamValue::from("hello there")));
    }

    #[test]
    fn test_canonize_merges_and_adds_appkey() {
        let params = ParameterMap::new().with("b", "2");
        let (url, merged) =
            canonize_url("http://api.example.com/x?a=1", params, Some("k123")).unwrap();

        assert_eq!(url.as_str(), "http://api.example.com/x");
        assert_eq!(merged.to_form_urlencoded(), "a=1&b=2&appkey=k123");
    }

    #[test]
    fn test_canonize_explicit_wins() {
        let params = ParameterMap::new().with("a", "explicit");
        let (_, merged) = canonize_url("http://h/p?a=url&c=3", params, None).unwrap();

        assert_eq!(merged.get("a"), Some(&ParamValue::from("explicit")));
        assert_eq!(merged.get("c"), Some(&ParamValue::from("3")));
        assert!(!merged.contains(APPKEY_PARAM));
    }

    #[test]
    fn test_canonize_keeps_existing_appkey() {
        let (_, merged) =
            canonize_url("http://h/p?appkey=mine", ParameterMap::new(), Some("cfg")).unwrap();
        assert_eq!(merged.get(APPKEY_PARAM), Some(&ParamValue::from("mine")));
    }

    #[test]
    fn test_canonize_leaves_explicit_lists_alone() {
        let params = ParameterMap::new().with("ids", vec!["1", "2"]);
        let (_, merged) = canonize_url("http://h/p", params, Some("k")).unwrap();
        assert_eq!(merged.get("ids"), Some(&ParamValue::from(vec!["1", "2"])));
    }

    #[test]
    fn test_canonize_rejects_relative() {
        let err = canonize_url("/just/a/path", ParameterMap::new(), None).unwrap_err();
        assert_eq!(err, NetError::InvalidUrl);
    }

    #[test]
    fn test_attach_query() {
        let mut url = Url::parse("http://h/p").unwrap();
        attach_query(&mut url, &ParameterMap::new().with("a", "1"));
        assert_eq!(url.as_str(), "http://h/p?a=1");

        attach_query(&mut url, &ParameterMap::new());
        assert_eq!(url.as_str(), "http://h/p");
    }

    #[test]
    fn test_serialize_preserves_order() {
        let params = ParameterMap::new().with("z", "1").with("a", vec!["x"]);
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"z":"1","a":["x"]}"#);
    }
}
