use crate::http::ParameterMap;
use http::HeaderMap;

const PART_SEPARATOR: u8 = 0;

/// Derive the cache key for a GET.
///
/// md5 over the URL as given, the JSON form of the parameters and the JSON
/// form of the headers, each part followed by a NUL byte. JSON text never
/// contains a raw NUL, so the split between parts is unambiguous. Header names are already lowercase in a
/// `HeaderMap`; pairs are sorted so insertion order does not matter.
/// Parameter order does matter, since it changes the query sent.
pub fn cache_key(url: &str, params: &ParameterMap, headers: &HeaderMap) -> String {
    let params_json = serde_json::to_string(params).unwrap_or_default();
    let headers_json = serde_json::to_string(&header_pairs(headers)).unwrap_or_default();

    let mut ctx = md5::Context::new();
    for part in [url, params_json.as_str(), headers_json.as_str()] {
        ctx.consume(part.as_bytes());
        ctx.consume([PART_SEPARATOR]);
    }
    format!("{:x}", ctx.compute())
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
}
