//! Raw HTTP response parsing and result interpretation.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode, Version};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The value a successful remote call hands back.
///
/// Serialized externally tagged so that a cached result decodes back into
/// the same variant it was stored from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    /// Body decoded from `application/json`.
    Json(serde_json::Value),
    /// Any other body, as text.
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Json(_) => None,
        }
    }

    /// Deserialize a JSON payload into `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        match self {
            Payload::Json(v) => T::deserialize(v).map_err(|_| NetError::InvalidJson),
            Payload::Text(_) => Err(NetError::InvalidJson),
        }
    }
}

/// An HTTP response parsed from the raw text a transport read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    /// Parse a complete response: status line, headers, blank line, body.
    ///
    /// Interim `1xx` responses in front of the final one are skipped.
    /// Chunked bodies are decoded and a `Content-Length` shorter than the
    /// remaining bytes truncates the body.
    pub fn from_raw(raw: &str) -> Result<Self, NetError> {
        let mut rest = raw.as_bytes();
        if rest.is_empty() {
            return Err(NetError::EmptyResponse);
        }

        loop {
            let (head, body) = split_head(rest).ok_or(NetError::InvalidHttpResponse)?;
            let head = std::str::from_utf8(head).map_err(|_| NetError::InvalidHttpResponse)?;
            let mut lines = head.lines();

            let status_line = lines.next().ok_or(NetError::InvalidHttpResponse)?;
            let (version, status) = parse_status_line(status_line)?;

            if status.is_informational() && !body.is_empty() {
                rest = body;
                continue;
            }

            let headers = parse_headers(lines)?;
            let body = decode_body(&headers, body)?;

            return Ok(Self {
                status,
                version,
                headers,
                body,
            });
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A response counts as ok only with a 2xx status.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// True when `Content-Type` mentions `application/json`, ignoring case.
    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }

    /// Interpret the response as a call result.
    pub fn into_payload(self) -> Result<Payload, NetError> {
        if !self.is_ok() {
            return Err(NetError::HttpStatus(self.status.as_u16()));
        }
        if self.is_json() {
            let value = serde_json::from_slice(&self.body).map_err(|_| NetError::InvalidJson)?;
            Ok(Payload::Json(value))
        } else {
            Ok(Payload::Text(self.text()))
        }
    }
}

/// Parse raw response text into a call result.
///
/// Every failure is logged as a warning here, so callers can collapse the
/// error into a plain failure without losing the diagnostic.
pub fn parse_response(raw: &str) -> Result<Payload, NetError> {
    let response = HttpResponse::from_raw(raw).map_err(|e| {
        tracing::warn!(error = %e, "could not parse remote response");
        e
    })?;

    let status = response.status();
    response.into_payload().map_err(|e| {
        tracing::warn!(status = status.as_u16(), error = %e, "remote call did not succeed");
        e
    })
}

fn split_head(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        return Some((&raw[..pos], &raw[pos + 4..]));
    }
    find(raw, b"\n\n").map(|pos| (&raw[..pos], &raw[pos + 2..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_status_line(line: &str) -> Result<(Version, StatusCode), NetError> {
    let mut parts = line.trim().splitn(3, ' ');
    let version = match parts.next() {
        Some("HTTP/1.0") => Version::HTTP_10,
        Some("HTTP/1.1") => Version::HTTP_11,
        Some("HTTP/2") | Some("HTTP/2.0") => Version::HTTP_2,
        _ => return Err(NetError::InvalidHttpResponse),
    };
    let status = parts
        .next()
        .and_then(|code| StatusCode::from_bytes(code.as_bytes()).ok())
        .ok_or(NetError::InvalidHttpResponse)?;
    Ok((version, status))
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<HeaderMap, NetError> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for line in lines {
        if line.starts_with(' ') || line.starts_with('\t') {
            // obs-fold: continuation of the previous field
            let (_, value) = fields.last_mut().ok_or(NetError::InvalidHttpResponse)?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line.split_once(':').ok_or(NetError::InvalidHttpResponse)?;
        fields.push((name.trim().to_string(), value.trim().to_string()));
    }

    let mut headers = HeaderMap::with_capacity(fields.len());
    for (name, value) in fields {
        let name = HeaderName::from_str(&name).map_err(|_| NetError::InvalidHttpResponse)?;
        let value = HeaderValue::from_str(&value).map_err(|_| NetError::InvalidHttpResponse)?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn decode_body(headers: &HeaderMap, body: &[u8]) -> Result<Bytes, NetError> {
    let chunked = headers
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|te| te.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    if chunked {
        return decode_chunked(body);
    }

    let length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());
    match length {
        Some(len) if len < body.len() => Ok(Bytes::copy_from_slice(&body[..len])),
        _ => Ok(Bytes::copy_from_slice(body)),
    }
}

fn decode_chunked(mut body: &[u8]) -> Result<Bytes, NetError> {
    let mut out = Vec::with_capacity(body.len());
    loop {
        let line_end = find(body, b"\r\n").ok_or(NetError::InvalidChunkedEncoding)?;
        let size_line =
            std::str::from_utf8(&body[..line_end]).map_err(|_| NetError::InvalidChunkedEncoding)?;
        // Chunk extensions follow a ';'
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size =
            usize::from_str_radix(size_hex, 16).map_err(|_| NetError::InvalidChunkedEncoding)?;
        body = &body[line_end + 2..];

        if size == 0 {
            return Ok(Bytes::from(out));
        }
        if body.len() < size {
            return Err(NetError::InvalidChunkedEncoding);
        }
        out.extend_from_slice(&body[..size]);
        body = &body[size..];
        body = body
            .strip_prefix(b"\r\n")
            .ok_or(NetError::InvalidChunkedEncoding)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_response() {
        let resp =
            HttpResponse::from_raw("HTTP/1.1 200 OK\r\nX-A: 1\r\nContent-Length: 2\r\n\r\nhi")
                .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.version(), Version::HTTP_11);
        assert_eq!(resp.headers().get("x-a").unwrap(), "1");
        assert_eq!(resp.text(), "hi");
    }

    #[test]
    fn test_content_length_truncates() {
        let resp = HttpResponse::from_raw("HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabcdef")
            .unwrap();
        assert_eq!(resp.text(), "abc");
    }

    #[test]
    fn test_chunked_body() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;ext=1\r\npedia\r\n0\r\n\r\n";
        let resp = HttpResponse::from_raw(raw).unwrap();
        assert_eq!(resp.text(), "Wikipedia");
    }

    #[test]
    fn test_bad_chunk_size() {
        let raw = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\nWiki\r\n0\r\n\r\n";
        assert_eq!(
            HttpResponse::from_raw(raw).unwrap_err(),
            NetError::InvalidChunkedEncoding
        );
    }

    #[test]
    fn test_skips_continue() {
        let raw = "HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 201 Created\r\n\r\ndone";
        let resp = HttpResponse::from_raw(raw).unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.text(), "done");
    }

    #[test]
    fn test_folded_header() {
        let raw = "HTTP/1.1 200 OK\r\nX-Long: part one\r\n  part two\r\n\r\n";
        let resp = HttpResponse::from_raw(raw).unwrap();
        assert_eq!(resp.headers().get("x-long").unwrap(), "part one part two");
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_eq!(
            HttpResponse::from_raw("this is not http").unwrap_err(),
            NetError::InvalidHttpResponse
        );
        assert_eq!(
            HttpResponse::from_raw("HTTP/1.1 abc OK\r\n\r\n").unwrap_err(),
            NetError::InvalidHttpResponse
        );
        assert_eq!(HttpResponse::from_raw("").unwrap_err(), NetError::EmptyResponse);
    }

    #[test]
    fn test_parse_response_non_ok() {
        let err = parse_response("HTTP/1.1 404 Not Found\r\n\r\nmissing").unwrap_err();
        assert_eq!(err, NetError::HttpStatus(404));
    }

    #[test]
    fn test_parse_response_json() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=utf-8\r\n\r\n{\"a\":[1,2]}";
        assert_eq!(parse_response(raw).unwrap(), Payload::Json(json!({"a": [1, 2]})));
    }

    #[test]
    fn test_parse_response_json_case_insensitive() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: Application/JSON\r\n\r\ntrue";
        assert_eq!(parse_response(raw).unwrap(), Payload::Json(json!(true)));
    }

    #[test]
    fn test_parse_response_text() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n{\"a\":1}";
        assert_eq!(parse_response(raw).unwrap(), Payload::Text("{\"a\":1}".into()));
    }

    #[test]
    fn test_parse_response_broken_json() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{oops";
        assert_eq!(parse_response(raw).unwrap_err(), NetError::InvalidJson);
    }

    #[test]
    fn test_payload_serde_keeps_variant() {
        let text = Payload::Text("[1]".into());
        let encoded = serde_json::to_string(&text).unwrap();
        assert_eq!(encoded, r#"{"text":"[1]"}"#);
        assert_eq!(serde_json::from_str::<Payload>(&encoded).unwrap(), text);
    }

    #[test]
    fn test_payload_typed_json() {
        #[derive(Deserialize)]
        struct Item {
            id: u32,
        }
        let payload = Payload::Json(json!({"id": 7}));
        let item: Item = payload.json().unwrap();
        assert_eq!(item.id, 7);
        assert!(Payload::Text("x".into()).json::<Item>().is_err());
    }
}
