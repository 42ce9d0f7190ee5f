//! Request body for POST/PUT operations.

use crate::http::params::ParameterMap;
use bytes::Bytes;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request body for HTTP methods that send data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body (GET).
    #[default]
    Empty,
    /// URL-encoded form fields.
    Form(String),
    /// Body with raw bytes, sent verbatim.
    Bytes(Bytes),
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl RequestBody {
    /// Encode form parameters. An empty map gives an empty body.
    pub fn form(params: &ParameterMap) -> Self {
        if params.is_empty() {
            RequestBody::Empty
        } else {
            RequestBody::Form(params.to_form_urlencoded())
        }
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the length of the body in bytes.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Form(s) => s.len(),
            RequestBody::Bytes(b) => b.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RequestBody::Empty => &[],
            RequestBody::Form(s) => s.as_bytes(),
            RequestBody::Bytes(b) => b.as_ref(),
        }
    }

    /// Content type implied by the body, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Form(_) => Some(FORM_CONTENT_TYPE),
            _ => None,
        }
    }
}

/// What a POST sends: structured parameters or a ready-made payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostParams {
    /// Merged with the URL query, then form-encoded into the body.
    Form(ParameterMap),
    /// Passed through untouched.
    Raw(Bytes),
}

impl Default for PostParams {
    fn default() -> Self {
        PostParams::Form(ParameterMap::new())
    }
}

impl From<ParameterMap> for PostParams {
    fn from(params: ParameterMap) -> Self {
        PostParams::Form(params)
    }
}

impl From<&str> for PostParams {
    fn from(s: &str) -> Self {
        PostParams::Raw(Bytes::from(s.to_owned()))
    }
}

impl From<String> for PostParams {
    fn from(s: String) -> Self {
        PostParams::Raw(Bytes::from(s))
    }
}

impl From<Vec<u8>> for PostParams {
    fn from(v: Vec<u8>) -> Self {
        PostParams::Raw(Bytes::from(v))
    }
}

impl From<Bytes> for PostParams {
    fn from(b: Bytes) -> Self {
        PostParams::Raw(b)
    }
}
