//! Transport adapters.
//!
//! A [`Transport`] performs the low-level connect / write / read / close
//! steps of one HTTP exchange. Adapters are picked by name from a closed
//! registry (see [`adapter`]); the request pipeline never touches sockets
//! directly.

pub mod adapter;
pub mod agent;
pub mod testing;

pub use adapter::{AdapterKind, AdapterOptions};
pub use agent::AgentTransport;
pub use testing::{RecordedRequest, TestHandle, TestTransport};

use crate::base::neterror::NetError;
use crate::http::RequestBody;
use http::{HeaderMap, Method};
use std::fmt;
use std::io::Read;
use url::Url;

/// HTTP version string written on the request line.
pub const HTTP_VERSION: &str = "1.1";

/// A body to stream as the request payload of an upload.
pub struct UploadStream {
    pub reader: Box<dyn Read + Send>,
    pub size: u64,
}

impl UploadStream {
    pub fn new(reader: Box<dyn Read + Send>, size: u64) -> Self {
        Self { reader, size }
    }
}

impl fmt::Debug for UploadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStream")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Blocking HTTP transport.
///
/// One value serves one exchange at a time and is not shared between
/// threads; callers that need parallel requests use separate transports.
pub trait Transport: Send {
    /// Name the adapter is registered under.
    fn name(&self) -> &'static str;

    /// Replace the adapter-specific options. Keys missing from `options`
    /// fall back to their defaults; unknown keys are ignored.
    fn set_options(&mut self, options: &AdapterOptions);

    /// Open (or prepare) a connection to `host:port`; `secure` selects TLS.
    fn connect(&mut self, host: &str, port: u16, secure: bool) -> Result<(), NetError>;

    /// Send a request on the open connection and return the raw request
    /// text that was written.
    fn write(
        &mut self,
        method: &Method,
        url: &Url,
        version: &str,
        headers: &HeaderMap,
        body: &RequestBody,
    ) -> Result<String, NetError>;

    /// Read the complete raw response.
    fn read(&mut self) -> Result<String, NetError>;

    /// Close the connection. Closing a closed transport is a no-op.
    fn close(&mut self);

    /// Stream `upload` as the body of the next request instead of the
    /// encoded body passed to [`write`](Self::write).
    fn set_upload(&mut self, upload: UploadStream);
}

/// Host, port and TLS flag for `url`.
pub fn endpoint(url: &Url) -> Result<(String, u16, bool), NetError> {
    let host = url.host_str().ok_or(NetError::InvalidUrl)?.to_string();
    let secure = match url.scheme() {
        "https" => true,
        "http" => false,
        _ => return Err(NetError::DisallowedUrlScheme),
    };
    let port = url
        .port_or_known_default()
        .ok_or(NetError::DisallowedUrlScheme)?;
    Ok((host, port, secure))
}
