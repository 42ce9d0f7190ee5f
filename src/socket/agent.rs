//! Blocking HTTP(S) transport on a `ureq` agent.
//!
//! `connect` prepares an agent for the target host, `write` performs the
//! exchange and keeps the response, and `read` drains the body and renders
//! the response back into raw HTTP/1.1 text for the response parser. Message
//! framing, redirects and TLS are handled by `ureq`.

use crate::base::neterror::NetError;
use crate::http::RequestBody;
use crate::socket::{AdapterOptions, Transport, UploadStream};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Method, Response};
use std::fmt;
use std::io::Read;
use std::time::Duration;
use ureq::{Agent, Body, RequestBuilder, SendBody};
use url::Url;

/// Option key for the overall exchange timeout, in seconds.
pub const TIMEOUT_OPTION: &str = "timeout";

#[derive(Default)]
pub struct AgentTransport {
    agent: Option<Agent>,
    peer: Option<(String, u16)>,
    timeout: Option<Duration>,
    upload: Option<UploadStream>,
    response: Option<Response<Body>>,
}

impl AgentTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_connected(&self) -> bool {
        self.agent.is_some()
    }

    fn build_agent(&self) -> Agent {
        Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.timeout)
            .build()
            .new_agent()
    }
}

impl fmt::Debug for AgentTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTransport")
            .field("peer", &self.peer)
            .field("timeout", &self.timeout)
            .field("upload", &self.upload)
            .field("pending_response", &self.response.is_some())
            .finish()
    }
}

impl Transport for AgentTransport {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn set_options(&mut self, options: &AdapterOptions) {
        self.timeout = options.get(TIMEOUT_OPTION).and_then(parse_timeout);
    }

    fn connect(&mut self, host: &str, port: u16, secure: bool) -> Result<(), NetError> {
        self.close();

        tracing::debug!(host = %host, port, secure, timeout = ?self.timeout, "preparing agent");
        self.agent = Some(self.build_agent());
        self.peer = Some((host.to_string(), port));
        Ok(())
    }

    fn write(
        &mut self,
        method: &Method,
        url: &Url,
        version: &str,
        headers: &HeaderMap,
        body: &RequestBody,
    ) -> Result<String, NetError> {
        let (host, port) = self.peer.clone().ok_or(NetError::SocketNotConnected)?;
        let agent = self.agent.as_ref().ok_or(NetError::SocketNotConnected)?;
        let upload = self.upload.take();
        self.response = None;

        let mut sent = headers.clone();
        sent.remove(CONTENT_LENGTH);
        match &upload {
            // An upload replaces the body on the wire, so its type is the caller's to set.
            Some(upload) => {
                sent.insert(CONTENT_LENGTH, HeaderValue::from(upload.size));
            }
            None => {
                if let Some(ct) = body.content_type() {
                    if !sent.contains_key(CONTENT_TYPE) {
                        sent.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
                    }
                }
            }
        }
        let described = describe_request(method, url, version, &sent, upload.is_none().then_some(body));

        let result = match upload {
            Some(upload) => {
                let mut reader = upload.reader.take(upload.size);
                send_stream(agent, method, url.as_str(), &sent, &mut reader)
            }
            None => send_bytes(agent, method, url.as_str(), &sent, body.as_bytes()),
        };
        let response = result.map_err(|e| transport_error(e, &host, port))?;

        tracing::debug!(status = response.status().as_u16(), "response head received");
        self.response = Some(response);
        Ok(described)
    }

    fn read(&mut self) -> Result<String, NetError> {
        let (host, port) = self.peer.clone().ok_or(NetError::SocketNotConnected)?;
        let mut response = self.response.take().ok_or(NetError::EmptyResponse)?;

        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| transport_error(e, &host, port))?;
        Ok(render_response(&response, &body))
    }

    fn close(&mut self) {
        self.agent = None;
        self.peer = None;
        self.upload = None;
        self.response = None;
    }

    fn set_upload(&mut self, upload: UploadStream) {
        self.upload = Some(upload);
    }
}

/// Seconds from an option value. Non-positive values mean "no timeout";
/// values a `Duration` cannot hold are rejected.
fn parse_timeout(value: &serde_json::Value) -> Option<Duration> {
    let Some(secs) = value.as_f64() else {
        tracing::warn!(value = %value, "ignoring non-numeric timeout option");
        return None;
    };
    if secs <= 0.0 {
        return None;
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(timeout) => Some(timeout),
        Err(e) => {
            tracing::warn!(secs, error = %e, "ignoring out-of-range timeout option");
            None
        }
    }
}

fn with_headers<B>(builder: RequestBuilder<B>, headers: &HeaderMap) -> RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |builder, (name, value)| builder.header(name, value))
}

fn send_bytes(
    agent: &Agent,
    method: &Method,
    url: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response<Body>, ureq::Error> {
    match *method {
        Method::GET => with_headers(agent.get(url), headers).call(),
        Method::HEAD => with_headers(agent.head(url), headers).call(),
        Method::DELETE => with_headers(agent.delete(url), headers).call(),
        Method::OPTIONS => with_headers(agent.options(url), headers).call(),
        Method::POST => with_headers(agent.post(url), headers).send(body),
        Method::PUT => with_headers(agent.put(url), headers).send(body),
        Method::PATCH => with_headers(agent.patch(url), headers).send(body),
        _ => {
            let mut request = http::Request::builder()
                .method(method.clone())
                .uri(url)
                .body(body.to_vec())
                .map_err(ureq::Error::Http)?;
            *request.headers_mut() = headers.clone();
            agent.run(request)
        }
    }
}

fn send_stream(
    agent: &Agent,
    method: &Method,
    url: &str,
    headers: &HeaderMap,
    reader: &mut dyn Read,
) -> Result<Response<Body>, ureq::Error> {
    let body = SendBody::from_reader(reader);
    match *method {
        Method::POST => with_headers(agent.post(url), headers).send(body),
        Method::PATCH => with_headers(agent.patch(url), headers).send(body),
        _ => with_headers(agent.put(url), headers).send(body),
    }
}

fn transport_error(err: ureq::Error, host: &str, port: u16) -> NetError {
    match err {
        ureq::Error::Timeout(_) => NetError::ConnectionTimedOut,
        ureq::Error::Io(e) => NetError::connection_failed_to(host, port, e),
        ureq::Error::HostNotFound => NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            reason: "host not found".to_string(),
        },
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => NetError::InvalidUrl,
        other => {
            tracing::warn!(host = %host, port, error = %other, "exchange failed");
            NetError::ConnectionFailed
        }
    }
}

/// Request line and headers as sent; the body only when it was sent inline.
fn describe_request(
    method: &Method,
    url: &Url,
    version: &str,
    headers: &HeaderMap,
    body: Option<&RequestBody>,
) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut text = format!("{} {} HTTP/{}\r\n", method, target, version);
    for (name, value) in headers {
        text.push_str(&format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes())));
    }
    text.push_str("\r\n");
    if let Some(body) = body {
        text.push_str(&String::from_utf8_lossy(body.as_bytes()));
    }
    text
}

/// Status line, headers and decoded body. The body has already been
/// de-chunked, so framing headers are replaced by its real length.
fn render_response<B>(response: &Response<B>, body: &[u8]) -> String {
    let status = response.status();
    let mut raw = format!(
        "{:?} {} {}\r\n",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    for (name, value) in response.headers() {
        if name == TRANSFER_ENCODING || name == CONTENT_LENGTH {
            continue;
        }
        raw.push_str(&format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes())));
    }
    raw.push_str(&format!("content-length: {}\r\n\r\n", body.len()));
    raw.push_str(&String::from_utf8_lossy(body));
    raw
}
