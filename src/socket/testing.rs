//! Offline transport that records requests and replays queued responses.
//!
//! The transport and every [`TestHandle`] cloned from it share one state, so
//! a caller can hand the transport to a [`Remote`](crate::Remote) and keep a
//! handle to script responses and inspect what was sent.

use crate::base::neterror::NetError;
use crate::http::RequestBody;
use crate::socket::{AdapterOptions, Transport, UploadStream};
use http::{HeaderMap, Method};
use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// One request as the transport received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub version: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Bytes drained from an upload stream, when one was set.
    pub upload: Option<Vec<u8>>,
    /// Adapter options in effect when the request was written.
    pub options: AdapterOptions,
}

#[derive(Debug, Default)]
struct TestState {
    responses: VecDeque<Result<String, NetError>>,
    requests: Vec<RecordedRequest>,
    connects: Vec<(String, u16, bool)>,
    options: AdapterOptions,
    connect_error: Option<NetError>,
    connected: bool,
    closes: usize,
    upload: Option<UploadStream>,
}

/// Shared view of a [`TestTransport`]'s state.
#[derive(Debug, Clone, Default)]
pub struct TestHandle {
    state: Arc<Mutex<TestState>>,
}

impl TestHandle {
    fn lock(&self) -> MutexGuard<'_, TestState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a raw response for the next `read`.
    pub fn push_response(&self, raw: impl Into<String>) {
        self.lock().responses.push_back(Ok(raw.into()));
    }

    /// Queue a read failure.
    pub fn push_failure(&self, error: NetError) {
        self.lock().responses.push_back(Err(error));
    }

    /// Make every following `connect` fail with `error`.
    pub fn fail_connect(&self, error: NetError) {
        self.lock().connect_error = Some(error);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.lock().requests.last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn connects(&self) -> Vec<(String, u16, bool)> {
        self.lock().connects.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn options(&self) -> AdapterOptions {
        self.lock().options.clone()
    }

    /// Responses still waiting to be read.
    pub fn pending(&self) -> usize {
        self.lock().responses.len()
    }
}

/// Transport that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct TestTransport {
    handle: TestHandle,
}

impl TestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> TestHandle {
        self.handle.clone()
    }
}

impl Transport for TestTransport {
    fn name(&self) -> &'static str {
        "test"
    }

    fn set_options(&mut self, options: &AdapterOptions) {
        self.handle.lock().options = options.clone();
    }

    fn connect(&mut self, host: &str, port: u16, secure: bool) -> Result<(), NetError> {
        let mut state = self.handle.lock();
        state.connects.push((host.to_string(), port, secure));
        if let Some(err) = state.connect_error.clone() {
            return Err(err);
        }
        state.connected = true;
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
        let mut state = self.handle.lock();
        if !state.connected {
            return Err(NetError::SocketNotConnected);
        }

        let upload = match state.upload.take() {
            Some(mut upload) => {
                let mut data = Vec::new();
                (&mut upload.reader)
                    .take(upload.size)
                    .read_to_end(&mut data)
                    .map_err(|_| NetError::ConnectionClosed)?;
                Some(data)
            }
            None => None,
        };

        let mut raw = format!("{} {} HTTP/{}\r\n", method, url, version);
        for (name, value) in headers {
            raw.push_str(&format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes())));
        }
        raw.push_str("\r\n");
        raw.push_str(&String::from_utf8_lossy(body.as_bytes()));

        let options = state.options.clone();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            url: url.clone(),
            version: version.to_string(),
            headers: headers.clone(),
            body: body.clone(),
            upload,
            options,
        });
        Ok(raw)
    }

    fn read(&mut self) -> Result<String, NetError> {
        let mut state = self.handle.lock();
        if !state.connected {
            return Err(NetError::SocketNotConnected);
        }
        state
            .responses
            .pop_front()
            .unwrap_or(Err(NetError::EmptyResponse))
    }

    fn close(&mut self) {
        let mut state = self.handle.lock();
        state.connected = false;
        state.upload = None;
        state.closes += 1;
    }

    fn set_upload(&mut self, upload: UploadStream) {
        self.handle.lock().upload = Some(upload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> (TestTransport, TestHandle) {
        let mut transport = TestTransport::new();
        let handle = transport.handle();
        transport.connect("h", 80, false).unwrap();
        (transport, handle)
    }

    #[test]
    fn test_replays_in_order() {
        let (mut transport, handle) = connected();
        handle.push_response("first");
        handle.push_failure(NetError::ConnectionClosed);

        assert_eq!(transport.read().unwrap(), "first");
        assert_eq!(transport.read().unwrap_err(), NetError::ConnectionClosed);
        assert_eq!(transport.read().unwrap_err(), NetError::EmptyResponse);
    }

    #[test]
    fn test_records_requests() {
        let (mut transport, handle) = connected();
        let url = Url::parse("http://h/p?x=1").unwrap();
        transport
            .write(&Method::GET, &url, "1.1", &HeaderMap::new(), &RequestBody::Empty)
            .unwrap();

        let request = handle.last_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.query(), Some("x=1"));
        assert_eq!(handle.connects(), vec![("h".to_string(), 80, false)]);
    }

    #[test]
    fn test_write_requires_connect() {
        let mut transport = TestTransport::new();
        let url = Url::parse("http://h/").unwrap();
        let err = transport
            .write(&Method::GET, &url, "1.1", &HeaderMap::new(), &RequestBody::Empty)
            .unwrap_err();
        assert_eq!(err, NetError::SocketNotConnected);
    }

    #[test]
    fn test_upload_drained_on_write() {
        let (mut transport, handle) = connected();
        transport.set_upload(UploadStream::new(Box::new(&b"payload-and-more"[..]), 7));
        let url = Url::parse("http://h/up").unwrap();
        transport
            .write(&Method::PUT, &url, "1.1", &HeaderMap::new(), &RequestBody::Empty)
            .unwrap();

        assert_eq!(handle.last_request().unwrap().upload, Some(b"payload".to_vec()));
    }

    #[test]
    fn test_options_replaced_and_recorded() {
        let (mut transport, handle) = connected();
        let url = Url::parse("http://h/").unwrap();
        let first = serde_json::json!({"timeout": 2, "retries": 1});
        transport.set_options(first.as_object().unwrap());
        transport
            .write(&Method::GET, &url, "1.1", &HeaderMap::new(), &RequestBody::Empty)
            .unwrap();
        transport.set_options(&AdapterOptions::new());

        assert!(handle.options().is_empty());
        assert_eq!(handle.last_request().unwrap().options.get("retries"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_close_counted() {
        let (mut transport, handle) = connected();
        transport.close();
        transport.close();
        assert_eq!(handle.close_count(), 2);
    }
}
