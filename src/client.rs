//! Remote access client with builder pattern.
//!
//! [`Remote`] ties the pieces together: it canonicalizes the URL and
//! headers, drives the transport through connect / write / read, parses the
//! response and, for GET, consults the cache.
//!
//! # Example
//!
//! ```rust,ignore
//! use remotekit::{ParameterMap, Remote, RemoteConfig};
//! use remotekit::client::GetOptions;
//! use http::HeaderMap;
//!
//! let mut remote = Remote::builder()
//!     .config(RemoteConfig::new().with_appkey("k123"))
//!     .build();
//!
//! let payload = remote.get(
//!     "http://api.example.com/items?a=1",
//!     ParameterMap::new().with("b", "2"),
//!     HeaderMap::new(),
//!     GetOptions::default(),
//! )?;
//! ```

use crate::base::neterror::NetError;
use crate::cache::{cache_key, CacheOption, CacheSpec, CacheStorage, CacheStore, ResolvedCache, StorageRegistry};
use crate::config::RemoteConfig;
use crate::http::auth::AuthConfig;
use crate::http::headers::canonize_headers;
use crate::http::params::{attach_query, canonize_url, ParameterMap};
use crate::http::requestbody::{PostParams, RequestBody};
use crate::http::response::{parse_response, Payload};
use crate::socket::adapter::{load_adapter, merge_options};
use crate::socket::{endpoint, AdapterOptions, Transport, UploadStream, HTTP_VERSION};
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Method};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Parameter a path upload passes the file reference under.
pub const FILE_PARAM: &str = "file";

/// Per-call options for [`Remote::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptions {
    /// Overrides the configured cache setting for this call.
    pub cache: Option<CacheOption>,
    /// Passed to the transport before the request is sent.
    pub adapter: AdapterOptions,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: impl Into<CacheOption>) -> Self {
        self.cache = Some(cache.into());
        self
    }

    /// Never read or write the cache for this call.
    pub fn no_cache(self) -> Self {
        self.cache(false)
    }

    pub fn adapter_option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.adapter.insert(key.into(), value.into());
        self
    }
}

/// Per-call options for [`Remote::post`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostOptions {
    pub adapter: AdapterOptions,
}

/// Per-call options for [`Remote::upload`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOptions {
    /// Payload size in bytes, used when no `Content-Length` header is given.
    pub size: Option<u64>,
    pub adapter: AdapterOptions,
}

impl UploadOptions {
    pub fn with_size(size: u64) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }
}

/// What [`Remote::upload`] sends.
pub enum UploadFile {
    /// A path the server resolves itself; sent as a `file=@<path>` POST.
    Path(PathBuf),
    /// An open file streamed as the PUT body.
    File(File),
    /// Any reader streamed as the PUT body. Its length must be declared.
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFile::Path(path) => f.debug_tuple("Path").field(path).finish(),
            UploadFile::File(file) => f.debug_tuple("File").field(file).finish(),
            UploadFile::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<PathBuf> for UploadFile {
    fn from(path: PathBuf) -> Self {
        UploadFile::Path(path)
    }
}

impl From<File> for UploadFile {
    fn from(file: File) -> Self {
        UploadFile::File(file)
    }
}

/// A transport returned by [`Remote::adapter`].
///
/// Either the client's own default transport, borrowed, or a freshly built
/// one the caller owns.
pub enum AdapterHandle<'a> {
    Shared(&'a mut (dyn Transport + 'static)),
    Owned(Box<dyn Transport>),
}

impl AdapterHandle<'_> {
    pub fn is_shared(&self) -> bool {
        matches!(self, AdapterHandle::Shared(_))
    }
}

impl Deref for AdapterHandle<'_> {
    type Target = dyn Transport;

    fn deref(&self) -> &Self::Target {
        match self {
            AdapterHandle::Shared(transport) => &**transport,
            AdapterHandle::Owned(transport) => &**transport,
        }
    }
}

impl DerefMut for AdapterHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            AdapterHandle::Shared(transport) => &mut **transport,
            AdapterHandle::Owned(transport) => &mut **transport,
        }
    }
}

impl fmt::Debug for AdapterHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("adapter", &self.name())
            .field("shared", &self.is_shared())
            .finish()
    }
}

/// Cache location of one GET.
struct CacheSlot {
    storage: Arc<dyn CacheStorage>,
    settings: ResolvedCache,
    key: String,
}

impl CacheSlot {
    fn lookup(&self) -> Option<Payload> {
        let cached = self.storage.get_item(&self.settings.namespace, &self.key)?;
        match serde_json::from_str::<Payload>(&cached) {
            Ok(payload) => {
                tracing::debug!(key = %self.key, storage = %self.settings.storage, "cache hit");
                Some(payload)
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %NetError::CacheEncoding,
                    reason = %e,
                    "ignoring undecodable cache entry"
                );
                None
            }
        }
    }

    fn store(&self, payload: &Payload) {
        let encoded = match serde_json::to_string(payload) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "could not encode result for caching");
                return;
            }
        };
        if !self
            .storage
            .set_item(&self.settings.namespace, &self.key, &encoded, self.settings.ttl)
        {
            tracing::warn!(
                key = %self.key,
                storage = %self.settings.storage,
                "cache write failed"
            );
        }
    }

    fn evict(&self) -> bool {
        self.storage.remove_item(&self.settings.namespace, &self.key)
    }
}

/// Client for remote resources.
///
/// Use [`Remote::builder()`] to inject a transport, a cache store or
/// credentials. Every call takes `&mut self`: the default transport carries
/// one exchange at a time.
pub struct Remote {
    config: RemoteConfig,
    transport: Option<Box<dyn Transport>>,
    /// Options the default transport returns to after every call.
    adapter_options: AdapterOptions,
    cache_store: Arc<dyn CacheStore>,
    auth: Option<AuthConfig>,
}

impl Default for Remote {
    fn default() -> Self {
        Self::new(RemoteConfig::default())
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote")
            .field("config", &self.config)
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}

impl Remote {
    /// Create a client with the default cache store and a transport built
    /// from `config` on first use.
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            adapter_options: config.adapter_options.clone(),
            config,
            transport: None,
            cache_store: Arc::new(StorageRegistry::default()),
            auth: None,
        }
    }

    pub fn builder() -> RemoteBuilder {
        RemoteBuilder::default()
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Store credentials used to build the `Authorization` header.
    pub fn set_authorization(&mut self, auth: AuthConfig) -> &mut Self {
        self.auth = Some(auth);
        self
    }

    /// Get a transport.
    ///
    /// With a name, a new transport is built with the configured options
    /// overlaid by `options`. Without one, the default transport is returned,
    /// built on first use; `options` are merged into its standing options
    /// and stay in effect for later calls.
    pub fn adapter(
        &mut self,
        name: Option<&str>,
        options: Option<&AdapterOptions>,
    ) -> Result<AdapterHandle<'_>, NetError> {
        match name {
            Some(name) => {
                let merged = match options {
                    Some(options) => merge_options(&self.config.adapter_options, options),
                    None => self.config.adapter_options.clone(),
                };
                tracing::debug!(adapter = %name, "building transport");
                Ok(AdapterHandle::Owned(load_adapter(name, &merged)?))
            }
            None => {
                let standing = options.map(|options| {
                    self.adapter_options = merge_options(&self.adapter_options, options);
                    self.adapter_options.clone()
                });
                let transport = self.default_transport()?;
                if let Some(standing) = &standing {
                    transport.set_options(standing);
                }
                Ok(AdapterHandle::Shared(&mut **transport))
            }
        }
    }

    /// GET `url`, served from the cache when caching is active and the
    /// result is stored.
    pub fn get(
        &mut self,
        url: &str,
        params: ParameterMap,
        headers: HeaderMap,
        options: GetOptions,
    ) -> Result<Payload, NetError> {
        let GetOptions { cache, adapter } = options;
        let spec = CacheSpec::resolve(cache.as_ref(), self.config.cache.as_ref(), self.config.mode);
        let slot = self.cache_slot(&spec, url, &params, &headers);

        if let Some(slot) = &slot {
            if let Some(payload) = slot.lookup() {
                return Ok(payload);
            }
            tracing::debug!(key = %slot.key, "cache miss");
        }

        let (mut target, params) = canonize_url(url, params, self.config.appkey.as_deref())?;
        attach_query(&mut target, &params);
        let headers = self.prepare_headers(headers);

        let raw = self.exchange(&Method::GET, &target, &headers, &RequestBody::Empty, &adapter)?;
        let payload = parse_response(&raw)?;

        if let Some(slot) = &slot {
            slot.store(&payload);
        }
        Ok(payload)
    }

    /// POST `params` to `url`. Never cached.
    pub fn post(
        &mut self,
        url: &str,
        params: impl Into<PostParams>,
        headers: HeaderMap,
        options: PostOptions,
    ) -> Result<Payload, NetError> {
        let (target, body) = self.prepare_body(url, params.into())?;
        let headers = self.prepare_headers(headers);

        let raw = self.exchange(&Method::POST, &target, &headers, &body, &options.adapter)?;
        parse_response(&raw)
    }

    /// Upload a file.
    ///
    /// A path is posted as `file=@<path>`. A file or reader is streamed as
    /// the body of a PUT; its size comes from a `Content-Length` header,
    /// then `options.size`, then the file's metadata. The connection is
    /// closed afterwards whatever the outcome.
    pub fn upload(
        &mut self,
        url: &str,
        file: UploadFile,
        mut params: ParameterMap,
        mut headers: HeaderMap,
        options: UploadOptions,
    ) -> Result<Payload, NetError> {
        let UploadOptions { size, adapter } = options;

        let (reader, size) = match file {
            UploadFile::Path(path) => {
                params.insert(FILE_PARAM, format!("@{}", path.display()));
                return self.post(url, params, headers, PostOptions { adapter });
            }
            UploadFile::File(file) => {
                let size = declared_length(&mut headers, size)
                    .or_else(|| file.metadata().ok().map(|m| m.len()));
                (Box::new(file) as Box<dyn Read + Send>, size)
            }
            UploadFile::Reader(reader) => (reader, declared_length(&mut headers, size)),
        };
        let size = size.ok_or_else(|| {
            tracing::warn!(url = %url, "upload size could not be determined");
            NetError::UploadSizeUnknown
        })?;

        // The stream takes the body's place on the wire, so the parameters
        // also travel in the query.
        let (mut target, body) = self.prepare_body(url, PostParams::Form(params))?;
        if let RequestBody::Form(query) = &body {
            target.set_query(Some(query));
        }
        let headers = self.prepare_headers(headers);

        self.default_transport()?
            .set_upload(UploadStream::new(reader, size));
        let raw = self.exchange(&Method::PUT, &target, &headers, &body, &adapter);
        self.close();

        parse_response(&raw?)
    }

    /// Drop the cached result of a GET issued with the same arguments.
    pub fn forget(
        &self,
        url: &str,
        params: &ParameterMap,
        headers: &HeaderMap,
        cache: Option<CacheOption>,
    ) -> bool {
        let spec = CacheSpec::resolve(cache.as_ref(), self.config.cache.as_ref(), self.config.mode);
        self.cache_slot(&spec, url, params, headers)
            .map_or(false, |slot| slot.evict())
    }

    /// Connect the default transport.
    pub fn connect(&mut self, host: &str, port: u16, secure: bool) -> Result<(), NetError> {
        self.default_transport()?.connect(host, port, secure)
    }

    /// Write a request on the default transport.
    pub fn write(
        &mut self,
        method: &Method,
        url: &Url,
        version: &str,
        headers: &HeaderMap,
        body: &RequestBody,
    ) -> Result<String, NetError> {
        self.default_transport()?
            .write(method, url, version, headers, body)
    }

    /// Read the raw response from the default transport.
    pub fn read(&mut self) -> Result<String, NetError> {
        self.default_transport()?.read()
    }

    /// Close the default transport, if one was built.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
        }
    }

    fn default_transport(&mut self) -> Result<&mut Box<dyn Transport>, NetError> {
        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => {
                tracing::debug!(adapter = %self.config.adapter, "building default transport");
                load_adapter(&self.config.adapter, &self.adapter_options)?
            }
        };
        Ok(self.transport.insert(transport))
    }

    fn cache_slot(
        &self,
        spec: &CacheSpec,
        url: &str,
        params: &ParameterMap,
        headers: &HeaderMap,
    ) -> Option<CacheSlot> {
        let settings = spec.settings()?;
        let Some(storage) = self.cache_store.load_storage(&settings.storage) else {
            tracing::warn!(storage = %settings.storage, "unknown cache storage, caching skipped");
            return None;
        };
        Some(CacheSlot {
            storage,
            settings: settings.clone(),
            key: cache_key(url, params, headers),
        })
    }

    fn prepare_headers(&self, headers: HeaderMap) -> HeaderMap {
        canonize_headers(headers, &self.config.user_agent, self.auth.as_ref())
    }

    fn prepare_body(&self, url: &str, params: PostParams) -> Result<(Url, RequestBody), NetError> {
        let appkey = self.config.appkey.as_deref();
        match params {
            PostParams::Form(params) => {
                let (target, params) = canonize_url(url, params, appkey)?;
                Ok((target, RequestBody::form(&params)))
            }
            PostParams::Raw(bytes) => {
                let (mut target, params) = canonize_url(url, ParameterMap::new(), appkey)?;
                attach_query(&mut target, &params);
                Ok((target, RequestBody::Bytes(bytes)))
            }
        }
    }

    /// One connect / write / read cycle on the default transport.
    ///
    /// Per-call `options` are overlaid on the standing options for this
    /// exchange only.
    fn exchange(
        &mut self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: &RequestBody,
        options: &AdapterOptions,
    ) -> Result<String, NetError> {
        let (host, port, secure) = endpoint(url)?;
        let scoped = (!options.is_empty()).then(|| {
            (
                merge_options(&self.adapter_options, options),
                self.adapter_options.clone(),
            )
        });
        let transport = self.default_transport()?;
        if let Some((merged, _)) = &scoped {
            transport.set_options(merged);
        }

        tracing::debug!(method = %method, url = %url, adapter = transport.name(), "dispatching request");

        let result = transport
            .connect(&host, port, secure)
            .and_then(|()| transport.write(method, url, HTTP_VERSION, headers, body))
            .and_then(|_| transport.read());
        if let Some((_, standing)) = &scoped {
            transport.set_options(standing);
        }

        result.map_err(|e| {
            tracing::warn!(method = %method, url = %url, error = %e, "remote request failed");
            e
        })
    }
}

/// Take the declared upload length out of the headers, falling back to
/// `size`.
fn declared_length(headers: &mut HeaderMap, size: Option<u64>) -> Option<u64> {
    let from_header = headers
        .remove(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok().and_then(|s| s.trim().parse::<u64>().ok()));
    from_header.or(size)
}

/// Builder for creating a [`Remote`].
#[derive(Default)]
pub struct RemoteBuilder {
    config: Option<RemoteConfig>,
    transport: Option<Box<dyn Transport>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    auth: Option<AuthConfig>,
}

impl RemoteBuilder {
    pub fn config(mut self, config: RemoteConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `transport` as the default transport instead of building one
    /// from the configured adapter name.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn authorization(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn build(self) -> Remote {
        let config = self.config.unwrap_or_default();
        let mut transport = self.transport;
        if let Some(transport) = transport.as_mut() {
            if !config.adapter_options.is_empty() {
                transport.set_options(&config.adapter_options);
            }
        }

        Remote {
            adapter_options: config.adapter_options.clone(),
            config,
            transport,
            cache_store: self
                .cache_store
                .unwrap_or_else(|| Arc::new(StorageRegistry::default())),
            auth: self.auth,
        }
    }
}
