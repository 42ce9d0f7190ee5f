//! # remotekit
//!
//! Blocking access to remote HTTP resources for applications that want one
//! call per request and a decoded result back.
//!
//! A [`Remote`] canonicalizes the URL (merging the query with explicit
//! parameters and adding the application key), fills in `User-Agent` and
//! `Authorization`, runs the exchange on a pluggable transport and turns the
//! response into a [`Payload`]. GET results can be cached with a TTL.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use remotekit::{ParameterMap, Remote, RemoteConfig, RuntimeMode};
//! use remotekit::client::GetOptions;
//! use http::HeaderMap;
//!
//! let config = RemoteConfig::new()
//!     .with_appkey("k123")
//!     .with_mode(RuntimeMode::Production)
//!     .with_cache(300u64);
//! let mut remote = Remote::new(config);
//!
//! let items = remote.get(
//!     "http://api.example.com/items",
//!     ParameterMap::new().with("page", "2"),
//!     HeaderMap::new(),
//!     GetOptions::default(),
//! )?;
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and result helpers
//! - [`cache`] - Cache decision, keys and storage backends
//! - [`client`] - The request orchestrator
//! - [`config`] - Configuration
//! - [`http`] - Parameters, headers, credentials, bodies and response parsing
//! - [`socket`] - Transport adapters

pub mod base;
pub mod cache;
pub mod client;
pub mod config;
pub mod http;
pub mod socket;

pub use base::context::SentinelExt;
pub use base::neterror::NetError;
pub use cache::{CacheOption, CacheOptions, CacheStorage, CacheStore, MemoryStorage, StorageRegistry};
pub use client::{AdapterHandle, GetOptions, PostOptions, Remote, RemoteBuilder, UploadFile, UploadOptions};
pub use config::{RemoteConfig, RuntimeMode};
pub use crate::http::{AuthConfig, ParameterMap, Payload, PostParams};
pub use socket::{AdapterKind, AdapterOptions, TestTransport, Transport};
