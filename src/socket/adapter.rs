//! Adapter registry.
//!
//! Adapters are a closed set of compiled-in transports looked up by name.
//! Unknown names fail with [`NetError::UnknownAdapter`].

use crate::base::neterror::NetError;
use crate::socket::{AgentTransport, TestTransport, Transport};
use std::fmt;
use std::str::FromStr;

/// Adapter-specific options, passed through verbatim to the transport.
pub type AdapterOptions = serde_json::Map<String, serde_json::Value>;

/// The transports this crate can build by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Blocking HTTP(S) over a `ureq` agent.
    Socket,
    /// Offline transport replaying queued responses.
    Test,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 2] = [AdapterKind::Socket, AdapterKind::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Socket => "socket",
            AdapterKind::Test => "test",
        }
    }

    /// Construct a fresh transport of this kind with `options` applied.
    pub fn build(&self, options: &AdapterOptions) -> Box<dyn Transport> {
        let mut transport: Box<dyn Transport> = match self {
            AdapterKind::Socket => Box::new(AgentTransport::new()),
            AdapterKind::Test => Box::new(TestTransport::new()),
        };
        transport.set_options(options);
        tracing::debug!(adapter = self.as_str(), "built transport adapter");
        transport
    }
}

impl FromStr for AdapterKind {
    type Err = NetError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        AdapterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| NetError::UnknownAdapter(name.to_string()))
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve `name` and build the transport in one step.
pub fn load_adapter(name: &str, options: &AdapterOptions) -> Result<Box<dyn Transport>, NetError> {
    let kind = name.parse::<AdapterKind>().map_err(|e| {
        tracing::warn!(adapter = %name, "unknown transport adapter");
        e
    })?;
    Ok(kind.build(options))
}

/// Overlay `overrides` on `base`; keys in `overrides` win.
pub fn merge_options(base: &AdapterOptions, overrides: &AdapterOptions) -> AdapterOptions {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
