use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    /// The exchange failed below HTTP without an IO cause to report, such
    /// as a TLS or protocol failure.
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Connection to {host}:{port} failed: {reason}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // Request Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Disallowed URL scheme")]
    DisallowedUrlScheme,
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Upload size could not be determined")]
    UploadSizeUnknown,
    #[error("Unknown transport adapter: {0}")]
    UnknownAdapter(String),

    // Response Errors
    #[error("Empty response")]
    EmptyResponse,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,
    #[error("Invalid chunked encoding")]
    InvalidChunkedEncoding,
    #[error("Response body is not valid JSON")]
    InvalidJson,
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    // Cache Errors
    #[error("Cached value could not be encoded or decoded")]
    CacheEncoding,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    /// Build a connection error that keeps the target and the IO cause.
    pub fn connection_failed_to(host: &str, port: u16, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut || err.kind() == std::io::ErrorKind::WouldBlock
        {
            return NetError::ConnectionTimedOut;
        }
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            reason: err.to_string(),
        }
    }

    /// True for failures raised by the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionClosed
                | NetError::ConnectionFailed
                | NetError::ConnectionFailedTo { .. }
                | NetError::SocketNotConnected
                | NetError::ConnectionTimedOut
                | NetError::EmptyResponse
        )
    }

    /// True for errors that mean the caller or its configuration is wrong,
    /// as opposed to the remote end misbehaving.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NetError::InvalidUrl
                | NetError::DisallowedUrlScheme
                | NetError::InvalidHeader
                | NetError::UploadSizeUnknown
                | NetError::UnknownAdapter(_)
        )
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionFailed => -104,
            NetError::ConnectionFailedTo { .. } => -104,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,

            NetError::InvalidUrl => -300,
            NetError::DisallowedUrlScheme => -301,
            NetError::InvalidHttpResponse => -370,
            NetError::InvalidChunkedEncoding => -321,
            NetError::EmptyResponse => -324,
            // Codes below are local to this crate
            NetError::UnknownAdapter(_) => -950,
            NetError::UploadSizeUnknown => -951,
            NetError::InvalidJson => -952,
            NetError::HttpStatus(_) => -953,
            NetError::CacheEncoding => -954,
            NetError::InvalidHeader => -955,
            NetError::Unknown(code) => *code,
        }
    }
}

/// Decode a code produced by [`NetError::as_i32`].
///
/// Variants that carry data decode lossily: `ConnectionFailedTo` comes back
/// as `ConnectionFailed` (both -104), and `UnknownAdapter` (-950) and
/// `HttpStatus` (-953) come back as `Unknown` because the adapter name and
/// status are not in the code.
impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -104 => NetError::ConnectionFailed,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,

            -300 => NetError::InvalidUrl,
            -301 => NetError::DisallowedUrlScheme,
            -370 => NetError::InvalidHttpResponse,
            -321 => NetError::InvalidChunkedEncoding,
            -324 => NetError::EmptyResponse,
            -951 => NetError::UploadSizeUnknown,
            -952 => NetError::InvalidJson,
            -954 => NetError::CacheEncoding,
            -955 => NetError::InvalidHeader,
            _ => NetError::Unknown(code),
        }
    }
}
