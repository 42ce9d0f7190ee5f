pub mod auth;
pub mod headers;
pub mod params;
pub mod requestbody;
pub mod response;

// Re-exports for convenience
pub use auth::{build_authorization, AuthConfig};
pub use headers::{canonize_headers, header_map};
pub use params::{canonize_url, ParamValue, ParameterMap};
pub use requestbody::{PostParams, RequestBody};
pub use response::{parse_response, HttpResponse, Payload};
