//! Concrete analytics service clients.

#[cfg(feature = "http-backend")]
pub mod http;
pub mod local;

#[cfg(feature = "http-backend")]
pub use http::HttpBackend;
pub use local::{LocalBackend, Operation};
