//! fetchscope - Body-level observability for outbound HTTP calls
//!
//! This library provides the core functionality for:
//! - Redacting sensitive headers and lifting claims out of bearer tokens
//! - Classifying, decoding and bounding request and response bodies
//! - Wrapping every call made through [`fetch`] in a client span once an
//!   interceptor is installed

pub mod capture;
pub mod config;
pub mod error;
pub mod fetch;
pub mod intercept;
pub mod redact;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::InterceptorConfig;
pub use error::{Error, Result};
pub use fetch::{Request, RequestBody, RequestInit, RequestInput, Response, Transport};
pub use intercept::install::{fetch, install, restore, set_base_transport, InterceptorHandle};
pub use intercept::Interceptor;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging with environment-based filtering.
/// Uses RUST_LOG environment variable for filter configuration.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
