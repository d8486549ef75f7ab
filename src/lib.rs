//! Validated configuration for REST server endpoints.
//!
//! Reads raw key/value settings, checks them, optionally prepares a
//! server-side TLS engine and returns an immutable [`EndpointConfig`].

pub mod config;
pub mod endpoint;
pub mod headers;
pub mod options;
pub mod tls;

pub use config::{ConfigError, ConfigSource, Configuration};
pub use endpoint::{ConfigAssembler, EndpointConfig};
pub use headers::{HeaderError, ResponseHeaders};
pub use tls::{PemTlsContextFactory, TlsContext, TlsContextFactory, TlsEngine, TlsError};
