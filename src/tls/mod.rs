//! TLS setup for the REST endpoint.
//!
//! The assembler never talks to certificate stores itself. It asks a
//! [`TlsContextFactory`] for a [`TlsContext`] (key material plus crypto
//! provider) and derives a server-side [`TlsEngine`] from it, restricted to the
//! configured protocol versions and cipher suites.
//!
//! A factory may answer `Ok(None)` to signal that TLS is unavailable; the
//! endpoint then runs without an engine.

mod engine;
mod pem;

use std::path::PathBuf;

use rustls::crypto::CryptoProvider;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::ConfigSource;

pub use engine::{TlsEngine, TlsRestrictions, DEFAULT_SSL_PROTOCOLS};
pub use pem::PemTlsContextFactory;

#[cfg(test)]
pub(crate) use pem::fixture as pem_fixture;

/// Builds the server-side TLS context for an endpoint.
pub trait TlsContextFactory {
    /// Returns `Ok(None)` when TLS cannot be offered but that is not an error.
    fn create_server_context(
        &self,
        source: &dyn ConfigSource,
    ) -> Result<Option<TlsContext>, TlsError>;
}

/// Key material and crypto provider from which server engines are derived.
pub struct TlsContext {
    provider: CryptoProvider,
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl TlsContext {
    /// Creates a context backed by the aws-lc-rs provider.
    pub fn new(cert_chain: Vec<CertificateDer<'static>>, key: PrivateKeyDer<'static>) -> Self {
        Self::with_provider(rustls::crypto::aws_lc_rs::default_provider(), cert_chain, key)
    }

    pub fn with_provider(
        provider: CryptoProvider,
        cert_chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Self {
        Self {
            provider,
            cert_chain,
            key,
        }
    }

    pub fn provider(&self) -> &CryptoProvider {
        &self.provider
    }

    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// Derives a server-mode engine, ready for the handshake but not started.
    pub fn create_engine(&self, restrictions: &TlsRestrictions) -> Result<TlsEngine, TlsError> {
        TlsEngine::new(self, restrictions)
    }
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext")
            .field("cert_chain_len", &self.cert_chain.len())
            .field("cipher_suites", &self.provider.cipher_suites.len())
            .finish_non_exhaustive()
    }
}

/// TLS setup failure
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("{present} is set but {missing} is not")]
    MissingKeyMaterial {
        present: &'static str,
        missing: &'static str,
    },

    #[error("Failed to load PEM file {path}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: rustls_pki_types::pem::Error,
    },

    #[error("No certificates found in {0}")]
    EmptyCertificateChain(PathBuf),

    #[error("Unsupported TLS protocol version: {0}")]
    UnsupportedProtocol(String),

    #[error("Unsupported cipher suite: {0}")]
    UnsupportedCipherSuite(String),

    #[error("None of the configured cipher suites can be used with {0}")]
    NoUsableCipherSuite(String),

    #[error("Invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
}
