//! TLS context factory backed by PEM files on disk.

use std::path::Path;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use super::{TlsContext, TlsContextFactory, TlsError};
use crate::config::ConfigSource;
use crate::options::{SSL_REST_CERTIFICATE, SSL_REST_KEY};

/// Reads `security.ssl.rest.certificate` and `security.ssl.rest.key`.
///
/// When neither key is configured there is no context to offer and the
/// factory answers `Ok(None)`. Configuring only one of them is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct PemTlsContextFactory;

impl TlsContextFactory for PemTlsContextFactory {
    fn create_server_context(
        &self,
        source: &dyn ConfigSource,
    ) -> Result<Option<TlsContext>, TlsError> {
        let certificate = source.get_optional_string(&SSL_REST_CERTIFICATE);
        let key = source.get_optional_string(&SSL_REST_KEY);

        match (certificate, key) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(TlsError::MissingKeyMaterial {
                present: SSL_REST_CERTIFICATE.key(),
                missing: SSL_REST_KEY.key(),
            }),
            (None, Some(_)) => Err(TlsError::MissingKeyMaterial {
                present: SSL_REST_KEY.key(),
                missing: SSL_REST_CERTIFICATE.key(),
            }),
            (Some(certificate), Some(key)) => {
                TlsContext::from_pem_files(Path::new(&certificate), Path::new(&key)).map(Some)
            }
        }
    }
}

impl TlsContext {
    /// Loads a certificate chain and private key from PEM files.
    pub fn from_pem_files(certificate: &Path, key: &Path) -> Result<Self, TlsError> {
        let cert_chain = CertificateDer::pem_file_iter(certificate)
            .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
            .map_err(|source| TlsError::Pem {
                path: certificate.to_path_buf(),
                source,
            })?;

        if cert_chain.is_empty() {
            return Err(TlsError::EmptyCertificateChain(certificate.to_path_buf()));
        }

        let key = PrivateKeyDer::from_pem_file(key).map_err(|source| TlsError::Pem {
            path: key.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            certificate = %certificate.display(),
            chain_len = cert_chain.len(),
            "Loaded TLS key material"
        );

        Ok(Self::new(cert_chain, key))
    }
}

/// Path of a PEM fixture shipped with the crate's tests.
#[cfg(test)]
pub(crate) fn fixture(name: &str) -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
