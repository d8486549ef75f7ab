//! Protocol/cipher restrictions and the server-side TLS engine.

use std::sync::Arc;

use const_format::formatcp;
use rustls::crypto::CryptoProvider;
use rustls::{
    Connection, ProtocolVersion, ServerConfig, ServerConnection, SupportedCipherSuite,
    SupportedProtocolVersion,
};

use super::{TlsContext, TlsError};
use crate::config::ConfigSource;
use crate::options::{SSL_ALGORITHMS, SSL_PROTOCOL};

pub const TLS12: &str = "TLSv1.2";
pub const TLS13: &str = "TLSv1.3";

/// Protocol versions enabled when `security.ssl.protocol` is not set
pub const DEFAULT_SSL_PROTOCOLS: &str = formatcp!("{},{}", TLS12, TLS13);

/// Protocol versions and cipher suites an engine may negotiate.
#[derive(Debug, Clone)]
pub struct TlsRestrictions {
    versions: Vec<&'static SupportedProtocolVersion>,
    /// Requested IANA suite names. Empty allows every suite of the provider.
    cipher_suites: Vec<String>,
}

impl TlsRestrictions {
    pub fn new<P, C>(protocols: P, cipher_suites: C) -> Result<Self, TlsError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let mut versions: Vec<&'static SupportedProtocolVersion> = Vec::new();
        for name in protocols {
            let version = parse_protocol(name.as_ref())?;
            if !versions.iter().any(|v| v.version == version.version) {
                versions.push(version);
            }
        }

        if versions.is_empty() {
            versions = vec![&rustls::version::TLS12, &rustls::version::TLS13];
        }

        Ok(Self {
            versions,
            cipher_suites: cipher_suites.into_iter().map(Into::into).collect(),
        })
    }

    /// Reads `security.ssl.protocol` and `security.ssl.algorithms`.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, TlsError> {
        let protocols = source.get_optional_string(&SSL_PROTOCOL).unwrap_or_default();
        let algorithms = source.get_optional_string(&SSL_ALGORITHMS).unwrap_or_default();

        Self::new(split_list(&protocols), split_list(&algorithms))
    }

    pub fn protocol_names(&self) -> Vec<&'static str> {
        self.versions.iter().map(|v| protocol_name(v)).collect()
    }

    fn allows_version(&self, version: &SupportedProtocolVersion) -> bool {
        self.versions.iter().any(|v| v.version == version.version)
    }

    fn allows_suite(&self, suite: &SupportedCipherSuite) -> bool {
        if !self.allows_version(suite.version()) {
            return false;
        }
        if self.cipher_suites.is_empty() {
            return true;
        }
        let name = suite_name(suite);
        self.cipher_suites.iter().any(|n| n.eq_ignore_ascii_case(&name))
    }

    /// Returns a copy of `provider` that only offers the allowed suites.
    pub fn restrict(&self, provider: &CryptoProvider) -> Result<CryptoProvider, TlsError> {
        for requested in &self.cipher_suites {
            let known = provider
                .cipher_suites
                .iter()
                .any(|s| suite_name(s).eq_ignore_ascii_case(requested));
            if !known {
                return Err(TlsError::UnsupportedCipherSuite(requested.clone()));
            }
        }

        let cipher_suites: Vec<SupportedCipherSuite> = provider
            .cipher_suites
            .iter()
            .copied()
            .filter(|s| self.allows_suite(s))
            .collect();

        if cipher_suites.is_empty() {
            return Err(TlsError::NoUsableCipherSuite(self.protocol_names().join(",")));
        }

        Ok(CryptoProvider {
            cipher_suites,
            ..provider.clone()
        })
    }
}

impl Default for TlsRestrictions {
    fn default() -> Self {
        Self {
            versions: vec![&rustls::version::TLS12, &rustls::version::TLS13],
            cipher_suites: Vec::new(),
        }
    }
}

/// Server-side TLS session that has not started its handshake.
///
/// The wrapped connection is always the server side; an engine is never
/// created in client mode.
pub struct TlsEngine {
    connection: Connection,
    protocols: Vec<&'static str>,
    cipher_suites: Vec<String>,
}

impl TlsEngine {
    pub(super) fn new(context: &TlsContext, restrictions: &TlsRestrictions) -> Result<Self, TlsError> {
        let provider = restrictions.restrict(&context.provider)?;
        let cipher_suites = provider.cipher_suites.iter().map(suite_name).collect();

        let config = ServerConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&restrictions.versions)?
            .with_no_client_auth()
            .with_single_cert(context.cert_chain.clone(), context.key.clone_key())?;

        let connection = ServerConnection::new(Arc::new(config))?;

        Ok(Self {
            connection: Connection::Server(connection),
            protocols: restrictions.protocol_names(),
            cipher_suites,
        })
    }

    pub fn is_server_mode(&self) -> bool {
        matches!(self.connection, Connection::Server(_))
    }

    /// True until the engine has been driven through a handshake.
    pub fn is_handshaking(&self) -> bool {
        match &self.connection {
            Connection::Server(conn) => conn.is_handshaking(),
            Connection::Client(conn) => conn.is_handshaking(),
        }
    }

    pub fn protocols(&self) -> &[&'static str] {
        &self.protocols
    }

    /// IANA names of the cipher suites this engine may negotiate.
    pub fn cipher_suites(&self) -> &[String] {
        &self.cipher_suites
    }

    /// Hands the connection to the server that will drive the handshake.
    pub fn into_connection(self) -> Connection {
        self.connection
    }
}

impl std::fmt::Debug for TlsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsEngine")
            .field("server_mode", &self.is_server_mode())
            .field("handshaking", &self.is_handshaking())
            .field("protocols", &self.protocols)
            .field("cipher_suites", &self.cipher_suites)
            .finish()
    }
}

fn parse_protocol(name: &str) -> Result<&'static SupportedProtocolVersion, TlsError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "tlsv1.2" | "tls1.2" => Ok(&rustls::version::TLS12),
        "tlsv1.3" | "tls1.3" => Ok(&rustls::version::TLS13),
        _ => Err(TlsError::UnsupportedProtocol(name.to_string())),
    }
}

fn protocol_name(version: &SupportedProtocolVersion) -> &'static str {
    if version.version == ProtocolVersion::TLSv1_3 {
        TLS13
    } else {
        TLS12
    }
}

fn suite_name(suite: &SupportedCipherSuite) -> String {
    format!("{:?}", suite.suite())
}

fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    fn provider() -> CryptoProvider {
        rustls::crypto::aws_lc_rs::default_provider()
    }

    #[test]
    fn test_default_restrictions_enable_both_versions() {
        let restrictions = TlsRestrictions::from_source(&Configuration::new()).unwrap();
        assert_eq!(restrictions.protocol_names(), vec![TLS12, TLS13]);
        assert_eq!(DEFAULT_SSL_PROTOCOLS, "TLSv1.2,TLSv1.3");
    }

    #[test]
    fn test_default_restrictions_keep_all_suites() {
        let provider = provider();
        let restricted = TlsRestrictions::default().restrict(&provider).unwrap();
        assert_eq!(restricted.cipher_suites.len(), provider.cipher_suites.len());
    }

    #[test]
    fn test_protocol_names_are_case_insensitive_and_deduplicated() {
        let restrictions = TlsRestrictions::new(["tlsv1.3", "TLSv1.3"], Vec::<String>::new()).unwrap();
        assert_eq!(restrictions.protocol_names(), vec![TLS13]);
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let config = Configuration::new().with("security.ssl.protocol", "SSLv3");
        let err = TlsRestrictions::from_source(&config).unwrap_err();
        assert!(matches!(err, TlsError::UnsupportedProtocol(ref p) if p == "SSLv3"));
    }

    #[test]
    fn test_tls13_only_drops_tls12_suites() {
        let restrictions = TlsRestrictions::new([TLS13], Vec::<String>::new()).unwrap();
        let restricted = restrictions.restrict(&provider()).unwrap();
        assert!(!restricted.cipher_suites.is_empty());
        assert!(restricted
            .cipher_suites
            .iter()
            .all(|s| s.version().version == ProtocolVersion::TLSv1_3));
    }

    #[test]
    fn test_named_suite_is_the_only_one_kept() {
        let config = Configuration::new()
            .with("security.ssl.protocol", "TLSv1.3")
            .with("security.ssl.algorithms", "TLS13_AES_128_GCM_SHA256");
        let restricted = TlsRestrictions::from_source(&config)
            .unwrap()
            .restrict(&provider())
            .unwrap();
        let names: Vec<String> = restricted.cipher_suites.iter().map(suite_name).collect();
        assert_eq!(names, vec!["TLS13_AES_128_GCM_SHA256".to_string()]);
    }

    #[test]
    fn test_unknown_suite_is_rejected() {
        let restrictions =
            TlsRestrictions::new([TLS12], ["TLS_RSA_WITH_AES_128_CBC_SHA".to_string()]).unwrap();
        let err = restrictions.restrict(&provider()).unwrap_err();
        assert!(matches!(err, TlsError::UnsupportedCipherSuite(ref s) if s == "TLS_RSA_WITH_AES_128_CBC_SHA"));
    }

    #[test]
    fn test_suites_from_other_version_leave_nothing_usable() {
        let restrictions =
            TlsRestrictions::new([TLS12], ["TLS13_AES_256_GCM_SHA384".to_string()]).unwrap();
        let err = restrictions.restrict(&provider()).unwrap_err();
        assert!(matches!(err, TlsError::NoUsableCipherSuite(ref v) if v == TLS12));
    }

    #[test]
    fn test_split_list_ignores_blanks() {
        assert_eq!(split_list(" a, ,b ,"), vec!["a", "b"]);
        assert!(split_list("").is_empty());
    }
}
