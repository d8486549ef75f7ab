//! Registry of the configuration options consumed by the endpoint assembler.
//!
//! Each `ConfigOption` names its primary key, an optional default value and any
//! deprecated keys that are still honored. Lookups go through
//! [`ConfigSource`](crate::config::ConfigSource), which resolves the primary key
//! first, then deprecated keys in order, then the default.

use crate::tls::DEFAULT_SSL_PROTOCOLS;

/// Descriptor for a single configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOption {
    key: &'static str,
    default: Option<&'static str>,
    deprecated_keys: &'static [&'static str],
}

impl ConfigOption {
    /// Creates an option without a default value or deprecated keys.
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            default: None,
            deprecated_keys: &[],
        }
    }

    pub const fn with_default(self, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    /// Older keys consulted, in order, when the primary key is absent.
    pub const fn with_deprecated_keys(self, deprecated_keys: &'static [&'static str]) -> Self {
        Self {
            deprecated_keys,
            ..self
        }
    }

    pub const fn key(&self) -> &'static str {
        self.key
    }

    pub const fn default_value(&self) -> Option<&'static str> {
        self.default
    }

    pub const fn deprecated_keys(&self) -> &'static [&'static str] {
        self.deprecated_keys
    }
}

// =============================================================================
// REST endpoint
// =============================================================================

/// Address that clients use to reach the REST endpoint.
pub const REST_ADDRESS: ConfigOption = ConfigOption::new("rest.address");

/// Local address the endpoint binds to. Absent means all interfaces.
pub const REST_BIND_ADDRESS: ConfigOption = ConfigOption::new("rest.bind-address");

/// Port the endpoint listens on.
pub const REST_PORT: ConfigOption = ConfigOption::new("rest.port").with_deprecated_keys(&["web.port"]);

/// Maximum size in bytes of a request or response body.
pub const REST_SERVER_MAX_CONTENT_LENGTH: ConfigOption =
    ConfigOption::new("rest.server.max-content-length");

// =============================================================================
// Security
// =============================================================================

/// Turns TLS on for the REST endpoint.
pub const SSL_ENABLED: ConfigOption = ConfigOption::new("security.ssl.enabled").with_default("false");

/// Comma-separated TLS protocol versions, e.g. `TLSv1.2,TLSv1.3`.
pub const SSL_PROTOCOL: ConfigOption =
    ConfigOption::new("security.ssl.protocol").with_default(DEFAULT_SSL_PROTOCOLS);

/// Comma-separated IANA cipher suite names. Empty keeps every suite of the provider.
pub const SSL_ALGORITHMS: ConfigOption = ConfigOption::new("security.ssl.algorithms").with_default("");

/// PEM file holding the server certificate chain.
pub const SSL_REST_CERTIFICATE: ConfigOption = ConfigOption::new("security.ssl.rest.certificate");

/// PEM file holding the server private key.
pub const SSL_REST_KEY: ConfigOption = ConfigOption::new("security.ssl.rest.key");

// =============================================================================
// Web
// =============================================================================

/// Base directory for multipart upload staging.
pub const UPLOAD_DIR: ConfigOption =
    ConfigOption::new("web.upload.dir").with_deprecated_keys(&["jobmanager.web.upload.dir"]);

/// Temporary directory, used for uploads when `web.upload.dir` is not set.
pub const TMP_DIR: ConfigOption =
    ConfigOption::new("web.tmpdir").with_deprecated_keys(&["jobmanager.web.tmpdir"]);

/// Value of the `Access-Control-Allow-Origin` response header.
pub const ACCESS_CONTROL_ALLOW_ORIGIN: ConfigOption = ConfigOption::new("web.access-control-allow-origin")
    .with_default("*")
    .with_deprecated_keys(&["jobmanager.web.access-control-allow-origin"]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_earlier_fields() {
        assert_eq!(ACCESS_CONTROL_ALLOW_ORIGIN.key(), "web.access-control-allow-origin");
        assert_eq!(ACCESS_CONTROL_ALLOW_ORIGIN.default_value(), Some("*"));
        assert_eq!(
            ACCESS_CONTROL_ALLOW_ORIGIN.deprecated_keys(),
            &["jobmanager.web.access-control-allow-origin"]
        );
    }

    #[test]
    fn test_required_options_have_no_default() {
        for option in [REST_ADDRESS, REST_PORT, REST_SERVER_MAX_CONTENT_LENGTH, TMP_DIR] {
            assert_eq!(option.default_value(), None, "{} should be required", option.key());
        }
    }
}
