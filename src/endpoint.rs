//! REST endpoint configuration and its assembler.
//!
//! `ConfigAssembler` reads every setting the endpoint needs from a
//! [`ConfigSource`], builds the optional TLS engine and hands back an
//! immutable [`EndpointConfig`]. Missing or malformed settings are reported as
//! [`ConfigError`]s. Values that a well-formed configuration can never produce
//! (a port outside `0..65536`, a non-positive content length) abort with a
//! panic in [`EndpointConfig::new`].

use std::path::{Path, PathBuf};

use http::header::ACCESS_CONTROL_ALLOW_ORIGIN as ACCESS_CONTROL_ALLOW_ORIGIN_HEADER;
use uuid::Uuid;

use crate::config::{ConfigError, ConfigSource};
use crate::headers::ResponseHeaders;
use crate::options::{
    ACCESS_CONTROL_ALLOW_ORIGIN, REST_ADDRESS, REST_BIND_ADDRESS, REST_PORT,
    REST_SERVER_MAX_CONTENT_LENGTH, SSL_ENABLED, TMP_DIR, UPLOAD_DIR,
};
use crate::tls::{PemTlsContextFactory, TlsContextFactory, TlsEngine, TlsError, TlsRestrictions};

/// Prefix of the per-endpoint upload staging directory
pub const UPLOAD_DIR_PREFIX: &str = "flink-web-upload-";

/// Validated settings for one REST server endpoint.
#[derive(Debug)]
pub struct EndpointConfig {
    address: String,
    bind_address: Option<String>,
    bind_port: u16,
    tls_engine: Option<TlsEngine>,
    upload_dir: PathBuf,
    max_content_length: usize,
    response_headers: ResponseHeaders,
}

impl EndpointConfig {
    /// # Panics
    ///
    /// If `bind_port` is outside `0..65536`, `max_content_length` is not
    /// positive or does not fit in `usize`, or `address` or `upload_dir` is
    /// empty.
    pub fn new(
        address: String,
        bind_address: Option<String>,
        bind_port: i64,
        tls_engine: Option<TlsEngine>,
        upload_dir: PathBuf,
        max_content_length: i64,
        response_headers: ResponseHeaders,
    ) -> Self {
        assert!(
            (0..65536).contains(&bind_port),
            "The bind rest port {bind_port} is out of range [0, 65536)"
        );
        assert!(
            max_content_length > 0,
            "max_content_length must be positive, was: {max_content_length}"
        );
        assert!(!address.is_empty(), "rest address must not be empty");
        assert!(
            !upload_dir.as_os_str().is_empty(),
            "upload directory must not be empty"
        );

        let max_content_length = usize::try_from(max_content_length).unwrap_or_else(|_| {
            panic!("max_content_length {max_content_length} does not fit in usize")
        });

        Self {
            address,
            bind_address,
            bind_port: bind_port as u16,
            tls_engine,
            upload_dir,
            max_content_length,
            response_headers,
        }
    }

    /// Assembles a configuration using PEM files for TLS key material.
    pub fn from_configuration(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        ConfigAssembler::new().assemble(source)
    }

    /// Address clients use to reach the endpoint.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Address to bind to. `None` binds all interfaces.
    pub fn bind_address(&self) -> Option<&str> {
        self.bind_address.as_deref()
    }

    pub fn bind_port(&self) -> u16 {
        self.bind_port
    }

    /// Server-side TLS engine, or `None` when TLS is off or unavailable.
    pub fn tls_engine(&self) -> Option<&TlsEngine> {
        self.tls_engine.as_ref()
    }

    /// Directory for temporarily storing multipart/form-data uploads.
    ///
    /// Only the path is computed; whoever uses it creates and removes it.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }

    /// Headers added to every HTTP response.
    pub fn response_headers(&self) -> &ResponseHeaders {
        &self.response_headers
    }
}

/// Builds [`EndpointConfig`]s from raw configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigAssembler<F = PemTlsContextFactory> {
    tls_factory: F,
}

impl ConfigAssembler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: TlsContextFactory> ConfigAssembler<F> {
    pub fn with_tls_factory(tls_factory: F) -> Self {
        Self { tls_factory }
    }

    pub fn assemble(&self, source: &dyn ConfigSource) -> Result<EndpointConfig, ConfigError> {
        let address = source.get_string(&REST_ADDRESS)?;
        if address.trim().is_empty() {
            return Err(ConfigError::invalid(REST_ADDRESS.key(), &address, "must not be empty"));
        }
        let bind_address = source.get_optional_string(&REST_BIND_ADDRESS);
        let port = source.get_integer(&REST_PORT)?;

        let tls_engine = if source.get_bool(&SSL_ENABLED)? {
            self.create_tls_engine(source)?
        } else {
            None
        };

        let upload_dir = upload_dir(source)?;
        let max_content_length = source.get_integer(&REST_SERVER_MAX_CONTENT_LENGTH)?;
        let response_headers = response_headers(source)?;

        let config = EndpointConfig::new(
            address,
            bind_address,
            port,
            tls_engine,
            upload_dir,
            max_content_length,
            response_headers,
        );

        tracing::debug!(
            address = %config.address(),
            bind_address = ?config.bind_address(),
            port = config.bind_port(),
            tls = config.tls_engine().is_some(),
            upload_dir = %config.upload_dir().display(),
            "Assembled REST endpoint configuration"
        );

        Ok(config)
    }

    fn create_tls_engine(&self, source: &dyn ConfigSource) -> Result<Option<TlsEngine>, TlsError> {
        let Some(context) = self.tls_factory.create_server_context(source)? else {
            tracing::warn!(
                "TLS is enabled but no TLS context is available, REST endpoint will run without TLS"
            );
            return Ok(None);
        };

        let restrictions = TlsRestrictions::from_source(source)?;
        let engine = context.create_engine(&restrictions)?;

        tracing::info!(
            protocols = ?engine.protocols(),
            cipher_suites = engine.cipher_suites().len(),
            "Created TLS engine for REST endpoint"
        );

        Ok(Some(engine))
    }
}

/// Base directory from `web.upload.dir`, else `web.tmpdir`, plus a random suffix.
fn upload_dir(source: &dyn ConfigSource) -> Result<PathBuf, ConfigError> {
    let base = match source.get_optional_string(&UPLOAD_DIR) {
        Some(dir) => dir,
        None => source.get_string(&TMP_DIR)?,
    };

    Ok(Path::new(&base).join(format!("{UPLOAD_DIR_PREFIX}{}", Uuid::new_v4())))
}

fn response_headers(source: &dyn ConfigSource) -> Result<ResponseHeaders, ConfigError> {
    let allow_origin = source.get_string(&ACCESS_CONTROL_ALLOW_ORIGIN)?;

    let headers = ResponseHeaders::builder()
        .header(ACCESS_CONTROL_ALLOW_ORIGIN_HEADER, &allow_origin)
        .map_err(|e| {
            ConfigError::invalid(ACCESS_CONTROL_ALLOW_ORIGIN.key(), &allow_origin, e.to_string())
        })?
        .build();

    Ok(headers)
}
