//! End-to-end assembly from TOML files on disk.
//!
//! Run with: cargo test --test assemble

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use endpoint_config::{ConfigError, Configuration, EndpointConfig, TlsError};
use tempfile::NamedTempFile;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Writes `contents` to a temporary TOML file and loads it.
fn load(contents: &str) -> Configuration {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write config");
    Configuration::load(file.path()).expect("Failed to load config")
}

const PLAIN: &str = r#"
[rest]
address = "10.0.0.1"
port = 8081

[rest.server]
max-content-length = 104857600

[web]
upload.dir = "/tmp"
"#;

#[test]
fn test_plain_endpoint_from_file() {
    let endpoint = EndpointConfig::from_configuration(&load(PLAIN)).unwrap();

    assert_eq!(endpoint.address(), "10.0.0.1");
    assert_eq!(endpoint.bind_port(), 8081);
    assert_eq!(endpoint.max_content_length(), 104_857_600);
    assert!(endpoint.tls_engine().is_none());
    assert!(endpoint
        .upload_dir()
        .to_str()
        .unwrap()
        .starts_with("/tmp/flink-web-upload-"));
    assert_eq!(
        endpoint.response_headers().get("access-control-allow-origin"),
        Some("*")
    );
}

#[test]
fn test_upload_dir_is_not_created() {
    let base = tempfile::tempdir().unwrap();
    let config = load(PLAIN).with("web.upload.dir", base.path().display());

    let endpoint = EndpointConfig::from_configuration(&config).unwrap();

    assert_eq!(endpoint.upload_dir().parent(), Some(base.path()));
    assert!(!endpoint.upload_dir().exists());
}

#[test]
fn test_concurrent_assemblies_never_share_upload_dir() {
    let config = Arc::new(load(PLAIN));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let config = Arc::clone(&config);
            thread::spawn(move || {
                (0..16)
                    .map(|_| {
                        EndpointConfig::from_configuration(config.as_ref())
                            .unwrap()
                            .upload_dir()
                            .to_path_buf()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for dir in handle.join().unwrap() {
            assert!(seen.insert(dir.clone()), "duplicate upload dir {}", dir.display());
        }
    }
    assert_eq!(seen.len(), 8 * 16);
}

#[test]
fn test_tls_endpoint_from_pem_files() {
    let contents = format!(
        r#"{PLAIN}
[security.ssl]
enabled = true
protocol = ["TLSv1.3"]

[security.ssl.rest]
certificate = "{}"
key = "{}"
"#,
        fixture("cert.pem").display(),
        fixture("key.pem").display(),
    );

    let endpoint = EndpointConfig::from_configuration(&load(&contents)).unwrap();
    let engine = endpoint.tls_engine().expect("TLS engine should be present");

    assert!(engine.is_server_mode());
    assert!(engine.is_handshaking());
    assert_eq!(engine.protocols(), &["TLSv1.3"]);
    assert!(engine
        .cipher_suites()
        .iter()
        .all(|suite| suite.starts_with("TLS13_")));
}

#[test]
fn test_tls_disabled_ignores_broken_key_material() {
    let config = load(PLAIN)
        .with("security.ssl.enabled", false)
        .with("security.ssl.rest.certificate", "/nonexistent/cert.pem");

    let endpoint = EndpointConfig::from_configuration(&config).unwrap();
    assert!(endpoint.tls_engine().is_none());
}

#[test]
fn test_tls_enabled_without_key_material_runs_plain() {
    let config = load(PLAIN).with("security.ssl.enabled", true);

    let endpoint = EndpointConfig::from_configuration(&config).unwrap();
    assert!(endpoint.tls_engine().is_none());
}

#[test]
fn test_unreadable_certificate_is_config_error() {
    let config = load(PLAIN)
        .with("security.ssl.enabled", true)
        .with("security.ssl.rest.certificate", "/nonexistent/cert.pem")
        .with("security.ssl.rest.key", fixture("key.pem").display());

    let err = EndpointConfig::from_configuration(&config).unwrap_err();
    assert!(matches!(err, ConfigError::Tls(TlsError::Pem { .. })));
    assert_eq!(
        err.to_string(),
        "Failed to initialize TLS context for REST server endpoint"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Configuration::load("/nonexistent/endpoint.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_deprecated_keys_still_configure_endpoint() {
    let config = load(
        r#"
        rest.address = "localhost"
        web.port = 9090
        rest.server.max-content-length = 1024
        jobmanager.web.tmpdir = "/var/tmp"
        jobmanager.web.access-control-allow-origin = "https://dashboard.example"
        "#,
    );

    let endpoint = EndpointConfig::from_configuration(&config).unwrap();
    assert_eq!(endpoint.bind_port(), 9090);
    assert_eq!(endpoint.upload_dir().parent(), Some(Path::new("/var/tmp")));
    assert_eq!(
        endpoint.response_headers().get("access-control-allow-origin"),
        Some("https://dashboard.example")
    );
}
