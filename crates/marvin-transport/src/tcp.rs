//! TCP connector with optional TLS.
//!
//! TLS trust roots are loaded once, when the connector is built: either from a
//! PEM file (for servers with a private CA) or from the platform store.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::{debug, info, warn};

use crate::connection::{Connection, Connector};
use crate::error::{TransportError, TransportResult};

/// Settings for a [`TcpConnector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Whether to wrap the connection in TLS.
    pub tls: bool,
    /// PEM file with the trust root(s) to use instead of the platform store.
    pub cert: Option<PathBuf>,
    /// Upper bound for TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
}

impl TcpConfig {
    /// Creates a plain TCP config.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            cert: None,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Enables TLS with the platform trust store.
    pub fn with_tls(mut self) -> Self {
        self.tls = true;
        self
    }

    /// Enables TLS trusting only the certificates in `path`.
    pub fn with_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls = true;
        self.cert = Some(path.into());
        self
    }

    /// `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct TlsSetup {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

/// Connects over TCP, optionally upgrading to TLS.
pub struct TcpConnector {
    config: TcpConfig,
    tls: Option<TlsSetup>,
}

impl TcpConnector {
    /// Builds a connector, loading TLS trust roots if TLS is enabled.
    ///
    /// Fails with a configuration error for an empty host, an invalid TLS
    /// server name or an unusable certificate file.
    pub fn new(config: TcpConfig) -> TransportResult<Self> {
        if config.host.is_empty() {
            return Err(TransportError::InvalidConfig("host is empty".into()));
        }

        let tls = if config.tls {
            let roots = match &config.cert {
                Some(path) => load_pem_roots(path)?,
                None => load_native_roots(),
            };
            let client_config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let server_name = ServerName::try_from(config.host.clone()).map_err(|e| {
                TransportError::InvalidConfig(format!(
                    "'{}' is not a valid TLS server name: {e}",
                    config.host
                ))
            })?;

            Some(TlsSetup {
                connector: TlsConnector::from(Arc::new(client_config)),
                server_name,
            })
        } else {
            None
        };

        Ok(Self { config, tls })
    }

    /// The configuration this connector was built from.
    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    async fn open(&self) -> TransportResult<Connection> {
        let addr = self.config.addr();
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        if let Err(e) = enable_keepalive(&stream) {
            warn!(error = %e, "Failed to enable TCP keepalive");
        }

        let remote = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.clone());

        match &self.tls {
            Some(tls) => {
                let stream = tls
                    .connector
                    .connect(tls.server_name.clone(), stream)
                    .await
                    .map_err(|source| TransportError::Handshake {
                        addr: addr.clone(),
                        source,
                    })?;
                info!(remote = %remote, "TLS connection established");
                Ok(Connection::from_stream(stream, remote))
            }
            None => {
                info!(remote = %remote, "TCP connection established");
                Ok(Connection::from_stream(stream, remote))
            }
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> TransportResult<Connection> {
        tokio::time::timeout(self.config.connect_timeout, self.open())
            .await
            .map_err(|_| TransportError::Timeout {
                addr: self.config.addr(),
            })?
    }

    fn target(&self) -> String {
        self.config.addr()
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

/// Loads every certificate in a PEM file into a fresh root store.
pub fn load_pem_roots(path: &Path) -> TransportResult<RootCertStore> {
    let cert_error = |reason: String| TransportError::Certificate {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| cert_error(e.to_string()))?;
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        let cert = cert.map_err(|e| cert_error(e.to_string()))?;
        roots.add(cert).map_err(|e| cert_error(e.to_string()))?;
    }

    if roots.is_empty() {
        return Err(cert_error("no certificates found".into()));
    }

    debug!(path = %path.display(), count = roots.len(), "Loaded trust roots");
    Ok(roots)
}

fn load_native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let loaded = rustls_native_certs::load_native_certs();
    for cert in loaded.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "Failed to add platform root certificate");
        }
    }
    for e in &loaded.errors {
        warn!(error = %e, "Error loading platform certificates");
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_empty_host_is_rejected() {
        let err = TcpConnector::new(TcpConfig::new("", 6667)).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_cert_file_is_config_error() {
        let config = TcpConfig::new("irc.example.net", 6697).with_cert("/nonexistent/ca.pem");
        let err = TcpConnector::new(config).err().unwrap();
        assert!(matches!(err, TransportError::Certificate { .. }));
        assert!(err.is_config());
    }

    #[test]
    fn test_pem_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not a certificate").unwrap();

        let err = load_pem_roots(file.path()).unwrap_err();
        assert!(err.to_string().contains("no certificates found"));
    }

    #[test]
    fn test_invalid_server_name_is_rejected() {
        let mut config = TcpConfig::new("not a host name", 6697).with_tls();
        config.connect_timeout = Duration::from_secs(1);
        let err = TcpConnector::new(config).err().unwrap();
        assert!(matches!(err, TransportError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_plain_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = AsyncBufReader::new(stream).lines();
            lines.next_line().await.unwrap()
        });

        let connector = TcpConnector::new(TcpConfig::new("127.0.0.1", port)).unwrap();
        assert_eq!(connector.target(), format!("127.0.0.1:{port}"));

        let mut conn = connector.connect().await.unwrap();
        conn.writer.write_all(b"NICK marvin\r\n").await.unwrap();
        conn.writer.flush().await.unwrap();

        assert_eq!(server.await.unwrap().as_deref(), Some("NICK marvin"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_not_config_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = TcpConnector::new(TcpConfig::new("127.0.0.1", port)).unwrap();
        let err = connector.connect().await.unwrap_err();
        assert!(!err.is_config());
    }
}
