use super::transport::{LogConnection, Route, TransportError, open_stream};
use async_trait::async_trait;
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, warn};

/// Route option naming a PEM bundle of additional trusted CAs.
pub const CA_FILE_OPTION: &str = "ca_file";

/// Client configuration trusting the platform roots plus the certificates in
/// `ca_file`, if any.
pub fn client_config(ca_file: Option<&Path>) -> Result<ClientConfig, String> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        warn!("Could not load a platform root certificate: {}", error);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("Loaded {} platform root certificate(s), ignored {}", added, ignored);

    if let Some(path) = ca_file {
        let certs = load_certs(path)
            .map_err(|e| format!("could not read CA file {}: {e}", path.display()))?;
        if certs.is_empty() {
            return Err(format!("no certificate found in {}", path.display()));
        }
        for cert in certs {
            roots
                .add(cert)
                .map_err(|e| format!("invalid CA certificate in {}: {e}", path.display()))?;
        }
    }

    if roots.is_empty() {
        return Err("no trusted root certificate available".to_string());
    }

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| e.to_string())?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(config)
}

fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::certs(&mut reader).collect()
}

/// TCP stream wrapped in TLS, for Logstash `tcp` inputs with `ssl_enabled`.
pub struct TlsConnection {
    connector: TlsConnector,
    server_name: ServerName<'static>,
    address: String,
    nodelay: bool,
    stream: TlsStream<TcpStream>,
}

impl TlsConnection {
    pub async fn connect(route: &Route) -> Result<Self, TransportError> {
        let tls_error = |reason: String| TransportError::TlsConfig {
            route: route.to_string(),
            reason,
        };

        let ca_file = route.option(CA_FILE_OPTION).map(Path::new);
        let config = client_config(ca_file).map_err(tls_error)?;
        let server_name = ServerName::try_from(route.host.as_str())
            .map_err(|e| tls_error(e.to_string()))?
            .to_owned();
        let connector = TlsConnector::from(Arc::new(config));
        let nodelay = route.flag("nodelay");

        let stream = handshake(&connector, &server_name, &route.address, nodelay)
            .await
            .map_err(|source| TransportError::DialFailed {
                address: route.address.clone(),
                transport: route.transport,
                source,
            })?;

        Ok(Self {
            connector,
            server_name,
            address: route.address.clone(),
            nodelay,
            stream,
        })
    }
}

async fn handshake(
    connector: &TlsConnector,
    server_name: &ServerName<'static>,
    address: &str,
    nodelay: bool,
) -> io::Result<TlsStream<TcpStream>> {
    let tcp = open_stream(address, nodelay).await?;
    connector.connect(server_name.clone(), tcp).await
}

#[async_trait]
impl LogConnection for TlsConnection {
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write_all(buf).await?;
        self.stream.flush().await?;
        Ok(buf.len())
    }

    async fn reconnect(&mut self) -> io::Result<()> {
        self.stream =
            handshake(&self.connector, &self.server_name, &self.address, self.nodelay).await?;
        debug!("Reconnected to {} over tls", self.address);
        Ok(())
    }
}

impl std::fmt::Debug for TlsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnection")
            .field("server_name", &self.server_name)
            .field("address", &self.address)
            .field("nodelay", &self.nodelay)
            .finish()
    }
}
