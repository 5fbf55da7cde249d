use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use url::{Host, Url};

use super::tls::TlsConnection;

pub const ADAPTER_NAME: &str = "logstash";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid route '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },
    #[error("unable to find adapter: {0}")]
    UnknownAdapter(String),
    #[error("unable to find transport: {0}")]
    UnknownTransport(String),
    #[error("TLS setup for {route} failed: {reason}")]
    TlsConfig { route: String, reason: String },
    #[error("Dial to {address} over {transport} failed: {source}")]
    DialFailed {
        address: String,
        transport: Transport,
        #[source]
        source: io::Error,
    },
}

/// Network mechanism used to reach a Logstash input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Udp,
    Tcp,
    Tls,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Tls => "tls",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            "tls" => Ok(Transport::Tls),
            _ => Err(TransportError::UnknownTransport(s.to_string())),
        }
    }
}

/// A configured destination: one adapter instance forwards to one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub adapter: String,
    pub transport: Transport,
    /// Host without IPv6 brackets; the TLS server name.
    pub host: String,
    /// `host:port`
    pub address: String,
    pub options: HashMap<String, String>,
}

impl Route {
    /// Parse `logstash[+transport]://host:port[?key=value...]`.
    pub fn parse(uri: &str) -> Result<Self, TransportError> {
        let invalid = |reason: String| TransportError::InvalidRoute {
            route: uri.to_string(),
            reason,
        };

        let url = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;

        let (adapter, transport) = match url.scheme().split_once('+') {
            Some((adapter, transport)) => (adapter, transport.parse::<Transport>()?),
            None => (url.scheme(), Transport::default()),
        };

        if adapter != ADAPTER_NAME {
            return Err(TransportError::UnknownAdapter(adapter.to_string()));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            _ => return Err(invalid("missing host".to_string())),
        };
        let authority = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let port = url
            .port()
            .ok_or_else(|| invalid("missing port".to_string()))?;

        let options = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(Self {
            adapter: adapter.to_string(),
            transport,
            address: format!("{authority}:{port}"),
            host,
            options,
        })
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub(crate) fn flag(&self, key: &str) -> bool {
        matches!(self.option(key), Some("true" | "1" | "yes"))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}://{}", self.adapter, self.transport, self.address)
    }
}

/// Established connection to a Logstash input.
#[async_trait]
pub trait LogConnection: Send {
    /// Write `buf` as one unit: one datagram for UDP, the whole buffer for
    /// stream transports.
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Re-establish a broken stream before a retry. Datagram transports have
    /// nothing to re-establish.
    async fn reconnect(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<C: LogConnection + ?Sized> LogConnection for Box<C> {
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf).await
    }

    async fn reconnect(&mut self) -> io::Result<()> {
        (**self).reconnect().await
    }
}

#[derive(Debug)]
pub struct UdpConnection {
    socket: UdpSocket,
}

impl UdpConnection {
    pub async fn connect(address: &str) -> io::Result<Self> {
        let remote = tokio::net::lookup_host(address)
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "address did not resolve"))?;

        let local = if remote.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl LogConnection for UdpConnection {
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send(buf).await
    }
}

#[derive(Debug)]
pub struct TcpConnection {
    address: String,
    nodelay: bool,
    stream: TcpStream,
}

impl TcpConnection {
    pub async fn connect(address: &str, nodelay: bool) -> io::Result<Self> {
        let stream = open_stream(address, nodelay).await?;
        Ok(Self {
            address: address.to_string(),
            nodelay,
            stream,
        })
    }
}

pub(crate) async fn open_stream(address: &str, nodelay: bool) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(nodelay)?;
    Ok(stream)
}

#[async_trait]
impl LogConnection for TcpConnection {
    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write_all(buf).await?;
        Ok(buf.len())
    }

    async fn reconnect(&mut self) -> io::Result<()> {
        self.stream = open_stream(&self.address, self.nodelay).await?;
        tracing::debug!("Reconnected to {}", self.address);
        Ok(())
    }
}

/// Establish the connection for `route`.
pub async fn dial(route: &Route) -> Result<Box<dyn LogConnection>, TransportError> {
    let dial_failed = |source| TransportError::DialFailed {
        address: route.address.clone(),
        transport: route.transport,
        source,
    };

    let connection: Box<dyn LogConnection> = match route.transport {
        Transport::Udp => Box::new(
            UdpConnection::connect(&route.address)
                .await
                .map_err(dial_failed)?,
        ),
        Transport::Tcp => Box::new(
            TcpConnection::connect(&route.address, route.flag("nodelay"))
                .await
                .map_err(dial_failed)?,
        ),
        Transport::Tls => Box::new(TlsConnection::connect(route).await?),
    };

    tracing::info!("Connected to {}", route);
    Ok(connection)
}
