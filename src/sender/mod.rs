pub mod stats;
pub mod tls;
pub mod transport;
pub mod writer;

pub use stats::{WriterStats, WriterStatsSnapshot};
pub use tls::{CA_FILE_OPTION, TlsConnection};
pub use transport::{
    LogConnection, Route, TcpConnection, Transport, TransportError, UdpConnection, dial,
};
pub use writer::{TransportWriter, WriteError, WriteFailurePolicy};
