//! Transport acquisition.
//!
//! [`DuplexStream`] is a blanket marker over anything `AsyncRead + AsyncWrite
//! + Unpin + Send`, so `Connection` can hold a `Box<dyn DuplexStream>` without
//! a concrete per-transport enum (the reference stack's sync `Stream` enum is
//! not reusable here because async transports cannot be matched on
//! synchronously). [`SocketFactory`] is the seam the Router calls through;
//! tests substitute a scripted factory instead of opening real sockets.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::opts::Endpoint;

/// Anything the codec can be framed over. Implemented for every
/// `AsyncRead + AsyncWrite + Unpin + Send` type via the blanket impl below,
/// so `TcpStream`, `tokio_native_tls::TlsStream<TcpStream>`, and test doubles
/// all qualify without any wrapper enum.
pub trait DuplexStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Acquires a duplex transport for one [`Endpoint`]. The default
/// implementation dials TCP; test doubles implement this to return an
/// in-memory stream or a scripted failure without touching the network.
#[async_trait]
pub trait SocketFactory: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DuplexStream>>;
}

/// The production [`SocketFactory`]: plain TCP, one attempt per call.
/// Connection pooling and retry live in the Router, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpSocketFactory;

#[async_trait]
impl SocketFactory for TcpSocketFactory {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DuplexStream>> {
        let addr = (endpoint.host.as_str(), endpoint.port);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| Error::TransportError {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source,
            })?;
        stream
            .set_nodelay(true)
            .map_err(|source| Error::TransportError {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source,
            })?;
        Ok(Box::new(stream))
    }
}
