//! Shared scaffolding for the end-to-end connection-lifecycle scenarios: an
//! in-memory scripted duplex stream standing in for a mocked `socketFactory`,
//! plus a couple of canned frame scripts.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mysqlx_core::constant::MessageType;
use mysqlx_core::error::{Error, Result};
use mysqlx_core::opts::Endpoint;
use mysqlx_core::protocol::control::{encode_capabilities, CapabilityValue, Capabilities};
use mysqlx_core::protocol::frame;
use mysqlx_core::socket::{DuplexStream, SocketFactory};

/// A duplex stream whose read side is a fixed byte script and whose write
/// side is captured for later inspection.
pub struct ScriptedStream {
    to_client: VecDeque<u8>,
    from_client: Arc<Mutex<Vec<u8>>>,
    shutdown_count: Arc<AtomicUsize>,
}

impl ScriptedStream {
    pub fn new(to_client: Vec<u8>, shutdown_count: Arc<AtomicUsize>) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                to_client: VecDeque::from(to_client),
                from_client: captured.clone(),
                shutdown_count,
            },
            captured,
        )
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let n = buf.remaining().min(self.to_client.len());
        for _ in 0..n {
            if let Some(byte) = self.to_client.pop_front() {
                buf.put_slice(&[byte]);
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.from_client.lock().expect("lock").extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shutdown_count.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// A `SocketFactory` whose behavior per endpoint is fixed ahead of time:
/// either hand back a scripted stream or fail with a chosen error. Every
/// `ScriptedStream` it hands out shares one shutdown counter, retrievable via
/// `shutdown_count()`, so a test can assert how many times the write side
/// was actually half-closed.
pub struct ScriptedFactory {
    outcomes: Mutex<std::collections::HashMap<(String, u16), Outcome>>,
    shutdown_count: Arc<AtomicUsize>,
}

enum Outcome {
    Stream(Vec<u8>),
    TransientError,
    NonTransientError,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(std::collections::HashMap::new()),
            shutdown_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn shutdown_count(&self) -> Arc<AtomicUsize> {
        self.shutdown_count.clone()
    }

    pub fn with_stream(self, host: &str, port: u16, script: Vec<u8>) -> Self {
        self.outcomes
            .lock()
            .expect("lock")
            .insert((host.to_string(), port), Outcome::Stream(script));
        self
    }

    pub fn with_transient_error(self, host: &str, port: u16) -> Self {
        self.outcomes
            .lock()
            .expect("lock")
            .insert((host.to_string(), port), Outcome::TransientError);
        self
    }

    pub fn with_non_transient_error(self, host: &str, port: u16) -> Self {
        self.outcomes
            .lock()
            .expect("lock")
            .insert((host.to_string(), port), Outcome::NonTransientError);
        self
    }
}

#[async_trait]
impl SocketFactory for ScriptedFactory {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn DuplexStream>> {
        let key = (endpoint.host.clone(), endpoint.port);
        let outcome = self.outcomes.lock().expect("lock");
        match outcome.get(&key) {
            Some(Outcome::Stream(script)) => {
                let (stream, _captured) = ScriptedStream::new(script.clone(), self.shutdown_count.clone());
                Ok(Box::new(stream))
            }
            Some(Outcome::TransientError) => Err(Error::TransportError {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
            Some(Outcome::NonTransientError) => Err(Error::BadConfig(
                "simulated non-transient acquisition failure".to_string(),
            )),
            None => Err(Error::TransportError {
                host: endpoint.host.clone(),
                port: endpoint.port,
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }
}

/// Builds the byte script for the happy-path handshake:
/// empty capabilities, then `AuthenticateOk` answering a PLAIN start.
pub fn happy_path_plain_script() -> Vec<u8> {
    let mut wire = Vec::new();
    wire.extend(frame::encode(
        MessageType::Capabilities.type_id(),
        &encode_capabilities(&Capabilities::new()),
    ));
    wire.extend(frame::encode(MessageType::AuthenticateOk.type_id(), &[]));
    wire
}

/// Same as `happy_path_plain_script` but the first `Capabilities` reply
/// advertises a `tls` capability bag, for scenario 2/3-style coverage at the
/// capability-negotiation layer (TLS handshake itself is not exercised by
/// the in-memory stream, since `native-tls` needs a real socket).
pub fn capabilities_with(entries: &[(&str, &str)]) -> Bytes {
    let mut caps = Capabilities::new();
    for (k, v) in entries {
        caps.insert((*k).to_string(), CapabilityValue::Str((*v).to_string()));
    }
    encode_capabilities(&caps)
}

/// A full PLAIN handshake script whose `Capabilities` reply carries the given
/// entries, for asserting that a negotiated capability map survives into the
/// open `Session` verbatim.
pub fn plain_script_with_capabilities(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut wire = Vec::new();
    wire.extend(frame::encode(MessageType::Capabilities.type_id(), &capabilities_with(entries)));
    wire.extend(frame::encode(MessageType::AuthenticateOk.type_id(), &[]));
    wire
}
