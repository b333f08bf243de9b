//! Connection: owns one duplex transport and the [`FrameCodec`]
//! framed over it. No protocol semantics live here — `send`/`receive` move
//! `Message`s, `close` performs a bounded, idempotent shutdown, and
//! `upgrade_tls` swaps the transport under the same `Framed` buffers. The
//! Protocol State Machine is the only caller.

use futures_util::{SinkExt, StreamExt};
use tokio_util::codec::Framed;

use crate::constant::Direction;
use crate::error::{Error, Result};
use crate::protocol::{FrameCodec, Message};
use crate::socket::DuplexStream;

/// How many bytes of trailing input `close` will drain before giving up and
/// closing anyway.
const CLOSE_DRAIN_LIMIT: usize = 64 * 1024;

/// One live transport framed with the wire codec. `poisoned` is latched the
/// first time an I/O or codec error surfaces; once poisoned every further
/// call fails fast with [`Error::ConnectionLost`] instead of attempting more
/// I/O on a transport that may be left mid-frame.
pub struct Connection {
    framed: Framed<Box<dyn DuplexStream>, FrameCodec>,
    poisoned: bool,
}

impl Connection {
    pub fn new(stream: Box<dyn DuplexStream>) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec::new()),
            poisoned: false,
        }
    }

    fn check_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::ConnectionLost(std::io::Error::from(
                std::io::ErrorKind::NotConnected,
            )));
        }
        Ok(())
    }

    pub async fn send(&mut self, message: Message) -> Result<()> {
        self.check_poisoned()?;
        self.framed.send(message).await.map_err(|err| {
            self.poisoned = true;
            err
        })
    }

    /// Read the next frame, classifying its direction as server-to-client
    /// (every frame a `Connection` receives originates from the server).
    pub async fn receive(&mut self) -> Result<Option<Message>> {
        self.check_poisoned()?;
        match self.framed.next().await {
            None => Ok(None),
            Some(Ok((type_id, payload))) => Ok(Some(Message {
                direction: Direction::ServerToClient,
                type_id,
                payload,
            })),
            Some(Err(err)) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Idempotent close: flushes any pending writes, half-closes the write
    /// side (driving the sink's `poll_close`, which shuts down the
    /// transport), drains up to [`CLOSE_DRAIN_LIMIT`] bytes of trailing
    /// input, then releases the transport. Safe to call more than once or on
    /// an already-poisoned connection.
    pub async fn close(&mut self) -> Result<()> {
        if self.poisoned {
            return Ok(());
        }
        let _ = self.framed.close().await;

        let mut drained = 0usize;
        while drained < CLOSE_DRAIN_LIMIT {
            match self.framed.next().await {
                Some(Ok((_, payload))) => drained += 4 + 1 + payload.len(),
                _ => break,
            }
        }

        self.poisoned = true;
        Ok(())
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Splits off the raw transport for the one-shot TLS upgrade, keeping the codec's buffered bytes so a
    /// partially-read frame straddling the handshake is not lost.
    pub fn into_parts(self) -> (Box<dyn DuplexStream>, ConnectionBuffers) {
        let parts = self.framed.into_parts();
        (
            parts.io,
            ConnectionBuffers {
                read_buf: parts.read_buf,
                write_buf: parts.write_buf,
            },
        )
    }

    /// Rebuilds a `Connection` around a new transport (the TLS-wrapped
    /// stream), restoring the buffers from a prior `into_parts` call.
    pub fn from_parts(stream: Box<dyn DuplexStream>, buffers: ConnectionBuffers) -> Self {
        let mut parts = Framed::new(stream, FrameCodec::new()).into_parts();
        parts.read_buf = buffers.read_buf;
        parts.write_buf = buffers.write_buf;
        Self {
            framed: Framed::from_parts(parts),
            poisoned: false,
        }
    }
}

/// Opaque carrier for a `Connection`'s codec buffers across a transport swap.
pub struct ConnectionBuffers {
    read_buf: bytes::BytesMut,
    write_buf: bytes::BytesMut,
}
