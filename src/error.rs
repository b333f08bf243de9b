//! Error taxonomy for the protocol core.
//!
//! One `thiserror`-derived enum covers every row of the error table: transport
//! failures, codec failures, TLS failures, authentication failures, and
//! server-reported errors mid-stream. `is_transient` is the single place that
//! decides whether the Router should retry the next endpoint or propagate —
//! nothing upstream pattern-matches on OS error codes.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure while acquiring a duplex stream from the socket factory.
    /// The Router treats this as retryable unless every endpoint is exhausted.
    #[error("transport error connecting to {host}:{port}: {source}")]
    TransportError {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Every endpoint in the Router's list failed transiently. errno = 4001.
    #[error("All routers failed.")]
    NoRoutersAvailable,

    /// A previously-authenticated Connection lost its transport. Also the
    /// target of the blanket `From<std::io::Error>` impl `Framed` needs to
    /// surface raw I/O failures from the underlying transport.
    #[error("connection lost: {0}")]
    ConnectionLost(#[from] std::io::Error),

    /// Frame codec rejected the byte stream (`L == 0`, or a structurally invalid payload).
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame header declared a length exceeding the codec's `MaxFrameSize`.
    #[error("frame of {declared} bytes exceeds the {max} byte limit")]
    FrameTooLarge { declared: u32, max: u32 },

    /// `CapabilitiesGet` was answered with an `Error` frame.
    #[error("capability negotiation failed: {0}")]
    CapabilityError(String),

    /// Generic protocol-level violation (out-of-order frame, unexpected type_id, etc).
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// TLS upgrade failed, either at the connector level or during the handshake.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// `Authenticator::verify_server` rejected every mechanism the server advertised.
    /// No bytes are sent to the server in this case.
    #[error("no mutually supported authentication mechanism (server offered: {offered:?})")]
    AuthMechanismUnsupported { offered: Vec<String> },

    /// The server rejected the authentication handshake itself.
    #[error("authentication rejected by server ({code}): {message}")]
    AuthServerError { code: u32, message: String },

    /// An `Error` frame arrived mid-stream, terminating the open `ReplyStream`.
    #[error("server error {code} ({sql_state}): {message}")]
    ServerError {
        sql_state: String,
        code: u32,
        message: String,
    },

    /// An operation was attempted on a `Session` in the `Closed` state.
    #[error("session is closed")]
    SessionClosed,

    /// A well-formed request was rejected before any I/O (bad endpoint list, bad port, etc).
    #[error("bad configuration: {0}")]
    BadConfig(String),

    /// An internal invariant was violated. Reached only by defensive checks
    /// guarding against a panic (e.g. an index/slice operation whose
    /// precondition was supposed to be established upstream) — seeing this
    /// means the invariant, not the input, is wrong.
    #[error("internal invariant violated: {0}")]
    LibraryBug(String),
}

impl Error {
    /// Build a [`Error::LibraryBug`] from anything `Debug`, for call sites
    /// that only have a formatted value on hand rather than a prose message.
    pub fn from_debug(value: impl std::fmt::Debug) -> Self {
        Error::LibraryBug(format!("{value:?}"))
    }

    /// The single predicate the Router consults to decide whether an endpoint-acquisition
    /// failure should be absorbed (mark unavailable, try the next endpoint) or propagated.
    ///
    /// Only failures encountered *while acquiring the duplex stream* are ever transient;
    /// anything raised once the socket exists (capability/TLS/auth errors) is not a
    /// routing problem and must propagate as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::TransportError { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::AddrNotAvailable
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}
