//! Authentication mechanisms: PLAIN, MYSQL41, SHA256_MEMORY.
//!
//! Each [`Authenticator`] is a pure byte transform, not an I/O participant —
//! the Protocol State Machine is the only thing that ever calls `send`/`recv`.
//! This mirrors how the reference stack keeps its scramble math
//! (`SHA1`/native-password digest) free of any socket dependency.

mod mysql41;
mod plain;
mod sha256_memory;

pub use mysql41::Mysql41Authenticator;
pub use plain::PlainAuthenticator;
pub use sha256_memory::Sha256MemoryAuthenticator;

use bytes::Bytes;

use crate::error::Result;

/// One of the mechanisms a server can advertise via its
/// `authentication.mechanisms` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthMechanism {
    Plain,
    Mysql41,
    Sha256Memory,
}

impl AuthMechanism {
    pub const fn name(self) -> &'static str {
        match self {
            AuthMechanism::Plain => "PLAIN",
            AuthMechanism::Mysql41 => "MYSQL41",
            AuthMechanism::Sha256Memory => "SHA256_MEMORY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLAIN" => Some(AuthMechanism::Plain),
            "MYSQL41" => Some(AuthMechanism::Mysql41),
            "SHA256_MEMORY" => Some(AuthMechanism::Sha256Memory),
            _ => None,
        }
    }

    /// Build the [`Authenticator`] for this mechanism from plaintext credentials.
    pub fn build(self, user: &str, password: &str, schema: Option<&str>) -> Box<dyn Authenticator> {
        match self {
            AuthMechanism::Plain => Box::new(PlainAuthenticator::new(user, password, schema)),
            AuthMechanism::Mysql41 => Box::new(Mysql41Authenticator::new(user, password, schema)),
            AuthMechanism::Sha256Memory => {
                Box::new(Sha256MemoryAuthenticator::new(user, password, schema))
            }
        }
    }
}

/// A pure, stateless-per-step byte transform driving one authentication
/// mechanism through the `AuthenticateStart`/`AuthenticateContinue` exchange.
///
/// `initial_response` is sent with `AuthenticateStart`. If the server answers
/// with `AuthenticateOk` the exchange is over; if it answers with
/// `AuthenticateContinueReply` instead, `handle_challenge` is called with the
/// server's challenge bytes and its return value is sent back via
/// `AuthenticateContinue`. Mechanisms that never challenge (`PLAIN`) simply
/// never have `handle_challenge` invoked.
pub trait Authenticator: Send + Sync {
    fn mechanism(&self) -> AuthMechanism;

    fn initial_response(&self) -> Bytes;

    fn handle_challenge(&self, challenge: &[u8]) -> Result<Bytes>;
}
