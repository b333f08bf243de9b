//! Protocol core for a MySQL X Protocol client driver: the framed message
//! codec, connection lifecycle state machine, router/failover controller,
//! and request/reply dispatcher (see each module's docs for its slice of
//! the design). The fluent query builder, schema verbs, statement-id
//! generation, and URI parsing are external collaborators layered on top of
//! this crate, not part of it.

pub mod auth;
pub mod connection;
pub mod constant;
pub mod dispatcher;
pub mod error;
pub mod opts;
pub mod protocol;
pub mod router;
pub mod session;
pub mod socket;
pub mod state_machine;

pub use auth::{AuthMechanism, Authenticator};
pub use connection::Connection;
pub use dispatcher::{Reply, ReplyStream};
pub use error::{Error, Result};
pub use opts::{Endpoint, SessionProperties, SessionPropertiesBuilder, SslOptions};
pub use protocol::{FrameCodec, Message};
pub use router::Router;
pub use session::{Inspection, Session};
pub use socket::{DuplexStream, SocketFactory, TcpSocketFactory};
