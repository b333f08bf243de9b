//! Session: the tagged-variant replacement for
//! the reference stack's `this._protocol = false` sentinel. `Fresh`,
//! `Open`, and `Closed` are distinct states rather than a nullable field, so
//! a use-after-close is a type error waiting to happen rather than a
//! runtime null check.
//!
//! The "at most one `ReplyStream` open at a time" invariant falls
//! out of the borrow checker for free: `submit` takes `&mut self` and the
//! `ReplyStream` it drives borrows the `Connection` for its own lifetime, so
//! a second `submit` simply cannot compile while the first's stream is
//! still alive.

use tracing::instrument;

use crate::connection::Connection;
use crate::dispatcher::{self, ReplyStream};
use crate::error::{Error, Result};
use crate::opts::{Endpoint, SessionProperties};
use crate::protocol::control::Capabilities;
use crate::protocol::Message;
use crate::router::Router;

/// Diagnostic snapshot returned by `inspect()`.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub db_user: String,
    pub host: String,
    pub port: u16,
}

enum State {
    Fresh,
    Open {
        connection: Connection,
        capabilities: Capabilities,
        endpoint: Endpoint,
    },
    Closed,
}

pub struct Session {
    router: Router,
    props: SessionProperties,
    state: State,
}

impl Session {
    pub fn new(props: SessionProperties) -> Self {
        let router = Router::new(props.socket_factory.clone(), props.endpoints.clone());
        Self {
            router,
            props,
            state: State::Fresh,
        }
    }

    /// Drives the Session from `Fresh`/`Closed` to `Open` via the Router.
    /// Calling `connect` again after a failed attempt restarts the Router's
    /// traversal from the top of the endpoint list.
    #[instrument(skip_all)]
    pub async fn connect(&mut self) -> Result<()> {
        let connected = self.router.connect(&self.props).await?;
        self.state = State::Open {
            connection: connected.connection,
            capabilities: connected.capabilities,
            endpoint: connected.endpoint,
        };
        Ok(())
    }

    /// Submits one request and drives its reply stream to a sink pair:
    /// `submit(request, row_sink, meta_sink)`.
    #[instrument(skip_all)]
    pub async fn submit<FMeta, FRow, FNotice>(
        &mut self,
        request: Message,
        meta_sink: FMeta,
        row_sink: FRow,
        notice_sink: FNotice,
    ) -> Result<()>
    where
        FMeta: FnMut(crate::protocol::control::ColumnMetaData),
        FRow: FnMut(crate::protocol::control::Row),
        FNotice: FnMut(crate::protocol::control::Notice),
    {
        let connection = match &mut self.state {
            State::Open { connection, .. } => connection,
            State::Closed => return Err(Error::SessionClosed),
            State::Fresh => return Err(Error::SessionClosed),
        };

        connection.send(request).await?;
        let stream = ReplyStream::new(connection);
        let result = dispatcher::drive_with_sinks(stream, meta_sink, row_sink, notice_sink).await;

        if result.is_err() {
            self.close().await.ok();
        }
        result
    }

    /// Pull-based access to the reply stream, for callers that want
    /// iterator-style control instead of sink callbacks.
    pub fn reply_stream(&mut self) -> Result<ReplyStream<'_>> {
        match &mut self.state {
            State::Open { connection, .. } => Ok(ReplyStream::new(connection)),
            _ => Err(Error::SessionClosed),
        }
    }

    /// Sends `request` without waiting for a reply stream to be constructed
    /// by the caller separately; pairs with `reply_stream` for manual pulls.
    pub async fn send(&mut self, request: Message) -> Result<()> {
        match &mut self.state {
            State::Open { connection, .. } => connection.send(request).await,
            _ => Err(Error::SessionClosed),
        }
    }

    #[instrument(skip_all)]
    pub async fn close(&mut self) -> Result<()> {
        if let State::Open { mut connection, .. } = std::mem::replace(&mut self.state, State::Closed) {
            connection.close().await?;
        }
        Ok(())
    }

    pub fn inspect(&self) -> Option<Inspection> {
        match &self.state {
            State::Open { endpoint, .. } => Some(Inspection {
                db_user: self.props.user.clone(),
                host: endpoint.host.clone(),
                port: endpoint.port,
            }),
            _ => None,
        }
    }

    pub fn capabilities(&self) -> Option<&Capabilities> {
        match &self.state {
            State::Open { capabilities, .. } => Some(capabilities),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }
}
