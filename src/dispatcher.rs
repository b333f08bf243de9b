//! Request/Reply Dispatcher: turns one submitted request into a lazy,
//! ordered sequence of typed reply frames. The primary surface is a
//! pull-based [`ReplyStream`]; [`drive_with_sinks`] is a thin push-style
//! adapter over it for callers that prefer a row/meta-callback shape.
//!
//! This is deliberately a free function over `&mut Connection` rather than a
//! long-lived object — there is nothing for a Dispatcher to own between
//! requests.

use tracing::instrument;

use crate::connection::Connection;
use crate::constant::MessageType;
use crate::error::{Error, Result};
use crate::protocol::control::{ColumnMetaData, ErrorPayload, Notice, Row};

/// One item of a streaming reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Meta(ColumnMetaData),
    Row(Row),
    Notice(Notice),
    Done,
}

/// Borrows the `Connection` for the lifetime of one outstanding request.
/// Dropping a `ReplyStream` before it yields `Done` abandons the stream at
/// the protocol level too — there is no mid-stream cancel, so the caller
/// must close the Session to actually reclaim the transport.
pub struct ReplyStream<'a> {
    connection: &'a mut Connection,
    done: bool,
}

impl<'a> ReplyStream<'a> {
    pub(crate) fn new(connection: &'a mut Connection) -> Self {
        Self {
            connection,
            done: false,
        }
    }

    /// Pull the next reply item, or `None` once the stream has delivered its
    /// terminal frame.
    #[instrument(skip_all)]
    pub async fn next(&mut self) -> Result<Option<Reply>> {
        loop {
            if self.done {
                return Ok(None);
            }

            let message = self.connection.receive().await?.ok_or_else(|| {
                Error::ConnectionLost(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
            })?;

            return match message.message_type() {
                Some(MessageType::ColumnMetaData) => {
                    Ok(Some(Reply::Meta(ColumnMetaData::decode(&message.payload)?)))
                }
                Some(MessageType::Row) => Ok(Some(Reply::Row(Row::decode(&message.payload)?))),
                Some(MessageType::NoticeFrame) => {
                    Ok(Some(Reply::Notice(Notice::decode(&message.payload)?)))
                }
                Some(MessageType::FetchDoneMoreResultsets) => {
                    // Another result set follows; this frame carries no
                    // payload of its own, so loop for the next real frame.
                    continue;
                }
                Some(MessageType::FetchDone) | Some(MessageType::Ok) | Some(MessageType::StmtExecuteOk) => {
                    self.done = true;
                    Ok(Some(Reply::Done))
                }
                Some(MessageType::Error) => {
                    self.done = true;
                    let err = ErrorPayload::decode(&message.payload)?;
                    Err(Error::ServerError {
                        sql_state: err.sql_state,
                        code: err.code,
                        message: err.message,
                    })
                }
                _ => {
                    self.done = true;
                    Err(Error::ProtocolError(format!(
                        "unexpected frame (type_id {}) during streaming",
                        message.type_id
                    )))
                }
            };
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Push-style adapter over [`ReplyStream`] for callers that want a
/// `submit(request, row_sink, meta_sink)` shape instead of pulling. Notices
/// that carry a session-state change are not applied here — the Session
/// applies them before returning control to the caller.
pub async fn drive_with_sinks<FMeta, FRow, FNotice>(
    mut stream: ReplyStream<'_>,
    mut meta_sink: FMeta,
    mut row_sink: FRow,
    mut notice_sink: FNotice,
) -> Result<()>
where
    FMeta: FnMut(ColumnMetaData),
    FRow: FnMut(Row),
    FNotice: FnMut(Notice),
{
    while let Some(reply) = stream.next().await? {
        match reply {
            Reply::Meta(meta) => meta_sink(meta),
            Reply::Row(row) => row_sink(row),
            Reply::Notice(notice) => notice_sink(notice),
            Reply::Done => break,
        }
    }
    Ok(())
}
