//! Wire-form `Message`: `{ direction, type_id, payload }`. The core
//! treats `payload` as opaque bytes except for the handful of control
//! messages decoded in [`crate::protocol::control`].

use bytes::Bytes;

use crate::constant::{Direction, MessageType};

/// One logical protocol message, already separated from its frame header.
#[derive(Debug, Clone)]
pub struct Message {
    pub direction: Direction,
    pub type_id: u8,
    pub payload: Bytes,
}

impl Message {
    pub fn new(message_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            direction: message_type.direction(),
            type_id: message_type.type_id(),
            payload: payload.into(),
        }
    }

    /// Classify this message against the Message Registry, if its `type_id`
    /// is one the registry knows about. Unknown type-ids are not an error at
    /// this layer — the payload is still forwarded as an opaque `Message` to
    /// whichever higher-level component can interpret it.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_type_id(self.type_id)
    }

    pub fn is(&self, message_type: MessageType) -> bool {
        self.type_id == message_type.type_id()
    }
}
