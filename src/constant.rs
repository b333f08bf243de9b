//! Message Registry: a static bidirectional mapping between wire `type_id`
//! bytes and logical message names, grouped by direction. This table is the
//! single source of truth the Frame Codec, Connection, and Dispatcher all
//! consult; nothing in this crate hardcodes a type-id literal outside of it.

/// Direction a [`MessageType`] travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

macro_rules! message_registry {
    ($( $variant:ident = $id:literal [$dir:ident] ),+ $(,)?) => {
        /// Logical message name, keyed by the wire `type_id`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum MessageType {
            $( $variant = $id, )+
        }

        impl MessageType {
            pub const fn type_id(self) -> u8 {
                self as u8
            }

            pub const fn direction(self) -> Direction {
                match self {
                    $( MessageType::$variant => Direction::$dir, )+
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( MessageType::$variant => stringify!($variant), )+
                }
            }

            /// Reverse lookup used by the codec/dispatcher to classify an incoming frame.
            pub const fn from_type_id(id: u8) -> Option<Self> {
                match id {
                    $( $id => Some(MessageType::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

message_registry! {
    ConnectionCapabilitiesGet    = 1   [ClientToServer],
    ConnectionCapabilitiesSet    = 2   [ClientToServer],
    Capabilities                 = 3   [ServerToClient],
    AuthenticateStart            = 4   [ClientToServer],
    AuthenticateContinue         = 5   [ClientToServer],
    AuthenticateContinueReply    = 6   [ServerToClient],
    AuthenticateOk               = 7   [ServerToClient],
    Error                        = 8   [ServerToClient],
    Ok                           = 9   [ServerToClient],
    SqlStmtExecute               = 10  [ClientToServer],
    StmtExecuteOk                = 11  [ServerToClient],
    NoticeFrame                  = 12  [ServerToClient],
    ColumnMetaData                = 13 [ServerToClient],
    Row                           = 14 [ServerToClient],
    FetchDone                     = 15 [ServerToClient],
    FetchDoneMoreResultsets       = 16 [ServerToClient],
    CrudFind                      = 17 [ClientToServer],
    CrudInsert                    = 18 [ClientToServer],
    CrudUpdate                    = 19 [ClientToServer],
    CrudDelete                    = 20 [ClientToServer],
}

/// `ServerCapabilities` key observed by the Authenticator.
pub const CAPABILITY_AUTH_MECHANISMS: &str = "authentication.mechanisms";

/// Default `MaxFrameSize` for the Frame Codec.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// `errno` for `NoRoutersAvailable`.
pub const ERRNO_NO_ROUTERS_AVAILABLE: u32 = 4001;
