pub mod control;
pub mod frame;
pub mod message;

pub use frame::FrameCodec;
pub use message::Message;
