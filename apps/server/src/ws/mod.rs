//! Transport gateway: the websocket wire protocol and session actor.

pub mod protocol;
pub mod session;

pub use protocol::{ClientMsg, ServerMsg};
