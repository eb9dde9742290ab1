//! Broadcast Hub
//!
//! One [`Hub`] per process owns the session registry and the history log;
//! every WebSocket connection runs [`run_session`], which replays history on
//! join, classifies inbound frames (chat text / file metadata / binary
//! payload), and fans broadcast-worthy messages out to all live sessions.

mod history;
mod protocol;
mod registry;
mod session;
mod state;
mod transfer;

pub use protocol::Message;
pub use session::run_session;
pub use state::Hub;
