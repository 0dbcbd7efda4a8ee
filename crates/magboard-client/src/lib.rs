//! Magboard Client
//!
//! Joins a campaign whiteboard over HTTP: an owned session runs the sync
//! poll, save flush, presence heartbeat and presence discovery loops until
//! it is closed.

mod config;
mod error;
mod gateway;
mod session;
mod shortcuts;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use gateway::HttpGateway;
pub use session::WhiteboardSession;
pub use shortcuts::{Shortcut, ShortcutAction, ShortcutRegistry};
