//! Magboard Server
//!
//! Stores each campaign's whiteboard and tracks who is looking at it.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /api/whiteboard-data?campaign=<name>   -> { "elements": [...], "timestamp": 123 }
//! POST /api/whiteboard-data?campaign=<name>   <- { "elements": [...] }  -> { "ok": true, "timestamp": 123 }
//! GET  /api/presence?campaign=<name>          -> { "users": [...] }
//! POST /api/presence?campaign=<name>          <- { "userId": "...", ... } -> { "ok": true }
//! ```

pub mod blocking;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use blocking::BlockingGateway;
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::AppState;
