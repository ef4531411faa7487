//! HTTP(S) server: static files, change notifications, health check.

mod compression;
mod routes;
mod serve;
mod state;

pub use compression::Compression;
pub use routes::create_router;
pub use serve::{TLS_SHUTDOWN_GRACE, cancel_on_ctrl_c, serve};
pub use state::AppState;
