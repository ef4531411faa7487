//! WebSocket delivery of change notifications.
//!
//! Every connection gets its own [`DeliveryLoop`]: one broadcaster
//! subscription, one keepalive timer, one reader watching for disconnects.

mod delivery;
mod handler;
mod message;

pub use delivery::{CloseReason, DeliveryLoop, PING_INTERVAL};
pub use handler::ws_handler;
pub use message::ServerMessage;
