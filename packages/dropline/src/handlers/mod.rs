pub mod health;
pub mod transfer;
pub mod websocket;

// Re-export all handlers for easy route registration
pub use health::{health_handler, health_live_handler, metrics_handler};
pub use transfer::{init_transfer_handler, transfer_status_handler};
pub use websocket::{fallback_websocket_handler, native_websocket_handler};
