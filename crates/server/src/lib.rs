//! HTTP surface of toolgate: the session-scoped JSON-RPC gateway, the chat
//! endpoint and their shared state.

pub mod api;
pub mod background;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::{AppState, ChatTools, TurnTools};
