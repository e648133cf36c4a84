//! Built-in tool implementations served by the in-process registry.
//!
//! `random_int` is the demo capability exposed through the gateway as
//! `randomInt`.

pub mod random_int;

pub use random_int::{RandomIntArgs, RandomIntTool};
