//! Vendor adapters for the conversation loop.
//!
//! Each provider module translates the loop's conversation into one vendor's
//! wire schema; [`HttpVendorClient`] performs the actual HTTP call.

pub mod providers;
pub mod vendor;

pub use providers::claude::ClaudeAdapter;
pub use providers::gemini::GeminiAdapter;
pub use providers::openai::OpenAiAdapter;
pub use providers::{create_provider, Provider, ProviderKind, ProviderPool, ProviderSource};
pub use vendor::HttpVendorClient;
