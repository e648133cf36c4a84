//! HTTP endpoint modules.
//!
//! Shared response types live here.

pub mod chat;
pub mod doc;
pub mod gateway;
pub mod health;

use serde::Serialize;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
