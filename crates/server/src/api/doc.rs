//! OpenAPI documentation aggregator, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "toolgate API",
        version = "0.1.0",
        description = "Session-scoped JSON-RPC tool gateway and provider-agnostic chat loop.",
    ),
    tags(
        (name = "Gateway", description = "JSON-RPC 2.0 tool gateway with per-session transports"),
        (name = "Chat", description = "Conversation loop over OpenAI, Gemini and Claude"),
        (name = "Health", description = "Liveness and redacted configuration"),
    ),
    paths(
        crate::api::gateway::invoke,
        crate::api::gateway::poll,
        crate::api::gateway::close,
        crate::api::chat::chat,
        crate::api::health::health,
        crate::api::health::config,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::chat::ChatReply,
        crate::api::health::HealthResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_documented() {
        let doc = ApiDoc::openapi();
        for path in ["/invoke", "/chat", "/health", "/config"] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
        let invoke = &doc.paths.paths["/invoke"];
        assert!(invoke.post.is_some() && invoke.get.is_some() && invoke.delete.is_some());
    }
}
