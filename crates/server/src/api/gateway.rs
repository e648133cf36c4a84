//! Session-scoped JSON-RPC gateway at `/invoke`.
//!
//! POST routes an envelope to the caller's session, allocating a session
//! identifier when none is supplied. GET reports the status of an existing
//! session and DELETE retires it; both reject unknown identifiers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::FutureExt;
use serde::Deserialize;

use toolgate_mcp::{
    error_codes, JsonRpcError, JsonRpcResponse, SessionStatus, TransportReply, SESSION_HEADER,
};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    /// Session identifier; takes precedence over the `Session-Id` header.
    pub session: Option<String>,
}

fn header_session(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Query parameter wins over the header.
fn continuation_session(query: &SessionQuery, headers: &HeaderMap) -> Option<String> {
    query
        .session
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| header_session(headers))
}

fn bad_session(status: StatusCode) -> Response {
    (status, Json(JsonRpcResponse::bad_session())).into_response()
}

fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

#[utoipa::path(
    post,
    path = "/invoke",
    tag = "Gateway",
    params(
        ("session-id" = Option<String>, Header, description = "Session identifier; allocated and returned when absent")
    ),
    request_body(content = Object, description = "JSON-RPC 2.0 request or notification"),
    responses(
        (status = 200, description = "JSON-RPC response; tool failures have result.isError = true", body = Object),
        (status = 202, description = "Notification accepted"),
        (status = 400, description = "Unparseable or invalid JSON-RPC envelope", body = Object)
    )
)]
pub async fn invoke(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let session_id = header_session(&headers).unwrap_or_else(|| {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(session_id = %id, "Allocated session identifier");
        id
    });

    let transport = state.sessions.get_or_create(&session_id).await;
    let reply = AssertUnwindSafe(transport.handle(&body)).catch_unwind().await;

    let response = match reply {
        Ok(TransportReply::Accepted) => StatusCode::ACCEPTED.into_response(),
        Ok(TransportReply::Response(resp)) => {
            let status = match resp.error.as_ref().map(|e| e.code) {
                Some(error_codes::PARSE_ERROR) | Some(error_codes::INVALID_REQUEST) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::OK,
            };
            (status, Json(resp)).into_response()
        }
        Err(_) => {
            tracing::error!(session_id = %session_id, "Transport panicked while handling request");
            let err = JsonRpcResponse::error(
                None,
                JsonRpcError {
                    code: error_codes::INTERNAL_ERROR,
                    message: "Internal error".to_string(),
                    data: None,
                },
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
        }
    };

    with_session_header(response, &session_id)
}

#[utoipa::path(
    get,
    path = "/invoke",
    tag = "Gateway",
    params(
        SessionQuery,
        ("session-id" = Option<String>, Header, description = "Session identifier, used when the query parameter is absent")
    ),
    responses(
        (status = 200, description = "Session status", body = Object),
        (status = 400, description = "Missing or unknown session (Bad Session)", body = Object)
    )
)]
pub async fn poll(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> Result<Json<SessionStatus>, Response> {
    let Some(session_id) = continuation_session(&query, &headers) else {
        tracing::debug!("Continuation without session identifier");
        return Err(bad_session(StatusCode::BAD_REQUEST));
    };
    let Some(transport) = state.sessions.get(&session_id).await else {
        tracing::debug!(session_id = %session_id, "Continuation for unknown session");
        return Err(bad_session(StatusCode::BAD_REQUEST));
    };
    Ok(Json(transport.status().await))
}

#[utoipa::path(
    delete,
    path = "/invoke",
    tag = "Gateway",
    params(
        SessionQuery,
        ("session-id" = Option<String>, Header, description = "Session identifier, used when the query parameter is absent")
    ),
    responses(
        (status = 204, description = "Session retired"),
        (status = 400, description = "Missing session identifier (Bad Session)", body = Object),
        (status = 404, description = "Unknown session (Bad Session)", body = Object)
    )
)]
pub async fn close(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(session_id) = continuation_session(&query, &headers) else {
        return bad_session(StatusCode::BAD_REQUEST);
    };
    match state.sessions.remove(&session_id).await {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => bad_session(StatusCode::NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::build_router;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn post(session: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/invoke")
            .header("content-type", "application/json");
        if let Some(s) = session {
            builder = builder.header(SESSION_HEADER, s);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_post_without_session_allocates_one() {
        let state = test_state();
        let app = build_router(state.clone());

        let resp = app
            .oneshot(post(None, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let sid = resp.headers()[SESSION_HEADER].to_str().unwrap().to_string();
        assert!(!sid.is_empty());
        assert!(state.sessions.get(&sid).await.is_some());

        let body = json_body(resp).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["serverInfo"]["name"], "toolgate");
    }

    #[tokio::test]
    async fn test_post_reuses_session() {
        let state = test_state();
        let app = build_router(state.clone());

        for id in 0..2 {
            let resp = app
                .clone()
                .oneshot(post(Some("abc"), json!({"jsonrpc": "2.0", "id": id, "method": "ping"})))
                .await
                .unwrap();
            assert_eq!(resp.headers()[SESSION_HEADER], "abc");
        }
        assert_eq!(state.sessions.len().await, 1);
        let status = state.sessions.get("abc").await.unwrap().status().await;
        assert_eq!(status.requests_handled, 2);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(post(
                Some("s"),
                json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call",
                       "params": {"name": "randomInt", "arguments": {"max": 1}}}),
            ))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["result"]["content"][0]["text"], "0");
        assert_eq!(body["result"]["isError"], false);
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_protocol_error() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(post(
                Some("s"),
                json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call",
                       "params": {"name": "randomInt", "arguments": {"max": -5}}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert!(body.get("error").is_none());
        assert_eq!(body["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let app = build_router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/invoke")
            .header(SESSION_HEADER, "s")
            .body(Body::from("{oops"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_notification_is_202() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(post(Some("s"), json!({"jsonrpc": "2.0", "method": "notifications/initialized"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.headers()[SESSION_HEADER], "s");
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_bad_session() {
        let state = test_state();
        let app = build_router(state.clone());

        for uri in ["/invoke?session=never-seen", "/invoke"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(resp).await,
                json!({"jsonrpc": "2.0", "error": {"code": -32000, "message": "Bad Session"}, "id": null})
            );
        }
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_query_wins_over_header() {
        let state = test_state();
        state.sessions.get_or_create("from-query").await;
        let app = build_router(state);

        let req = Request::builder()
            .uri("/invoke?session=from-query")
            .header(SESSION_HEADER, "from-header")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["session_id"], "from-query");
        assert_eq!(body["last_response"], Value::Null);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = test_state();
        state.sessions.get_or_create("gone").await;
        let app = build_router(state.clone());

        let req = || {
            Request::builder()
                .method("DELETE")
                .uri("/invoke")
                .header(SESSION_HEADER, "gone")
                .body(Body::empty())
                .unwrap()
        };
        let resp = app.clone().oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(state.sessions.get("gone").await.is_none());

        let resp = app.oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_contact_same_session() {
        let state = test_state();
        let app = build_router(state.clone());

        let requests = (0..8).map(|i| {
            app.clone()
                .oneshot(post(Some("fresh"), json!({"jsonrpc": "2.0", "id": i, "method": "ping"})))
        });
        for resp in futures::future::join_all(requests).await {
            assert_eq!(resp.unwrap().status(), StatusCode::OK);
        }

        assert_eq!(state.sessions.len().await, 1);
        let status = state.sessions.get("fresh").await.unwrap().status().await;
        assert_eq!(status.requests_handled, 8);
    }
}
