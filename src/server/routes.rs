//! HTTP route handlers for the chat widget API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::chat::{ChatError, Message, MessageId, SessionId, Strategy};

use super::state::AppState;

/// Create the router: chat API, health check, static assets, CORS and request tracing.
pub fn create_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.static_dir);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_message))
        .route("/api/chat/{session_id}", delete(close_session))
        .route("/api/chat/{session_id}/history", get(chat_history))
        .fallback_service(assets)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chizel-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Chat message request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The visitor's message.
    pub message: String,
    /// Session to continue; a new one is opened when absent.
    pub session_id: Option<SessionId>,
}

/// Chat message response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Session the message was added to.
    pub session_id: SessionId,
    /// Identifier of the assistant message.
    pub message_id: MessageId,
    /// Assistant reply.
    pub reply: String,
    /// Strategy that produced the reply.
    pub strategy: Strategy,
}

/// Conversation log response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Session identifier.
    pub session_id: SessionId,
    /// Messages in order.
    pub messages: Vec<Message>,
}

fn error_response(err: &ChatError) -> (StatusCode, String) {
    let status = match err {
        ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
        ChatError::SessionBusy(_) => StatusCode::CONFLICT,
        ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::SpeechUnavailable => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// Handle one chat submission.
///
/// The resolution runs on its own task holding the session lock, so a client
/// that disconnects mid-wait still gets its exchange recorded.
async fn chat_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    if request.message.trim().is_empty() {
        return Err(error_response(&ChatError::EmptyMessage));
    }

    let session_id = request.session_id.unwrap_or_default();
    let mut session = state
        .session(session_id)
        .try_lock_owned()
        .map_err(|_| error_response(&ChatError::SessionBusy(session_id)))?;

    let message = request.message;
    let submission = tokio::spawn(async move { session.submit_detailed(&message).await });

    let (reply, resolution) = submission
        .await
        .map_err(|e| {
            tracing::error!(session = %session_id, error = %e, "submission task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(|e| error_response(&e))?;

    Ok(Json(ChatResponse {
        session_id,
        message_id: reply.id(),
        reply: reply.content().to_string(),
        strategy: resolution.strategy,
    }))
}

/// Close a session when its panel goes away.
async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.close_session(session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(&ChatError::SessionNotFound(session_id)))
    }
}

/// Return the full log of a session.
async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let session = state
        .existing_session(session_id)
        .ok_or_else(|| error_response(&ChatError::SessionNotFound(session_id)))?;
    let messages = session.lock().await.messages().to_vec();

    Ok(Json(HistoryResponse {
        session_id,
        messages,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::chat::testing::{Scripted, ScriptedTransport};
    use crate::chat::{ChatConfig, ResponseResolver, Transport};
    use crate::server::state::DEFAULT_SESSION_IDLE;

    fn state_with(config: ChatConfig, transport: ScriptedTransport) -> Arc<AppState> {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let resolver = ResponseResolver::new(config, transport).expect("valid config");
        AppState::new(resolver, "static", DEFAULT_SESSION_IDLE)
    }

    fn offline_state() -> Arc<AppState> {
        state_with(ChatConfig::default(), ScriptedTransport::new())
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn history_of(state: &Arc<AppState>, session_id: &str) -> Vec<Value> {
        let (status, history) = send(
            state,
            request("GET", &format!("/api/chat/{session_id}/history")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        history["messages"].as_array().unwrap().clone()
    }

    #[tokio::test]
    async fn test_health() {
        let state = offline_state();
        let (status, body) = send(&state, request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_then_history() {
        let state = offline_state();

        let (status, body) = send(
            &state,
            post_json("/api/chat", &json!({"message": "Tell me about Chizel"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["strategy"], "local");
        assert!(body["reply"]
            .as_str()
            .unwrap()
            .contains("Chizel is a playful learning app"));

        let messages = history_of(&state, body["session_id"].as_str().unwrap()).await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["id"], body["message_id"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_client_still_gets_reply_recorded() {
        let state = state_with(
            ChatConfig::new().with_primary_api_key("sk-test"),
            ScriptedTransport::new().on("https://api.openai.com", Scripted::Hang),
        );
        let id = SessionId::new();

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            send(&state, post_json("/api/chat", &json!({"message": "hello", "session_id": id}))),
        )
        .await;
        assert!(abandoned.is_err());

        // Primary deadline passes, the local matcher answers.
        tokio::time::sleep(Duration::from_secs(20)).await;

        let messages = history_of(&state, &id.to_string()).await;
        let roles: Vec<&str> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, ["user", "assistant"]);
        assert_eq!(messages[0]["content"], "hello");
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let state = offline_state();
        let (status, _) = send(&state, post_json("/api/chat", &json!({"message": "  \t "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.session_count(), 0);
    }

    #[tokio::test]
    async fn test_pending_session_is_busy() {
        let state = offline_state();
        let id = SessionId::new();
        let session = state.session(id);
        let _pending = session.lock().await;

        let (status, _) = send(
            &state,
            post_json("/api/chat", &json!({"message": "hello", "session_id": id})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_history_is_not_found() {
        let state = offline_state();
        let uri = format!("/api/chat/{}/history", SessionId::new());
        let (status, _) = send(&state, request("GET", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_close_session_forgets_history() {
        let state = offline_state();
        let (_, body) = send(&state, post_json("/api/chat", &json!({"message": "hi"}))).await;
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, _) = send(&state, request("DELETE", &format!("/api/chat/{id}"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.session_count(), 0);

        let (status, _) = send(&state, request("GET", &format!("/api/chat/{id}/history"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&state, request("DELETE", &format!("/api/chat/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
