//! HTTP/WebSocket embedding surface.
//!
//! REST endpoints drive the same core operations as the widget UI; `/ws`
//! syncs the session on connect and streams session events. CORS is
//! permissive so the chat widget can embed anywhere.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::assistant::Assistant;
use crate::flow::Route;
use crate::session::{FlowAction, Preferences, PreferencesStore, SessionEvent};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub prefs: Arc<PreferencesStore>,
}

/// Actions a WS client can send; mirrors the REST surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    Chat { text: String },
    Flow { route: Route },
    Suggest { suggestion: FlowAction },
    SelectScheme { id: String },
    SelectCrop { crop: String },
    SelectDisease { crop: String, disease: String },
    ClearSession,
}

/// Build the Axum router with chat REST and WebSocket routes.
pub fn api_routes(assistant: Arc<Assistant>, prefs: Arc<PreferencesStore>) -> Router {
    let state = AppState { assistant, prefs };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/session", get(get_session))
        .route("/api/session/clear", post(clear_session))
        .route("/api/chat", post(post_chat))
        .route("/api/flow/{route}", post(post_flow))
        .route("/api/select/scheme", post(select_scheme))
        .route("/api/select/crop", post(select_crop))
        .route("/api/select/disease", post(select_disease))
        .route("/api/preferences", get(get_preferences).put(put_preferences))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "krishi-assist"
    }))
}

// ── Session REST ────────────────────────────────────────────────────────

async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.assistant.session().snapshot().await)
}

async fn clear_session(State(state): State<AppState>) -> impl IntoResponse {
    state.assistant.clear_session().await;
    Json(state.assistant.session().snapshot().await)
}

#[derive(Deserialize)]
struct ChatRequest {
    text: String,
}

async fn post_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    if body.text.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "Message text must not be empty"})),
        );
    }
    state.assistant.send_message(&body.text).await;
    (
        StatusCode::OK,
        Json(serde_json::json!(state.assistant.session().snapshot().await)),
    )
}

async fn post_flow(State(state): State<AppState>, Path(route): Path<String>) -> impl IntoResponse {
    let route: Route = match route.parse() {
        Ok(route) => route,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Unknown flow route"})),
            );
        }
    };
    state.assistant.navigator().activate(route).await;
    (
        StatusCode::OK,
        Json(serde_json::json!(state.assistant.session().snapshot().await)),
    )
}

#[derive(Deserialize)]
struct SchemeSelection {
    id: String,
}

async fn select_scheme(
    State(state): State<AppState>,
    Json(body): Json<SchemeSelection>,
) -> impl IntoResponse {
    state.assistant.navigator().select_scheme(&body.id).await;
    Json(state.assistant.session().snapshot().await)
}

#[derive(Deserialize)]
struct CropSelection {
    crop: String,
}

async fn select_crop(
    State(state): State<AppState>,
    Json(body): Json<CropSelection>,
) -> impl IntoResponse {
    state.assistant.navigator().select_crop(&body.crop).await;
    Json(state.assistant.session().snapshot().await)
}

#[derive(Deserialize)]
struct DiseaseSelection {
    crop: String,
    disease: String,
}

async fn select_disease(
    State(state): State<AppState>,
    Json(body): Json<DiseaseSelection>,
) -> impl IntoResponse {
    state
        .assistant
        .navigator()
        .select_disease(&body.crop, &body.disease)
        .await;
    Json(state.assistant.session().snapshot().await)
}

// ── Preferences ─────────────────────────────────────────────────────────

async fn get_preferences(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.prefs.get().await)
}

async fn put_preferences(
    State(state): State<AppState>,
    Json(prefs): Json<Preferences>,
) -> impl IntoResponse {
    state.prefs.update(prefs.clone()).await;
    Json(prefs)
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("WebSocket client connected");
    let session = Arc::clone(state.assistant.session());

    // Sync the full session on connect.
    let sync = SessionEvent::SessionSync {
        messages: session.messages().await,
    };
    if let Ok(json) = serde_json::to_string(&sync) {
        if socket.send(WsFrame::Text(json.into())).await.is_err() {
            warn!("Failed to send initial sync, client disconnected");
            return;
        }
    }

    let mut rx = session.subscribe();

    loop {
        tokio::select! {
            // Forward session events to this client
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(WsFrame::Text(json.into())).await.is_err() {
                                debug!("Client disconnected during send");
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind broadcast");
                        // Re-sync with the full session
                        let sync = SessionEvent::SessionSync {
                            messages: session.messages().await,
                        };
                        if let Ok(json) = serde_json::to_string(&sync) {
                            if socket.send(WsFrame::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Session event channel closed");
                        break;
                    }
                }
            }

            // Receive actions from the client
            result = socket.recv() => {
                match result {
                    Some(Ok(WsFrame::Text(text))) => {
                        handle_client_action(&text, &state).await;
                    }
                    Some(Ok(WsFrame::Ping(data))) => {
                        if socket.send(WsFrame::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsFrame::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn handle_client_action(text: &str, state: &AppState) {
    match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => match action {
            ClientAction::Chat { text } => state.assistant.send_message(&text).await,
            ClientAction::Flow { route } => state.assistant.navigator().activate(route).await,
            ClientAction::Suggest { suggestion } => {
                state.assistant.navigator().suggest(suggestion).await;
            }
            ClientAction::SelectScheme { id } => {
                state.assistant.navigator().select_scheme(&id).await;
            }
            ClientAction::SelectCrop { crop } => {
                state.assistant.navigator().select_crop(&crop).await;
            }
            ClientAction::SelectDisease { crop, disease } => {
                state
                    .assistant
                    .navigator()
                    .select_disease(&crop, &disease)
                    .await;
            }
            ClientAction::ClearSession => state.assistant.clear_session().await,
        },
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_actions_deserialize() {
        let chat: ClientAction =
            serde_json::from_str(r#"{"action": "chat", "text": "hello"}"#).unwrap();
        assert!(matches!(chat, ClientAction::Chat { text } if text == "hello"));

        let flow: ClientAction =
            serde_json::from_str(r#"{"action": "flow", "route": "plant-protection"}"#).unwrap();
        assert!(matches!(flow, ClientAction::Flow { route: Route::PlantProtection }));

        let disease: ClientAction = serde_json::from_str(
            r#"{"action": "select_disease", "crop": "Tomato", "disease": "Early Blight"}"#,
        )
        .unwrap();
        assert!(
            matches!(disease, ClientAction::SelectDisease { crop, disease }
                if crop == "Tomato" && disease == "Early Blight")
        );

        let clear: ClientAction = serde_json::from_str(r#"{"action": "clear_session"}"#).unwrap();
        assert!(matches!(clear, ClientAction::ClearSession));
    }

    #[test]
    fn unknown_client_action_is_an_error() {
        let result: Result<ClientAction, _> =
            serde_json::from_str(r#"{"action": "reboot_tractor"}"#);
        assert!(result.is_err());
    }
}
