mod flow;
mod quotes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post},
};
use chat_flow::{
    FileSessionStorage, FlowError, FlowRunner, FlowStatus, InMemorySessionStorage, Session,
    SessionStorage, UserResponse,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::quotes::{Quote, quotes_for};

#[derive(Clone)]
struct AppState {
    runner: FlowRunner,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// Omit to start a new conversation.
    session_id: Option<String>,
    /// The answer to the current step. Omit to (re)fetch the current prompt.
    response: Option<UserResponse>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    /// Bot prompts produced by this call, in conversation order.
    messages: Vec<String>,
    /// Validation message when the submitted response was rejected; the
    /// conversation stays at the same step.
    rejection: Option<String>,
    status: String,
    /// Mocked offers, present once the flow completes.
    quotes: Option<Vec<Quote>>,
    /// Non-fatal persistence warning; the session continues in memory.
    warning: Option<String>,
}

/// Initialize structured tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "insurance_quote_service=debug,chat_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Middleware to add a correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    request.headers_mut().insert(
        "x-correlation-id",
        HeaderValue::from_str(&correlation_id).unwrap(),
    );

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

#[tokio::main]
async fn main() {
    init_tracing();

    // A structurally broken flow definition must fail startup, not a
    // conversation.
    let flow = Arc::new(flow::build_quote_flow().expect("quote flow definition is broken"));

    // SESSION_DIR selects the durable file-backed store; without it the
    // sessions live in memory only.
    let session_storage: Arc<dyn SessionStorage> =
        if let Ok(dir) = std::env::var("SESSION_DIR") {
            match FileSessionStorage::open(&dir).await {
                Ok(storage) => {
                    info!(dir = %dir, "Using file-backed session storage");
                    Arc::new(storage)
                }
                Err(e) => {
                    error!(
                        "Failed to open session directory: {}. Falling back to in-memory storage.",
                        e
                    );
                    Arc::new(InMemorySessionStorage::new())
                }
            }
        } else {
            info!("Using in-memory session storage (set SESSION_DIR to persist sessions)");
            Arc::new(InMemorySessionStorage::new())
        };

    let app_state = AppState {
        runner: FlowRunner::new(flow, session_storage),
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/chat/session/{id}", get(get_session))
        .route("/chat/session/{id}/previous", post(previous_step))
        .route("/chat/session/{id}/reset", post(reset_session))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(correlation_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.unwrap();
}

async fn health_check() -> &'static str {
    "OK"
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let session_id_provided = request.session_id.is_some();

    if let Some(id) = &request.session_id {
        if Uuid::parse_str(id).is_err() {
            error!(session_id = %id, "Invalid session ID format");
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let mut messages = Vec::new();
    let mut warning = None;

    let session_id = match request.session_id {
        Some(id) => id,
        None => {
            let (session, started) = state
                .runner
                .start_session(None)
                .await
                .map_err(|e| handle_flow_error(&e, "<new>"))?;
            info!(session_id = %session.id, "Creating new session");
            messages.extend(started.outcome.messages);
            warning = started.persist_warning;
            session.id
        }
    };

    let mut status = FlowStatus::WaitingForInput;

    match request.response {
        Some(response) => {
            let result = state
                .runner
                .submit(&session_id, &response)
                .await
                .map_err(|e| handle_flow_error(&e, &session_id))?;
            messages.extend(result.outcome.messages);
            warning = warning.or(result.persist_warning);
            status = result.outcome.status;
        }
        None if session_id_provided => {
            // No response to apply: re-issue the current prompt so a
            // reloading client can re-render where it left off.
            let session = state
                .runner
                .get_session(&session_id)
                .await
                .map_err(|e| handle_flow_error(&e, &session_id))?;
            let prompt = current_step_prompt(&state, &session)
                .map_err(|e| handle_flow_error(&e, &session_id))?;
            messages.push(prompt);
        }
        None => {}
    }

    // The loading step models the externally-timed quote lookup: the wait is
    // owned here, not by the engine.
    if status == FlowStatus::Loading {
        simulate_quote_lookup().await;
        let result = state
            .runner
            .complete_loading(&session_id)
            .await
            .map_err(|e| handle_flow_error(&e, &session_id))?;
        messages.extend(result.outcome.messages);
        warning = warning.or(result.persist_warning);
        status = result.outcome.status;
    }

    let quotes = if status == FlowStatus::Completed {
        let session = state
            .runner
            .get_session(&session_id)
            .await
            .map_err(|e| handle_flow_error(&e, &session_id))?;
        Some(quotes_for(&session.answers))
    } else {
        None
    };

    let (status_label, rejection) = match status {
        FlowStatus::Rejected(message) => ("waiting_for_input", Some(message)),
        FlowStatus::WaitingForInput => ("waiting_for_input", None),
        FlowStatus::Loading => ("loading", None),
        FlowStatus::Completed => ("completed", None),
    };

    if let Some(warning) = &warning {
        warn!(session_id = %session_id, warning = %warning, "Session is running unpersisted");
    }

    info!(
        session_id = %session_id,
        status = %status_label,
        rejected = rejection.is_some(),
        "Chat request completed"
    );

    Ok(Json(ChatResponse {
        session_id,
        messages,
        rejection,
        status: status_label.to_string(),
        quotes,
        warning,
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, StatusCode> {
    match state.runner.get_session(&session_id).await {
        Ok(session) => Ok(Json(session)),
        Err(e) => Err(handle_flow_error(&e, &session_id)),
    }
}

async fn previous_step(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let result = state
        .runner
        .previous(&session_id)
        .await
        .map_err(|e| handle_flow_error(&e, &session_id))?;
    Ok(Json(ChatResponse {
        session_id,
        messages: result.outcome.messages,
        rejection: None,
        status: "waiting_for_input".to_string(),
        quotes: None,
        warning: result.persist_warning,
    }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let result = state
        .runner
        .reset(&session_id)
        .await
        .map_err(|e| handle_flow_error(&e, &session_id))?;
    info!(session_id = %session_id, "Session reset to entry step");
    Ok(Json(ChatResponse {
        session_id,
        messages: result.outcome.messages,
        rejection: None,
        status: "waiting_for_input".to_string(),
        quotes: None,
        warning: result.persist_warning,
    }))
}

fn current_step_prompt(state: &AppState, session: &Session) -> chat_flow::Result<String> {
    Ok(state.runner.flow().current_step(session)?.prompt.clone())
}

/// Simulated latency of the stubbed insurer lookup.
async fn simulate_quote_lookup() {
    let jitter = rand::rng().random_range(0..500);
    tokio::time::sleep(Duration::from_millis(600 + jitter)).await;
}

fn handle_flow_error(e: &FlowError, session_id: &str) -> StatusCode {
    match e {
        FlowError::SessionNotFound(_) => {
            info!(session_id = %session_id, "Session not found");
            StatusCode::NOT_FOUND
        }
        FlowError::UnknownStep(_) | FlowError::InvalidTransition { .. } => {
            // Flow definition defect: fatal for this interaction.
            error!(session_id = %session_id, error = %e, "Flow definition failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => {
            error!(session_id = %session_id, error = %e, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
