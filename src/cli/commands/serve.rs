//! HTTP backend that runs the agent.
//!
//! Answers are streamed back as plain text in fixed-size chunks.

use crate::agent::{response_stream, Agent, ThreadSummary};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub agent: Arc<Agent>,
    pub default_thread: String,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
}

impl AppState {
    pub fn new(agent: Agent, settings: &Settings) -> Self {
        Self {
            agent: Arc::new(agent),
            default_thread: settings.agent.default_thread.clone(),
            chunk_size: settings.server.chunk_size,
            chunk_delay: Duration::from_millis(settings.server.chunk_delay_ms),
        }
    }
}

/// Run the HTTP backend.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::verify_environment() {
        Output::error(&format!("{}", e));
        Output::info("Run 'infrachat doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let spinner = Output::spinner("Initializing tools...");
    let agent = Agent::from_settings(&settings).await;
    spinner.finish_and_clear();
    let agent = agent?;

    if agent.tools().is_empty() {
        Output::warning("No tools initialized. Run 'infrachat doctor' to see why.");
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let state = Arc::new(AppState::new(agent, &settings));
    let tool_names = state.agent.tools().names();
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("infrachat backend");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Tools", &tool_names.join(", "));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Query", "POST   /process_query");
    Output::kv("Tools", "GET    /tools");
    Output::kv("Threads", "GET    /threads");
    Output::kv("Clear thread", "DELETE /threads/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Build the API router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/process_query", post(process_query))
        .route("/tools", get(list_tools))
        .route("/threads", get(list_threads))
        .route("/threads/{id}", delete(clear_thread))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    thread_id: Option<String>,
}

#[derive(Serialize)]
struct ToolsResponse {
    tools: Vec<ToolInfo>,
    total: usize,
}

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
}

#[derive(Serialize)]
struct ThreadsResponse {
    threads: Vec<ThreadSummary>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn process_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Response {
    let query = req.query.trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query must not be empty".to_string());
    }

    let thread_id = req
        .thread_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| state.default_thread.clone());
    info!("Received query on thread {}: {}", thread_id, query);

    let chunks = response_stream(
        state.agent.clone(),
        thread_id,
        query.to_string(),
        state.chunk_size,
        state.chunk_delay,
    )
    .map(Ok::<_, Infallible>);

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response()
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools: Vec<ToolInfo> = state
        .agent
        .tools()
        .summaries()
        .into_iter()
        .map(|(name, description)| ToolInfo { name, description })
        .collect();

    Json(ToolsResponse {
        total: tools.len(),
        tools,
    })
}

async fn list_threads(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let threads = state.agent.memory().threads().await;
    Json(ThreadsResponse {
        total: threads.len(),
        threads,
    })
}

async fn clear_thread(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    if state.agent.memory().clear(&id).await {
        info!("Cleared thread {}", id);
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Thread not found: {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{agent_with, text_reply, tool_reply, ScriptedModel};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(replies: Vec<serde_json::Value>) -> (Router, Arc<AppState>) {
        let agent = agent_with(Arc::new(ScriptedModel::new(replies)));
        let state = Arc::new(AppState {
            agent: Arc::new(agent),
            default_thread: "default".to_string(),
            chunk_size: 4,
            chunk_delay: Duration::ZERO,
        });
        (build_router(state.clone()), state)
    }

    fn query_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/process_query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn test_process_query_streams_answer() {
        let (app, state) = app(vec![
            tool_reply("call_1", "Upper_Tool", "get pods"),
            text_reply("Found GET PODS"),
        ]);

        let response = app
            .oneshot(query_request(serde_json::json!({ "query": "list pods" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "Found GET PODS");
        assert_eq!(state.agent.memory().history("default").await.len(), 4);
    }

    #[tokio::test]
    async fn test_process_query_uses_thread_id() {
        let (app, state) = app(vec![text_reply("ok")]);
        let response = app
            .oneshot(query_request(
                serde_json::json!({ "query": "hi", "thread_id": "ops-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "ok");
        assert_eq!(state.agent.memory().history("ops-1").await.len(), 2);
        assert!(state.agent.memory().history("default").await.is_empty());
    }

    #[tokio::test]
    async fn test_process_query_error_is_streamed() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(query_request(serde_json::json!({ "query": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response)
            .await
            .starts_with("Error processing query:"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(query_request(serde_json::json!({ "query": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("must not be empty"));
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (app, _) = app(vec![]);
        let response = app
            .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["tools"][0]["name"], "Upper_Tool");
    }

    #[tokio::test]
    async fn test_threads_list_and_clear() {
        let (app, state) = app(vec![text_reply("ok")]);
        state.agent.process("ops", "hi").await.unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/threads").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["threads"][0]["id"], "ops");
        assert_eq!(body["threads"][0]["message_count"], 2);

        let delete = || {
            Request::delete("/threads/ops")
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
