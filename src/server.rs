//! RPC tool-surface HTTP server.
//!
//! Exposes the closed tool catalogue (C9) as a JSON HTTP API for AI agents.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools` | List every tool's name, description, and parameter schema |
//! | `POST` | `/tools/:name` | Invoke a tool with a JSON body of parameters |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses follow the same schema:
//!
//! ```json
//! { "error": { "code": "ErrInvalidInput", "message": "query must not be empty" } }
//! ```
//!
//! `code` is [`CoreError::code`] — a stable, tool-agnostic string an agent can
//! branch on without parsing `message`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based and
//! cross-origin MCP clients can call in directly.

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::errors::CoreError;
use crate::tools::{ToolContext, ToolRegistry};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    registry: Arc<ToolRegistry>,
    tool_ctx: Arc<ToolContext>,
}

/// Starts the tool-surface HTTP server.
///
/// Binds to the address configured in `[server].bind` and registers all
/// route handlers. The server runs indefinitely until the process is terminated.
pub async fn run_server(config: &Config, registry: Arc<ToolRegistry>, tool_ctx: Arc<ToolContext>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState { registry, tool_ctx };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools", get(handle_list_tools))
        .route("/tools/:name", post(handle_invoke_tool))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %bind_addr, "tool-surface server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let code = err.code();
        AppError {
            status: status_for_code(code),
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

/// Maps a [`CoreError::code`] to the HTTP status an agent should treat it as.
fn status_for_code(code: &str) -> StatusCode {
    match code {
        "ErrPathAbsolute" | "ErrPathTraversal" | "ErrPathEscape" | "ErrNotRegularFile" | "ErrSuffixNotAllowed"
        | "ErrTooLarge" | "ErrInvalidInput" => StatusCode::BAD_REQUEST,
        "ErrPermissionDenied" => StatusCode::FORBIDDEN,
        "ErrCatalogNotFound" => StatusCode::NOT_FOUND,
        "ErrEmbeddingUnavailable" => StatusCode::SERVICE_UNAVAILABLE,
        "ErrCacheFull" => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn unknown_tool(name: &str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "ErrUnknownTool".to_string(),
        message: format!("no tool named {name}"),
    }
}

fn invalid_body(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "ErrInvalidInput".to_string(),
        message: message.into(),
    }
}

// ============ GET /tools ============

#[derive(Serialize)]
struct ToolDescriptor {
    name: String,
    description: String,
    parameters_schema: Value,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    let descriptors = state
        .registry
        .tools()
        .iter()
        .map(|t| ToolDescriptor {
            name: t.name().to_string(),
            description: t.description().to_string(),
            parameters_schema: t.parameters_schema(),
        })
        .collect();
    Json(descriptors)
}

// ============ POST /tools/:name ============

/// Invokes a single closed-catalogue tool by name. The request body is the
/// tool's raw parameters object; an empty body is treated as `{}` so
/// no-argument tools (none currently, but schema-valid ones with all-optional
/// fields) can be called with no body at all.
async fn handle_invoke_tool(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, AppError> {
    let tool = state.registry.find(&name).ok_or_else(|| unknown_tool(&name))?;

    let params: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|e| invalid_body(format!("invalid JSON body: {e}")))?
    };

    let result = tool.execute(params, &state.tool_ctx).await?;
    Ok(Json(result))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
