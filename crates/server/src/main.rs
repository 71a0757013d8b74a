//! Stepwise Server
//!
//! Axum server exposing the question-solving pipeline over a small
//! JSON API: solve a question, list a user's solve history, health and
//! OpenAPI endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use stepwise_core::gemini::{GeminiClient, GeminiConfig};
use stepwise_core::history::{HistoryEntry, HistoryStore, DEFAULT_HISTORY_LIMIT};
use stepwise_core::{SolveError, SolveRequest, Solver, Subject};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::{OpenApi, ToSchema};

/// Application state
struct AppState {
    solver: Solver,
    history: Arc<HistoryStore>,
}

type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SolveApiRequest {
    user_id: String,
    query: String,
    subject: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SolveApiResponse {
    success: bool,
    steps: Vec<StepDto>,
    final_answer: String,
    metadata: SolveMetadata,
    cached: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SolveMetadata {
    subject: String,
    step_count: usize,
    response_time_ms: u64,
}

#[derive(Serialize, ToSchema)]
struct StepDto {
    step: u32,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    concept: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Deserialize, ToSchema)]
struct HistoryQuery {
    /// Maximum rows to return (default 10)
    limit: Option<u32>,
    /// Optional subject filter
    subject: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct HistoryResponse {
    success: bool,
    count: usize,
    doubts: Vec<HistoryEntryDto>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct HistoryEntryDto {
    query_text: String,
    subject: String,
    final_answer: String,
    created_at: String,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
}

impl From<stepwise_core::Step> for StepDto {
    fn from(s: stepwise_core::Step) -> Self {
        Self {
            step: s.step,
            text: s.text,
            concept: s.concept,
        }
    }
}

impl From<HistoryEntry> for HistoryEntryDto {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            query_text: entry.query_text,
            subject: entry.subject,
            final_answer: entry.final_answer,
            created_at: entry.created_at,
        }
    }
}

#[derive(Parser, Clone)]
#[command(author, version, about = "Stepwise - Step-by-step tutoring API")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the Stepwise server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stepwise API",
        version = "1.0.0",
        description = "Step-by-step solving API for student questions"
    ),
    paths(solve_question, get_history, health),
    components(schemas(
        SolveApiRequest,
        SolveApiResponse,
        SolveMetadata,
        StepDto,
        ErrorResponse,
        HistoryResponse,
        HistoryEntryDto,
        HealthResponse
    )),
    tags(
        (name = "solve", description = "Question solving"),
        (name = "history", description = "Solve history")
    )
)]
struct ApiDoc;

/// Map a pipeline failure to its HTTP status
fn status_for(err: &SolveError) -> StatusCode {
    match err {
        SolveError::InvalidInput(_) | SolveError::SafetyBlocked => StatusCode::BAD_REQUEST,
        SolveError::Timeout => StatusCode::REQUEST_TIMEOUT,
        SolveError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        SolveError::EmptyCompletion | SolveError::Upstream(_) => StatusCode::BAD_GATEWAY,
        SolveError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: SolveError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: err.to_string(),
        }),
    )
}

// === API Handlers ===

/// Solve a student question
#[utoipa::path(
    post,
    path = "/api/v1/solve",
    tag = "solve",
    request_body = SolveApiRequest,
    responses(
        (status = 200, description = "Structured solution", body = SolveApiResponse),
        (status = 400, description = "Invalid request or safety block", body = ErrorResponse),
        (status = 408, description = "Upstream timeout", body = ErrorResponse),
        (status = 429, description = "Upstream rate limit", body = ErrorResponse),
        (status = 502, description = "Upstream failure", body = ErrorResponse)
    )
)]
async fn solve_question(
    State(state): State<SharedState>,
    Json(req): Json<SolveApiRequest>,
) -> Result<Json<SolveApiResponse>, (StatusCode, Json<ErrorResponse>)> {
    let request = SolveRequest::new(req.user_id, req.query, req.subject);

    match state.solver.solve(&request).await {
        Ok(solved) => {
            let step_count = solved.solution.steps.len();
            Ok(Json(SolveApiResponse {
                success: true,
                steps: solved.solution.steps.into_iter().map(Into::into).collect(),
                final_answer: solved.solution.final_answer,
                metadata: SolveMetadata {
                    subject: solved.subject.to_string(),
                    step_count,
                    response_time_ms: solved.response_time_ms as u64,
                },
                cached: solved.cached,
            }))
        }
        Err(e) => {
            tracing::warn!(error = %e, kind = e.kind(), "Solve request failed");
            Err(error_response(e))
        }
    }
}

/// List recent solves for a user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/history/{user_id}",
    tag = "history",
    params(
        ("user_id" = String, Path, description = "User whose history to list"),
        ("limit" = Option<u32>, Query, description = "Maximum rows (default 10)"),
        ("subject" = Option<String>, Query, description = "Filter to one subject")
    ),
    responses(
        (status = 200, description = "Recent solves", body = HistoryResponse),
        (status = 400, description = "Invalid subject filter", body = ErrorResponse)
    )
)]
async fn get_history(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let subject = match params.subject.as_deref() {
        None => None,
        Some(raw) => Some(raw.parse::<Subject>().map_err(|_| {
            error_response(SolveError::InvalidInput("Invalid subject".to_string()))
        })?),
    };

    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    match state.history.recent(&user_id, limit, subject) {
        Ok(entries) => Ok(Json(HistoryResponse {
            success: true,
            count: entries.len(),
            doubts: entries.into_iter().map(Into::into).collect(),
        })),
        Err(e) => {
            tracing::error!(error = %e, "History query failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: "Error fetching history".to_string(),
                }),
            ))
        }
    }
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "solve",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn serve_openapi() -> Json<serde_json::Value> {
    Json(serde_json::to_value(ApiDoc::openapi()).unwrap_or_default())
}

// === Server Entry ===

pub async fn run_server() -> anyhow::Result<()> {
    let client = Arc::new(GeminiClient::new(GeminiConfig::from_env())?);
    let history = Arc::new(HistoryStore::open()?);
    let solver = Solver::new(client, Arc::clone(&history));

    let state: SharedState = Arc::new(AppState { solver, history });

    let app = Router::new()
        .route("/api/v1/solve", post(solve_question))
        .route("/api/v1/history/:user_id", get(get_history))
        .route("/api/v1/health", get(health))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state);

    let args = Args::parse();
    let server_port = match args.command {
        Some(CliCommand::Serve { port }) => port,
        None => 8080,
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], server_port));
    tracing::info!("Stepwise server running at http://{}", addr);
    tracing::info!("  Solve:    POST /api/v1/solve");
    tracing::info!("  History:  GET  /api/v1/history/:user_id");
    tracing::info!("  Health:   GET  /api/v1/health");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    run_server().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&SolveError::InvalidInput("User ID required".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&SolveError::SafetyBlocked), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&SolveError::Timeout), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status_for(&SolveError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&SolveError::EmptyCompletion),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&SolveError::Upstream("HTTP 500".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&SolveError::Configuration("no key".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_uses_stable_messages() {
        let (status, Json(body)) = error_response(SolveError::Timeout);
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert!(!body.success);
        assert_eq!(body.error, "Request timeout - try a shorter question");
    }

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["paths"]["/api/v1/solve"]["post"].is_object());
        assert!(json["paths"]["/api/v1/history/{user_id}"]["get"].is_object());
    }
}
