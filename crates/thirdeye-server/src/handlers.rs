//! HTTP request handlers for the server.
//!
//! Every route is a thin adapter over the [`Orchestrator`]. Writes pass the
//! misuse guard under their own action name; the fork audit route is
//! admitted by the guard and then runs the auditor on a blocking task.
//! The `/guard/blocks` routes are limited to configured operators.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use thirdeye_domain::traits::{LlmProvider, SearchProvider};
use thirdeye_domain::{
    AnalysisId, AnalysisRecord, AnalysisSummary, Source, Theory, VerificationOutcome, Watermark,
};
use thirdeye_gatekeeper::{ForkAudit, ForkAuditor};
use thirdeye_pipeline::{AnalysisRequest, Orchestrator, PipelineError, AUDIT_FORK_ACTION};
use thirdeye_store::SqliteStore;
use tracing::{error, info};

/// Header an upstream authenticating proxy sets to the user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Actor used when neither a user id nor a peer address is known
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Shared application state
pub struct AppState<Se, L>
where
    Se: SearchProvider,
    L: LlmProvider,
{
    /// The confidence pipeline
    pub orchestrator: Arc<Orchestrator<SqliteStore, Se, L>>,
    /// Fork bias auditor
    pub auditor: Arc<ForkAuditor>,
    /// Actors allowed to manage guard blocks
    pub operators: Arc<HashSet<String>>,
}

impl<Se, L> Clone for AppState<Se, L>
where
    Se: SearchProvider,
    L: LlmProvider,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            auditor: Arc::clone(&self.auditor),
            operators: Arc::clone(&self.operators),
        }
    }
}

/// Identity of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// `x-user-id`, else the peer IP, else `anonymous`
    pub actor: String,
    /// Peer IP, when the server was started with connect info
    pub ip: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let actor = user_id
            .or_else(|| ip.clone())
            .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string());
        Ok(Caller { actor, ip })
    }
}

/// Analysis request body: exactly one of `query` or `theory_id`
#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    /// Free-text claim
    pub query: Option<String>,
    /// Stored theory id
    pub theory_id: Option<i64>,
    /// Purpose declared to the misuse guard; defaults to `analyze`
    pub action: Option<String>,
}

/// History query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Must match the caller when given
    pub actor: Option<String>,
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Page size
    pub per_page: Option<u32>,
}

/// Outcome request body
#[derive(Debug, Deserialize)]
pub struct OutcomeBody {
    /// Whether the source's claim was verified accurate
    pub accurate: bool,
}

/// Source listing parameters
#[derive(Debug, Deserialize)]
pub struct SourceParams {
    /// Credibility floor (0-100)
    pub min_credibility: Option<f64>,
}

/// Theory creation body
#[derive(Debug, Deserialize)]
pub struct TheoryBody {
    /// Short title
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
}

/// Fork audit body
#[derive(Debug, Deserialize)]
pub struct ForkAuditBody {
    /// Who published the fork
    pub author: String,
    /// Source code to inspect
    pub code: String,
}

/// One blocked actor
#[derive(Debug, Serialize, Deserialize)]
pub struct BlockedActorResponse {
    /// Blocked actor
    pub actor: String,
    /// Machine-readable block reason
    pub reason: String,
    /// Human-readable block reason
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Always "ok" while the process serves requests
    pub status: String,
    /// Version of the loaded historical corpus
    pub corpus_version: u32,
    /// Actors currently blocked
    pub blocked_actors: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Retry hint for rate-limited callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Pipeline rejection or failure
    Pipeline(PipelineError),
    /// Requested record does not exist
    NotFound(String),
    /// Caller may not access the resource
    Forbidden(String),
    /// Internal server error
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

/// HTTP status for a pipeline error
pub fn status_for(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::UnknownTheory(_) => StatusCode::NOT_FOUND,
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        PipelineError::ActorBlocked(_) => StatusCode::FORBIDDEN,
        PipelineError::SearchFailed(_)
        | PipelineError::SynthesisFailed(_)
        | PipelineError::MalformedSynthesis(_) => StatusCode::BAD_GATEWAY,
        PipelineError::SynthesisTimeout => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::StorageFailed(_) | PipelineError::Config(_) | PipelineError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Pipeline(e) => (
                status_for(&e),
                ErrorResponse {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    retry_after_secs: e.retry_after_secs(),
                },
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    kind: "not_found".to_string(),
                    message,
                    retry_after_secs: None,
                },
            ),
            AppError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    kind: "forbidden".to_string(),
                    message,
                    retry_after_secs: None,
                },
            ),
            AppError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    kind: "internal".to_string(),
                    message,
                    retry_after_secs: None,
                },
            ),
        };

        if status.is_server_error() {
            error!(kind = %body.kind, "{}", body.message);
        }

        let retry_after = body.retry_after_secs;
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// POST /analysis - Run the pipeline for a claim or stored theory
async fn analyze<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
    Json(body): Json<AnalyzeBody>,
) -> Result<(StatusCode, Json<AnalysisRecord>), AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    let request = match (body.query, body.theory_id) {
        (Some(query), None) => AnalysisRequest::claim(caller.actor, query),
        (None, Some(id)) => AnalysisRequest::theory(caller.actor, id),
        _ => {
            return Err(PipelineError::InvalidInput(
                "exactly one of query or theory_id is required".to_string(),
            )
            .into())
        }
    };
    let request = match caller.ip {
        Some(ip) => request.with_ip(ip),
        None => request,
    };
    let request = match body.action {
        Some(action) => request.with_action(action),
        None => request,
    };

    let record = state.orchestrator.analyze(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /analysis/:id - Load a persisted analysis
async fn get_analysis<Se, L>(
    State(state): State<AppState<Se, L>>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisRecord>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    let id = AnalysisId::from_string(&id).map_err(PipelineError::InvalidInput)?;
    state
        .orchestrator
        .get_analysis(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("analysis {} not found", id)))
}

/// GET /analysis - The caller's history, newest first
async fn list_analyses<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<AnalysisSummary>>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    if let Some(actor) = &params.actor {
        if *actor != caller.actor {
            return Err(AppError::Forbidden("history is only visible to its owner".to_string()));
        }
    }
    let history = state
        .orchestrator
        .list_analyses(&caller.actor, params.page, params.per_page)
        .await?;
    Ok(Json(history))
}

/// GET /watermarks/:code - Verify a watermark
async fn verify_watermark<Se, L>(
    State(state): State<AppState<Se, L>>,
    Path(code): Path<String>,
) -> Result<Json<Watermark>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    state
        .orchestrator
        .verify_watermark(&code)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("watermark {} not found", code)))
}

/// POST /sources/:domain/outcomes - Record a verification outcome
async fn record_outcome<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
    Path(domain): Path<String>,
    Json(body): Json<OutcomeBody>,
) -> Result<Json<Source>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    let outcome = if body.accurate {
        VerificationOutcome::Accurate
    } else {
        VerificationOutcome::Inaccurate
    };
    let source = state
        .orchestrator
        .record_outcome(&caller.actor, &domain, outcome)
        .await?;
    Ok(Json(source))
}

/// GET /sources - Sources ordered by credibility
async fn list_sources<Se, L>(
    State(state): State<AppState<Se, L>>,
    Query(params): Query<SourceParams>,
) -> Result<Json<Vec<Source>>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    let sources = state.orchestrator.list_sources(params.min_credibility).await?;
    Ok(Json(sources))
}

/// POST /theories - Store a theory
async fn create_theory<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
    Json(body): Json<TheoryBody>,
) -> Result<(StatusCode, Json<Theory>), AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    let theory = state
        .orchestrator
        .create_theory(&caller.actor, &body.title, &body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(theory)))
}

/// GET /theories - All stored theories
async fn list_theories<Se, L>(State(state): State<AppState<Se, L>>) -> Result<Json<Vec<Theory>>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    Ok(Json(state.orchestrator.list_theories().await?))
}

/// GET /theories/:id - Load a stored theory
async fn get_theory<Se, L>(
    State(state): State<AppState<Se, L>>,
    Path(id): Path<i64>,
) -> Result<Json<Theory>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    state
        .orchestrator
        .get_theory(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("theory {} not found", id)))
}

/// POST /audit/fork - Audit fork source code for bias
async fn audit_fork<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
    Json(body): Json<ForkAuditBody>,
) -> Result<Json<ForkAudit>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    if body.author.trim().is_empty() {
        return Err(PipelineError::InvalidInput("author must not be empty".to_string()).into());
    }
    state
        .orchestrator
        .admit(&caller.actor, AUDIT_FORK_ACTION, None)
        .await?;

    let auditor = Arc::clone(&state.auditor);
    let audit = tokio::task::spawn_blocking(move || auditor.audit(&body.author, &body.code))
        .await
        .map_err(|e| AppError::Internal(format!("Audit task failed: {}", e)))?;
    Ok(Json(audit))
}

fn require_operator<Se, L>(state: &AppState<Se, L>, caller: &Caller) -> Result<(), AppError>
where
    Se: SearchProvider,
    L: LlmProvider,
{
    if state.operators.contains(&caller.actor) {
        Ok(())
    } else {
        Err(AppError::Forbidden("guard blocks are only visible to operators".to_string()))
    }
}

/// GET /guard/blocks - Blocked actors and their reasons
async fn list_blocks<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
) -> Result<Json<Vec<BlockedActorResponse>>, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    require_operator(&state, &caller)?;
    let blocked = state
        .orchestrator
        .guard()
        .blocked_actors()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .into_iter()
        .map(|(actor, reason)| BlockedActorResponse {
            actor,
            reason: reason.code().to_string(),
            message: reason.to_string(),
        })
        .collect();
    Ok(Json(blocked))
}

/// DELETE /guard/blocks/:actor - Lift a block
async fn unblock_actor<Se, L>(
    State(state): State<AppState<Se, L>>,
    caller: Caller,
    Path(actor): Path<String>,
) -> Result<StatusCode, AppError>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    require_operator(&state, &caller)?;
    let lifted = state
        .orchestrator
        .guard()
        .unblock(&actor)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !lifted {
        return Err(AppError::NotFound(format!("actor {} is not blocked", actor)));
    }
    info!(actor = %actor, operator = %caller.actor, "Block lifted by operator");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health - Liveness
async fn health_check<Se, L>(State(state): State<AppState<Se, L>>) -> Json<HealthCheckResponse>
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    let blocked_actors = state
        .orchestrator
        .guard()
        .blocked_actors()
        .map(|actors| actors.len())
        .unwrap_or(0);

    Json(HealthCheckResponse {
        status: "ok".to_string(),
        corpus_version: state.orchestrator.matcher().corpus_version(),
        blocked_actors,
    })
}

/// Create the axum router with all routes
pub fn create_router<Se, L>(state: AppState<Se, L>) -> AxumRouter
where
    Se: SearchProvider + Send + Sync + 'static,
    Se::Error: Display + Send,
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display + Send,
{
    AxumRouter::new()
        .route("/analysis", post(analyze::<Se, L>).get(list_analyses::<Se, L>))
        .route("/analysis/:id", get(get_analysis::<Se, L>))
        .route("/watermarks/:code", get(verify_watermark::<Se, L>))
        .route("/sources", get(list_sources::<Se, L>))
        .route("/sources/:domain/outcomes", post(record_outcome::<Se, L>))
        .route("/theories", post(create_theory::<Se, L>).get(list_theories::<Se, L>))
        .route("/theories/:id", get(get_theory::<Se, L>))
        .route("/audit/fork", post(audit_fork::<Se, L>))
        .route("/guard/blocks", get(list_blocks::<Se, L>))
        .route("/guard/blocks/:actor", delete(unblock_actor::<Se, L>))
        .route("/health", get(health_check::<Se, L>))
        .with_state(state)
}
