//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/projects` | Browse projects with structured filters |
//! | `GET`  | `/search` | Simple search over the local index |
//! | `GET`  | `/filters` | Skill/sector vocabularies for filter UIs |
//! | `POST` | `/admin/extract` | Extract a candidate profile from free text |
//! | `POST` | `/admin/prepare` | Normalize + moderate an extracted profile |
//! | `POST` | `/revalidate` | Invalidate cached pages (shared secret) |
//! | `POST` | `/index` | Run the indexing job (shared secret) |
//! | `POST` | `/leads` | Record a lead, forward to the CRM webhook |
//! | `POST` | `/sharepacks` | Record a sharepack event |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "text must be at least 20 characters" } }
//! ```
//!
//! Codes: `bad_request` (400), `unauthorized` (401), `provider_disabled`
//! (400), `upstream` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted: the browse and search
//! endpoints are consumed directly from the browser.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::browse::{self, ProjectCriteria};
use crate::config::Config;
use crate::content::ContentClient;
use crate::extraction::{self, MIN_INPUT_CHARS};
use crate::index_job;
use crate::leads::{self, LeadRequest};
use crate::migrate;
use crate::models::ExtractedPerson;
use crate::moderation::{self, ModerationReport};
use crate::prepare::{self, SkillChanges};
use crate::revalidate::{self, RevalidateRequest};
use crate::search::{self, SearchKind, SearchRequest};
use crate::taxonomy;
use crate::{db, models::PreparedPerson};

/// Shared application state. The pool is the only process-wide resource:
/// created once at boot, cloned cheaply into handlers, drained on shutdown.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub content: Arc<ContentClient>,
}

/// Build the router. Split out from [`run_server`] so tests can drive the
/// handlers in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/projects", get(handle_browse))
        .route("/search", get(handle_search))
        .route("/filters", get(handle_filters))
        .route("/admin/extract", post(handle_extract))
        .route("/admin/prepare", post(handle_prepare))
        .route("/revalidate", post(handle_revalidate))
        .route("/index", post(handle_index))
        .route("/leads", post(handle_lead))
        .route("/sharepacks", post(handle_sharepack))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server: connect the pool, ensure the schema, serve until
/// ctrl-c/SIGTERM, then drain the pool.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool: pool.clone(),
        content: Arc::new(ContentClient::new(&config.content)?),
    };

    let app = router(state);

    tracing::info!("lookbook listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

fn upstream(err: anyhow::Error) -> AppError {
    // Provider/config problems read better as client errors.
    let msg = err.to_string();
    if msg.contains("disabled") {
        return AppError {
            status: StatusCode::BAD_REQUEST,
            code: "provider_disabled".to_string(),
            message: msg,
        };
    }
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream".to_string(),
        message: msg,
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
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

// ============ GET /projects ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseParams {
    term: Option<String>,
    cohort: Option<String>,
    /// Comma-separated industry list; all must be present.
    industries: Option<String>,
    has_demo_video: Option<bool>,
    open_to_relocate: Option<bool>,
    open_to_work: Option<bool>,
    freelance: Option<bool>,
    nyc_based: Option<bool>,
    remote_only: Option<bool>,
    page: Option<usize>,
    per_page: Option<usize>,
}

async fn handle_browse(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<browse::BrowsePage>, AppError> {
    let criteria = ProjectCriteria {
        term: params.term,
        cohort: params.cohort,
        industries: taxonomy::comma_list(params.industries.as_deref()),
        has_demo_video: params.has_demo_video,
        open_to_relocate: params.open_to_relocate,
        open_to_work: params.open_to_work,
        freelance: params.freelance,
        nyc_based: params.nyc_based,
        remote_only: params.remote_only,
        page: params.page,
        per_page: params.per_page,
    };

    let page = browse::browse_projects(&state.content, &criteria)
        .await
        .map_err(upstream)?;
    Ok(Json(page))
}

// ============ GET /search ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    q: Option<String>,
    skills: Option<String>,
    sectors: Option<String>,
    open_to_work: Option<bool>,
    kind: Option<String>,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<search::SearchResults>, AppError> {
    let kind = SearchKind::parse(params.kind.as_deref()).map_err(|e| bad_request(e.to_string()))?;

    let request = SearchRequest {
        query: params.q.unwrap_or_default(),
        skills: taxonomy::comma_list(params.skills.as_deref()),
        sectors: taxonomy::comma_list(params.sectors.as_deref()),
        open_to_work: params.open_to_work,
        kind,
        limit: search::clamp_limit(params.limit),
    };

    let results = search::run_search(&state.pool, &request)
        .await
        .map_err(internal)?;
    Ok(Json(results))
}

// ============ GET /filters ============

#[derive(Serialize)]
struct FiltersResponse {
    skills: Vec<String>,
    sectors: Vec<String>,
}

async fn handle_filters(
    State(state): State<AppState>,
) -> Result<Json<FiltersResponse>, AppError> {
    let projects = state.content.fetch_projects().await.map_err(upstream)?;
    Ok(Json(FiltersResponse {
        skills: taxonomy::unique_skills(&projects),
        sectors: taxonomy::unique_sectors(&projects),
    }))
}

// ============ POST /admin/extract ============

#[derive(Deserialize)]
struct ExtractBody {
    text: String,
}

#[derive(Serialize)]
struct ExtractResponse {
    profile: ExtractedPerson,
    /// `well_formed`, `salvaged`, or `unparseable`.
    parse: &'static str,
}

async fn handle_extract(
    State(state): State<AppState>,
    Json(body): Json<ExtractBody>,
) -> Result<Json<ExtractResponse>, AppError> {
    if body.text.trim().chars().count() < MIN_INPUT_CHARS {
        return Err(bad_request(format!(
            "text must be at least {} characters",
            MIN_INPUT_CHARS
        )));
    }

    let parsed = extraction::extract_person(&state.config.extraction, &body.text)
        .await
        .map_err(upstream)?;
    let (profile, parse) = parsed.into_parts();

    Ok(Json(ExtractResponse { profile, parse }))
}

// ============ POST /admin/prepare ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrepareBody {
    profile: ExtractedPerson,
    source_text: Option<String>,
}

#[derive(Serialize)]
struct PrepareResponse {
    profile: PreparedPerson,
    moderation: ModerationReport,
    changes: SkillChanges,
}

async fn handle_prepare(
    State(state): State<AppState>,
    Json(body): Json<PrepareBody>,
) -> Result<Json<PrepareResponse>, AppError> {
    let (profile, changes) = prepare::prepare_person(&body.profile);

    let moderation = moderation::moderate(
        &state.config.moderation,
        &profile,
        body.source_text.as_deref(),
    )
    .await
    .map_err(upstream)?;

    Ok(Json(PrepareResponse {
        profile,
        moderation,
        changes,
    }))
}

// ============ POST /revalidate ============

async fn handle_revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RevalidateRequest>,
) -> Result<Json<revalidate::RevalidateOutcome>, AppError> {
    let supplied = headers
        .get("x-revalidate-secret")
        .and_then(|v| v.to_str().ok());
    if supplied != Some(state.config.revalidate.secret.as_str()) {
        return Err(unauthorized("invalid revalidation secret"));
    }

    let paths = revalidate::invalidation_paths(&body);
    let outcome = revalidate::invalidate(&state.config.revalidate, paths)
        .await
        .map_err(upstream)?;
    Ok(Json(outcome))
}

// ============ POST /index ============

#[derive(Deserialize)]
struct IndexParams {
    secret: Option<String>,
}

async fn handle_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<IndexParams>,
) -> Result<Json<index_job::IndexReport>, AppError> {
    let supplied = headers
        .get("x-index-secret")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(params.secret);
    if supplied.as_deref() != Some(state.config.index.secret.as_str()) {
        return Err(unauthorized("invalid index secret"));
    }

    let report = index_job::run_index(&state.config, &state.pool, &state.content)
        .await
        .map_err(upstream)?;
    Ok(Json(report))
}

// ============ POST /leads ============

async fn handle_lead(
    State(state): State<AppState>,
    Json(body): Json<LeadRequest>,
) -> Result<Json<leads::ForwardOutcome>, AppError> {
    // Best-effort: the CRM log must never block the lead response.
    leads::record_event_best_effort(
        &state.pool,
        "lead",
        body.email.as_deref(),
        body.note.as_deref(),
        &body.people_slugs,
        &body.project_slugs,
    )
    .await;

    let outcome = leads::forward_lead(&state.config.leads, &body)
        .await
        .map_err(upstream)?;
    Ok(Json(outcome))
}

// ============ POST /sharepacks ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SharepackResponse {
    recorded: bool,
    people_count: usize,
    project_count: usize,
}

async fn handle_sharepack(
    State(state): State<AppState>,
    Json(body): Json<LeadRequest>,
) -> Result<Json<SharepackResponse>, AppError> {
    leads::record_event_best_effort(
        &state.pool,
        "sharepack",
        body.email.as_deref(),
        body.note.as_deref(),
        &body.people_slugs,
        &body.project_slugs,
    )
    .await;

    Ok(Json(SharepackResponse {
        recorded: true,
        people_count: body.people_slugs.len(),
        project_count: body.project_slugs.len(),
    }))
}
