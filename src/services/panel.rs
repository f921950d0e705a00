use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::DEFAULT_RSS_INTERVAL;
use crate::database::connection::DatabaseManager;
use crate::database::models::{
    KeywordKind, RssFeed, RssKeyword, Setting, MAX_RSS_INTERVAL, MIN_RSS_INTERVAL,
};
use crate::utils::logging::log_database_error;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordRequest {
    pub keyword: String,
    #[serde(rename = "type")]
    pub kind: KeywordKind,
}

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    #[serde(rename = "type")]
    pub kind: Option<KeywordKind>,
}

/// Rows affected by a write, in the shape the panel expects.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Changes {
    pub changes: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntervalBody {
    pub minutes: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub start_time: DateTime<Utc>,
    /// Bearer token required on `/api/*`; open when `None`.
    pub api_token: Option<String>,
    /// Interval reported when none is stored.
    pub default_interval: u32,
}

/// Error reply of the admin API: a status plus `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        log_database_error("admin api", "-", &e.to_string(), None);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "database error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub struct PanelService {
    pub router: Router,
}

impl PanelService {
    pub fn new(db: Arc<DatabaseManager>, api_token: Option<String>) -> Self {
        Self::with_default_interval(db, api_token, DEFAULT_RSS_INTERVAL)
    }

    pub fn with_default_interval(
        db: Arc<DatabaseManager>,
        api_token: Option<String>,
        default_interval: u32,
    ) -> Self {
        let state = AppState {
            db,
            start_time: Utc::now(),
            api_token: api_token.filter(|t| !t.trim().is_empty()),
            default_interval,
        };

        let api = Router::new()
            .route("/feeds", get(list_feeds))
            .route("/feeds/:id", delete(delete_feed))
            .route(
                "/keywords",
                get(list_keywords).post(add_keyword).delete(delete_keyword),
            )
            .route(
                "/settings/rss-interval",
                get(get_interval).put(put_interval),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .nest("/api", api)
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented == Some(expected) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response()
    }
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();
    let healthy = test_database_connection(&state.db).await.is_ok();
    let response_time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    if !healthy {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        uptime_seconds: uptime,
    }))
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match test_database_connection(&state.db).await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

async fn test_database_connection(db: &DatabaseManager) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").fetch_one(&db.pool).await?;
    Ok(())
}

async fn list_feeds(State(state): State<AppState>) -> ApiResult<Vec<RssFeed>> {
    Ok(Json(RssFeed::list_all(&state.db.pool).await?))
}

async fn delete_feed(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Changes> {
    let changes = RssFeed::delete_by_id(&state.db.pool, id).await?;
    if changes == 0 {
        return Err(ApiError::not_found(format!("feed {} not found", id)));
    }
    Ok(Json(Changes { changes }))
}

async fn list_keywords(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Vec<RssKeyword>> {
    let kinds = match query.kind {
        Some(kind) => vec![kind],
        None => vec![KeywordKind::Include, KeywordKind::Exclude],
    };

    let mut keywords = Vec::new();
    for kind in kinds {
        keywords.extend(RssKeyword::list(&state.db.pool, kind).await?);
    }
    Ok(Json(keywords))
}

fn clean_keyword(raw: &str) -> Result<&str, ApiError> {
    let keyword = raw.trim();
    if keyword.is_empty() {
        return Err(ApiError::bad_request("keyword must not be empty"));
    }
    Ok(keyword)
}

async fn add_keyword(
    State(state): State<AppState>,
    Json(body): Json<KeywordRequest>,
) -> ApiResult<Changes> {
    let keyword = clean_keyword(&body.keyword)?;
    let changes = RssKeyword::add(&state.db.pool, keyword, body.kind).await?;
    Ok(Json(Changes { changes }))
}

async fn delete_keyword(
    State(state): State<AppState>,
    Json(body): Json<KeywordRequest>,
) -> ApiResult<Changes> {
    let keyword = clean_keyword(&body.keyword)?;
    let changes = RssKeyword::delete(&state.db.pool, keyword, body.kind).await?;
    Ok(Json(Changes { changes }))
}

async fn get_interval(State(state): State<AppState>) -> ApiResult<IntervalBody> {
    let minutes = Setting::effective_rss_interval(&state.db.pool, state.default_interval).await?;
    Ok(Json(IntervalBody { minutes }))
}

async fn put_interval(
    State(state): State<AppState>,
    Json(body): Json<IntervalBody>,
) -> ApiResult<IntervalBody> {
    let minutes = body.minutes;
    if !(MIN_RSS_INTERVAL..=MAX_RSS_INTERVAL).contains(&minutes) {
        return Err(ApiError::bad_request(format!(
            "minutes must be between {} and {}",
            MIN_RSS_INTERVAL, MAX_RSS_INTERVAL
        )));
    }
    Setting::set_rss_interval(&state.db.pool, minutes).await?;
    Ok(Json(IntervalBody { minutes }))
}
