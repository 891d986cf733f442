//! folio-api - HTTP API server for folio

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use folio_core::{
    defaults, AuthUser, CreateUserRequest, LoginRequest, SessionRepository, TreeProvider,
    UpdateUserRequest, UserRepository,
};
use folio_db::{Database, PoolConfig};
use folio_drive::{DriveClient, DriveConfig};
use folio_search::SearchService;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful
/// for log correlation and debugging.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = folio_core::new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Server configuration assembled from the environment at startup.
///
/// Handlers never read environment variables; everything they need is
/// resolved here and carried in [`AppState`].
struct AppConfig {
    host: String,
    port: u16,
    database_url: String,
    db_max_connections: u32,
    session_ttl_days: i64,
    drive: DriveConfig,
}

impl AppConfig {
    fn from_env() -> folio_core::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| defaults::HOST.to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults::PORT);
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| folio_core::Error::Config("DATABASE_URL is not set".to_string()))?;
        let db_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(folio_db::pool::DEFAULT_MAX_CONNECTIONS);
        let session_ttl_days = std::env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::SESSION_TTL_DAYS);
        let drive = DriveConfig::from_env()?;

        Ok(Self {
            host,
            port,
            database_url,
            db_max_connections,
            session_ttl_days,
            drive,
        })
    }
}

/// Parse the `ALLOWED_ORIGINS` environment variable into CORS origins.
///
/// Comma-separated list; invalid entries are skipped with a warning.
/// Defaults to the local frontend dev server when unset.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str =
        std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());

    if origins_str.trim().is_empty() {
        return vec![HeaderValue::from_static("http://localhost:3000")];
    }

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// APP STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    drive: Arc<DriveClient>,
    search: Arc<SearchService<DriveClient>>,
    /// Lifetime of newly issued sessions.
    session_ttl_days: i64,
}

// =============================================================================
// SESSIONS
// =============================================================================

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        defaults::SESSION_COOKIE,
        token,
        max_age_secs
    )
}

fn clear_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        defaults::SESSION_COOKIE
    )
}

/// Pull the session token out of the `Cookie` header, if present.
fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == defaults::SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Resolve the caller's identity from the session cookie.
///
/// Every request gets an `Option<AuthUser>` extension; expired tokens
/// and disabled accounts resolve to `None`. Enforcement lives in the
/// [`CurrentUser`] and [`AdminUser`] extractors, not here.
async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match session_token_from_headers(request.headers()) {
        Some(token) => state.db.sessions.find_user(&token).await?,
        None => None,
    };
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Extractor for routes that require a signed-in caller.
///
/// Reads the identity resolved by [`session_middleware`]; rejects with
/// 401 when the request carries no valid session.
#[derive(Debug, Clone)]
struct CurrentUser {
    user: AuthUser,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<Option<AuthUser>>()
            .cloned()
            .flatten()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        Ok(CurrentUser { user })
    }
}

/// Extractor for routes reserved for administrators.
#[derive(Debug, Clone)]
struct AdminUser {
    user: AuthUser,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        if !current.user.has_admin_rights() {
            return Err(ApiError::Forbidden(
                "Administrator rights required".to_string(),
            ));
        }
        Ok(AdminUser { user: current.user })
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "folio_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "folio_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("folio-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env()?;

    // Connect to database
    info!("Connecting to database...");
    let pool_config = PoolConfig::new().max_connections(config.db_max_connections);
    let db = Database::connect_with_config(&config.database_url, pool_config).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Drive client and the search service built on top of it
    let drive = Arc::new(DriveClient::with_config(config.drive.clone()));
    let search = Arc::new(SearchService::new(drive.clone(), db.clone()));

    let state = AppState {
        db,
        drive,
        search,
        session_ttl_days: config.session_ttl_days,
    };

    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full application router with its middleware stack.
fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/me", get(me))
        // Folder tree
        .route("/api/v1/folders", get(list_folders))
        .route("/api/v1/folders/:id", get(get_folder))
        .route("/api/v1/folders/:id/contents", get(get_folder_contents))
        .route("/api/v1/files/:id", get(get_file))
        // Search
        .route("/api/v1/search", get(search))
        // User management
        .route("/api/v1/users", get(list_users).post(create_user))
        .route(
            "/api/v1/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/v1/users/:id/role", put(set_user_role))
        .route("/api/v1/users/:id/password", put(set_user_password))
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            // Credentials are allowed so the session cookie crosses origins.
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        .layer(RequestBodyLimitLayer::new(defaults::BODY_LIMIT_BYTES))
        .with_state(state)
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// AUTH HANDLERS
// =============================================================================

/// Sign in with username and password.
///
/// On success the response sets the session cookie and returns the full
/// account record, including `force_password_change` so clients know to
/// prompt for a new password.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users
        .validate_login(&body.username, &body.password)
        .await?;

    let expires = Utc::now() + Duration::days(state.session_ttl_days);
    let token = state.db.sessions.create(user.id, expires).await?;

    debug!(
        subsystem = "api",
        op = "login",
        username = %user.username,
        "Session issued"
    );

    let cookie = session_cookie(&token, state.session_ttl_days * 24 * 60 * 60);
    Ok(([(header::SET_COOKIE, cookie)], Json(user)))
}

/// Sign out, revoking every session the caller holds.
async fn logout(
    State(state): State<AppState>,
    auth: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.db.sessions.delete_for_user(auth.user.id).await?;

    debug!(
        subsystem = "api",
        op = "logout",
        username = %auth.user.username,
        removed,
        "Sessions revoked"
    );

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie())],
    ))
}

async fn me(auth: CurrentUser) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(auth.user))
}

// =============================================================================
// FOLDER TREE HANDLERS
// =============================================================================

async fn list_folders(
    State(state): State<AppState>,
    _auth: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let folders = state.drive.list_root_folders().await?;
    Ok(Json(folders))
}

async fn get_folder(
    State(state): State<AppState>,
    _auth: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let folder = state.drive.get_folder(&id).await?;
    Ok(Json(folder))
}

async fn get_folder_contents(
    State(state): State<AppState>,
    _auth: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let nodes = state.drive.list_children(&id).await?;
    Ok(Json(nodes))
}

async fn get_file(
    State(state): State<AppState>,
    _auth: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let file = state.drive.get_file(&id).await?;
    Ok(Json(file))
}

// =============================================================================
// SEARCH HANDLER
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

/// Substring search across file titles and cached contents.
async fn search(
    State(state): State<AppState>,
    _auth: CurrentUser,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let results = state.search.search(&params.q).await?;
    Ok(Json(results))
}

// =============================================================================
// USER HANDLERS
// =============================================================================

async fn list_users(
    State(state): State<AppState>,
    _auth: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users.list().await?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<AppState>,
    auth: AdminUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.db.users.create(body).await?;

    debug!(
        subsystem = "api",
        op = "create_user",
        actor = %auth.user.username,
        username = %created.username,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let found = state
        .db
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;
    Ok(Json(found))
}

async fn update_user(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.db.users.update(id, body).await?;
    Ok(Json(updated))
}

async fn delete_user(
    State(state): State<AppState>,
    auth: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.users.delete(id).await?;

    debug!(
        subsystem = "api",
        op = "delete_user",
        actor = %auth.user.username,
        user_id = %id,
        "User deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SetRoleBody {
    is_admin: bool,
}

async fn set_user_role(
    State(state): State<AppState>,
    _auth: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRoleBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.users.set_role(id, body.is_admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SetPasswordBody {
    password: String,
}

/// Change a password.
///
/// Users may change their own; changing anyone else's requires admin
/// rights.
async fn set_user_password(
    State(state): State<AppState>,
    auth: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SetPasswordBody>,
) -> Result<impl IntoResponse, ApiError> {
    if auth.user.id != id && !auth.user.has_admin_rights() {
        return Err(ApiError::Forbidden(
            "Cannot change another user's password".to_string(),
        ));
    }
    state.db.users.set_password(id, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Database(folio_core::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<folio_core::Error> for ApiError {
    fn from(err: folio_core::Error) -> Self {
        match &err {
            folio_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            folio_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            folio_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            folio_core::Error::Forbidden(msg) => ApiError::Forbidden(msg.clone()),
            folio_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    let friendly_msg = if msg.contains("username") {
                        "A user with this username already exists".to_string()
                    } else {
                        msg
                    };
                    return ApiError::Conflict(friendly_msg);
                }
                ApiError::Database(err)
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
