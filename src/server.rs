use crate::binder::{Dashboard, DashboardView, InputEvent};
use crate::config::{AppConfig, ServerConfig};
use crate::error::RenderError;
use crate::index::VenueAnnotation;
use crate::page::render_page;
use crate::render::ImageArtifact;
use crate::session::{Session, SessionId, SessionStore};
use crate::summary::CategoryCard;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub struct AppState {
    pub dashboard: Dashboard,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(dashboard: Dashboard, config: &ServerConfig) -> Self {
        Self { dashboard, sessions: SessionStore::from_config(config) }
    }

    async fn session(&self, id: &str) -> Result<Arc<Mutex<Session>>, ApiError> {
        let unknown = || ApiError::UnknownSession(id.to_string());
        let id = SessionId::parse(id).ok_or_else(unknown)?;
        self.sessions.get(&id).await.ok_or_else(unknown)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown session '{0}'")]
    UnknownSession(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct InputParams {
    province: Option<String>,
    department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HoverParams {
    lat: f64,
    lon: f64,
    radius: Option<f64>,
}

impl HoverParams {
    fn validate(&self) -> Result<(), ApiError> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(ApiError::BadRequest("lat and lon must be finite numbers".into()));
        }
        match self.radius {
            Some(r) if !r.is_finite() || r < 0.0 => {
                Err(ApiError::BadRequest("radius must be a finite, non-negative number".into()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    id: String,
    renders: u64,
    province: String,
    department: String,
    province_options: Vec<String>,
    department_options: Vec<String>,
    cards: Vec<CategoryCard>,
    attendance: Vec<AttendanceBand>,
    venue_count: usize,
    bar_chart_alt: &'static str,
    map_alt: &'static str,
}

#[derive(Debug, Serialize)]
struct AttendanceBand {
    band: &'static str,
    mean: f64,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/session/{id}", get(page_handler))
        .route("/session/{id}/input", get(input_handler))
        .route("/session/{id}/bar_chart.svg", get(bar_chart_handler))
        .route("/session/{id}/map.svg", get(map_handler))
        .route("/api/session/{id}", get(snapshot_handler))
        .route("/api/session/{id}/venue", get(venue_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dashboard: Dashboard) -> Result<()> {
    let state = Arc::new(AppState::new(dashboard, &config.server));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Redirect {
    let id = state.sessions.create().await;
    info!(session = %id, "New session");
    Redirect::to(&format!("/session/{id}"))
}

async fn health_handler() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(serde_json::json!({ "status": "up", "version": env!("CARGO_PKG_VERSION") })),
    )
}

async fn current_view(state: &AppState, id: &str) -> Result<(SessionId, u64, Arc<DashboardView>), ApiError> {
    let session = state.session(id).await?;
    let mut session = session.lock().await;
    let view = session.view(&state.dashboard)?;
    Ok((session.id().clone(), session.renders(), view))
}

async fn page_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Html<String>, ApiError> {
    let (id, renders, view) = current_view(&state, &id).await?;
    Ok(Html(render_page(
        &id,
        renders,
        &view,
        state.dashboard.province_options(),
        state.dashboard.viewport(),
    )))
}

/// The form submits both selectors at once; a province that differs from
/// the current one is a province change, anything else a department change.
async fn input_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<InputParams>,
) -> Result<Redirect, ApiError> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    let current = session.selection().province().as_str().to_string();
    let event = match (params.province, params.department) {
        (Some(province), _) if province != current => Some(InputEvent::Province(province)),
        (_, Some(department)) => Some(InputEvent::Department(department)),
        _ => None,
    };
    if let Some(event) = event {
        session.apply(&event, &state.dashboard)?;
    }

    Ok(Redirect::to(&format!("/session/{}", session.id())))
}

fn svg_response(artifact: &ImageArtifact) -> Response {
    (
        [
            (header::CONTENT_TYPE, ImageArtifact::CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        artifact.svg.clone(),
    )
        .into_response()
}

async fn bar_chart_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let (_, _, view) = current_view(&state, &id).await?;
    Ok(svg_response(&view.bar_chart))
}

async fn map_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let (_, _, view) = current_view(&state, &id).await?;
    Ok(svg_response(&view.map))
}

async fn snapshot_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<SessionSnapshot>, ApiError> {
    let (id, renders, view) = current_view(&state, &id).await?;
    Ok(Json(SessionSnapshot {
        id: id.to_string(),
        renders,
        province: view.selection.province().as_str().to_string(),
        department: view.selection.department().as_str().to_string(),
        province_options: state.dashboard.province_options().to_vec(),
        department_options: view.department_options.clone(),
        cards: view.cards.clone(),
        attendance: view.attendance.iter()
            .map(|(band, mean)| AttendanceBand { band: band.label(), mean })
            .collect(),
        venue_count: view.venue_count,
        bar_chart_alt: view.bar_chart.alt,
        map_alt: view.map.alt,
    }))
}

async fn venue_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<HoverParams>,
) -> Result<Json<Option<VenueAnnotation>>, ApiError> {
    params.validate()?;
    let session = state.session(&id).await?;
    let selection = session.lock().await.selection().clone();

    let hit = state.dashboard.index().nearest(
        &state.dashboard.datasets().venues,
        Point::new(params.lon, params.lat),
        &selection,
        params.radius,
    );
    Ok(Json(hit))
}
