//! Per-visitor selection state. Each session sits behind its own async mutex
//! so one session's events are processed strictly one after another, while
//! different sessions render independently.

use crate::binder::{dependents, Dashboard, DashboardView, InputEvent};
use crate::config::ServerConfig;
use crate::error::RenderError;
use crate::filter::Selection;
use moka::future::Cache;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// 128 random bits, hex encoded. Also names the session's artifact
/// directory, so only ids of exactly this shape are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    const LEN: usize = 32;

    pub fn generate() -> Self {
        SessionId(format!("{:032x}", rand::thread_rng().gen::<u128>()))
    }

    pub fn parse(value: &str) -> Option<Self> {
        let valid = value.len() == Self::LEN && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| SessionId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    selection: Selection,
    view: Option<Arc<DashboardView>>,
    renders: u64,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self { id, selection: Selection::default(), view: None, renders: 0 }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Bumped on every render; used to bust image caches.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// The current view, rendering it first if the session has none yet.
    pub fn view(&mut self, dashboard: &Dashboard) -> Result<Arc<DashboardView>, RenderError> {
        match &self.view {
            Some(view) => Ok(view.clone()),
            None => {
                let selection = self.selection.clone();
                self.rerender(selection, dashboard)
            }
        }
    }

    /// Applies one selector change and regenerates every dependent output.
    /// On failure the session keeps its previous selection and view.
    pub fn apply(&mut self, event: &InputEvent, dashboard: &Dashboard) -> Result<Arc<DashboardView>, RenderError> {
        let next = event.apply(&self.selection, &dashboard.datasets().venues);
        debug!(
            session = %self.id,
            input = ?event.input(),
            outputs = ?dependents(event.input()),
            "Selection changed"
        );
        self.rerender(next, dashboard)
    }

    /// Selection and view are only replaced together.
    fn rerender(&mut self, selection: Selection, dashboard: &Dashboard) -> Result<Arc<DashboardView>, RenderError> {
        let view = Arc::new(dashboard.render(&selection)?);
        dashboard.persist(self.id.as_str(), &view)?;
        self.selection = selection;
        self.view = Some(view.clone());
        self.renders += 1;
        Ok(view)
    }
}

/// All live sessions. Bounded in size, and a session nobody has touched
/// for `idle` is dropped.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Cache<SessionId, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new(max_sessions: u64, idle: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle)
            .build();
        Self { sessions }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.max_sessions, Duration::from_secs(config.session_idle_secs))
    }

    pub async fn create(&self) -> SessionId {
        let id = SessionId::generate();
        let session = Arc::new(Mutex::new(Session::new(id.clone())));
        self.sessions.insert(id.clone(), session).await;
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(id).await
    }

    /// Live sessions after pending evictions have been applied.
    pub async fn len(&self) -> u64 {
        self.sessions.run_pending_tasks().await;
        self.sessions.entry_count()
    }
}
