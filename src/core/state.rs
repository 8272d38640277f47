use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::session::registry::SessionRegistry;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    sessions: SessionRegistry,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, sessions: SessionRegistry) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}
