//! Application state management

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::auth::{CredentialStore, SessionManager};
use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::storage::UploadStore;
use crate::templates::Templates;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    credentials: CredentialStore,
    sessions: SessionManager,
    uploads: UploadStore,
    templates: Templates,
}

impl AppState {
    /// Open the database and upload directory, seed the default account, and
    /// assemble the state the router runs on.
    pub async fn bootstrap(config: Config) -> Result<Self> {
        let pool = db::create_pool(&config.database.url).await?;
        tracing::info!("Database initialized at {}", config.database.url);

        let credentials = CredentialStore::new(pool)?;
        credentials.initialize(&config.seed).await?;
        tracing::info!("{} account(s) available", credentials.count_users().await?);

        let uploads = UploadStore::open(&config.uploads.dir).await?;
        tracing::info!("Uploads stored in {}", uploads.root().display());

        let sessions = SessionManager::new(&config.session);
        let templates = Templates::new()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                credentials,
                sessions,
                uploads,
                templates,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    pub fn templates(&self) -> &Templates {
        &self.inner.templates
    }
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        state.inner.sessions.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.inner.sessions.key().clone()
    }
}
