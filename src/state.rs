use std::env;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::chat::session::{ChatSession, SessionStore};
use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::core::errors::ApiError;
use crate::core::security::{init_session_token, SessionToken};
use crate::cortex::{
    CompletionBackend, CortexCompleteClient, CortexSearchClient, RetrievalBackend,
    ServiceDescriptor,
};

/// Live clients for the configured Snowflake account.
#[derive(Clone)]
pub struct BackendHandles {
    pub completion: Arc<dyn CompletionBackend>,
    pub retrieval: Arc<dyn RetrievalBackend>,
}

/// Global application state shared across all routes.
///
/// Backend clients and the discovered service roster live behind locks so
/// a config update or an explicit refresh can swap them while the server
/// is running. A missing or broken backend never prevents startup; chat
/// stays disabled until a refresh succeeds.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub session_token: SessionToken,
    pub sessions: SessionStore,
    pub started_at: DateTime<Utc>,
    backends: RwLock<Option<BackendHandles>>,
    services: RwLock<Vec<ServiceDescriptor>>,
}

impl AppState {
    pub async fn initialize() -> Arc<Self> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let session_token = init_session_token();

        let state = Arc::new(AppState {
            paths,
            config,
            session_token,
            sessions: SessionStore::default(),
            started_at: Utc::now(),
            backends: RwLock::new(None),
            services: RwLock::new(Vec::new()),
        });

        if let Err(err) = state.refresh_backends().await {
            warn!("Starting without a usable backend: {}", err);
        }

        state
    }

    /// Current config as typed settings. `REMEDIA_API_TOKEN` overrides the
    /// stored token so deployments can keep it out of the config files.
    pub fn settings(&self) -> Settings {
        let mut settings = match self.config.settings() {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Failed to load config, using defaults: {}", err);
                Settings::from_value(&serde_json::Value::Null)
            }
        };
        if let Ok(token) = env::var("REMEDIA_API_TOKEN") {
            if !token.trim().is_empty() {
                settings.connection.api_token = token;
            }
        }
        settings
    }

    /// Rebuilds the Snowflake clients from the current config and re-runs
    /// service discovery. Returns the number of discovered services.
    pub async fn refresh_backends(&self) -> Result<usize, ApiError> {
        let settings = self.settings();
        if !settings.configured() {
            *self.backends.write().await = None;
            self.services.write().await.clear();
            return Err(ApiError::ServiceUnavailable(
                "backend is not configured".to_string(),
            ));
        }

        let completion = CortexCompleteClient::new(settings.connection.clone())?;
        let retrieval = CortexSearchClient::new(settings.connection)?;
        let handles = BackendHandles {
            completion: Arc::new(completion),
            retrieval: Arc::new(retrieval),
        };

        let discovered = handles.retrieval.list_services().await;
        *self.backends.write().await = Some(handles);

        match discovered {
            Ok(services) => {
                let count = services.len();
                info!("Discovered {} search services", count);
                *self.services.write().await = services;
                Ok(count)
            }
            Err(err) => {
                self.services.write().await.clear();
                Err(err.into())
            }
        }
    }

    pub async fn backends(&self) -> Option<BackendHandles> {
        self.backends.read().await.clone()
    }

    pub async fn services_snapshot(&self) -> Vec<ServiceDescriptor> {
        self.services.read().await.clone()
    }

    /// Session lookup, creating on first touch with the config defaults.
    pub fn session(&self, id: &str) -> Arc<ChatSession> {
        let defaults = self.settings().default_options;
        self.sessions.get_or_create_with(id, defaults)
    }
}
