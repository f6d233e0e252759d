mod error;
mod routes;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tutordesk_core::availability::AvailabilityManager;
use tutordesk_core::config::TutordeskConfig;
use tutordesk_core::history::HistoryLogger;
use tutordesk_core::profile::ProfileStore;
use tutordesk_core::remote::{self, Source};
use tutordesk_core::sessions::SessionService;
use tutordesk_core::storage::{self, Storage};

pub struct AppState {
    /// Never held across an await.
    pub availability: Mutex<AvailabilityManager<Storage>>,
    pub profiles: ProfileStore<Storage>,
    pub sessions: Arc<SessionService<Source>>,
    pub config: TutordeskConfig,
    pub history: HistoryLogger,
}

impl AppState {
    pub fn new(
        config: TutordeskConfig,
        storage: Storage,
        source: Source,
        history: HistoryLogger,
    ) -> Self {
        let availability =
            AvailabilityManager::load(storage.clone(), &config.availability.storage_key);
        Self {
            availability: Mutex::new(availability),
            profiles: ProfileStore::new(storage),
            sessions: Arc::new(SessionService::new(source)),
            config,
            history,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutordesk_web=info".parse().unwrap()),
        )
        .init();

    let cwd = std::env::current_dir().ok();
    let config = TutordeskConfig::load(cwd.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        TutordeskConfig::default_config()
    });

    let storage = storage::create_backend(&config)?;
    let source = remote::create_source(&config)?;
    let history = HistoryLogger::with_path(config.history_path(), config.history.enabled);

    if let (Source::Rest(rest), true) = (&source, config.remote.poll_seconds > 0) {
        rest.start_polling(Duration::from_secs(config.remote.poll_seconds));
    }

    let state = Arc::new(AppState::new(config.clone(), storage, source, history));

    if let Err(e) = state.sessions.refresh().await {
        tracing::warn!("initial session fetch failed: {e}");
    }
    state.sessions.clone().watch();

    let app = routes::router()
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.web.host, config.web.port);
    tracing::info!("tutordesk-web listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
