//! Where sessions come from: a hosted REST table or an in-memory fake.

mod fixtures;
mod memory;
mod rest;

pub use fixtures::demo_sessions;
pub use memory::MemorySessionSource;
pub use rest::RestSessionSource;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::TutordeskConfig;
use crate::error::{Result, TutordeskError};
use crate::model::{Session, SessionStatus};

/// Capacity of each source's change channel. Lagging receivers just refetch.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A signal that the remote collection changed. Consumers refetch everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Row id when known; polling only knows that something changed.
    pub id: Option<String>,
}

pub trait SessionSource: Send + Sync {
    fn fetch_all(&self) -> impl std::future::Future<Output = Result<Vec<Session>>> + Send;

    fn update_status(
        &self,
        id: &str,
        status: SessionStatus,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Enum wrapper for session sources. Dispatches to the concrete implementation.
pub enum Source {
    Rest(RestSessionSource),
    Memory(MemorySessionSource),
}

impl SessionSource for Source {
    async fn fetch_all(&self) -> Result<Vec<Session>> {
        match self {
            Source::Rest(s) => s.fetch_all().await,
            Source::Memory(s) => s.fetch_all().await,
        }
    }

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<()> {
        match self {
            Source::Rest(s) => s.update_status(id, status).await,
            Source::Memory(s) => s.update_status(id, status).await,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        match self {
            Source::Rest(s) => s.subscribe(),
            Source::Memory(s) => s.subscribe(),
        }
    }
}

/// Create the configured session source.
pub fn create_source(config: &TutordeskConfig) -> Result<Source> {
    match config.remote.backend.as_str() {
        "memory" => Ok(Source::Memory(MemorySessionSource::with_demo_data())),
        "rest" => {
            let url = config.remote.url.as_deref().ok_or_else(|| {
                TutordeskError::Config("remote.url is required for the rest backend".into())
            })?;
            let api_key = config.remote.resolve_api_key()?;
            let source = RestSessionSource::new(
                url,
                &config.remote.table,
                &api_key,
                config.remote.timeout_secs,
            )?;
            Ok(Source::Rest(source))
        }
        other => Err(TutordeskError::Config(format!(
            "unknown remote backend: {other}"
        ))),
    }
}
