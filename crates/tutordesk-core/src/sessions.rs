//! Local view of the remote sessions collection.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::{Result, TutordeskError};
use crate::model::{ScheduledSession, Session, SessionFilter, SessionStatus};
use crate::remote::SessionSource;

pub struct SessionService<S: SessionSource> {
    source: S,
    sessions: RwLock<Vec<Session>>,
}

impl<S: SessionSource> SessionService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            sessions: RwLock::new(Vec::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Replace the local list with a full fetch. On failure the local list
    /// is left as it was.
    pub async fn refresh(&self) -> Result<usize> {
        let fetched = self.source.fetch_all().await?;
        let count = fetched.len();
        *self.sessions.write().await = fetched;
        tracing::debug!(count, "sessions refreshed");
        Ok(count)
    }

    pub async fn snapshot(&self) -> Vec<Session> {
        self.sessions.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| TutordeskError::NotFound(format!("session {id}")))
    }

    pub async fn filtered(&self, filter: &SessionFilter) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    /// Upcoming sessions that can be placed on the weekly grid.
    pub async fn scheduled(&self) -> Vec<ScheduledSession> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|s| s.is_upcoming())
            .filter_map(Session::scheduled)
            .collect()
    }

    /// Accept a pending request. The remote row is updated first; the local
    /// record changes only after that succeeds, and only its status.
    pub async fn accept(&self, id: &str) -> Result<Session> {
        let mut accepted = self.get(id).await?;
        accepted.accept()?;

        self.source
            .update_status(id, SessionStatus::Upcoming)
            .await?;

        let mut sessions = self.sessions.write().await;
        if let Some(local) = sessions.iter_mut().find(|s| s.id == id) {
            local.status = accepted.status;
        }
        tracing::info!(id, "session accepted");
        Ok(accepted)
    }
}

impl<S: SessionSource + 'static> SessionService<S> {
    /// Refetch everything on every change signal until the source's channel
    /// closes. A refetch can overwrite a local accept that is still in
    /// flight; the last write wins.
    pub fn watch(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.source.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if let Err(e) = self.refresh().await {
                            tracing::warn!(error = %e, "refetch after change failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusTab;
    use crate::remote::MemorySessionSource;
    use std::time::Duration;

    async fn service() -> SessionService<MemorySessionSource> {
        let service = SessionService::new(MemorySessionSource::with_demo_data());
        service.refresh().await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_refresh_loads_all() {
        let s = service().await;
        assert_eq!(s.snapshot().await.len(), 7);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_local_state() {
        let s = service().await;
        s.source().set_offline(true);
        assert!(matches!(
            s.refresh().await,
            Err(TutordeskError::RemoteFetch(_))
        ));
        assert_eq!(s.snapshot().await.len(), 7);
    }

    #[tokio::test]
    async fn test_filter_by_tab_and_query() {
        let s = service().await;
        let pending = s
            .filtered(&SessionFilter {
                query: String::new(),
                tab: StatusTab::Only(SessionStatus::Pending),
            })
            .await;
        assert_eq!(pending.len(), 2);

        let physics = s
            .filtered(&SessionFilter {
                query: "PHYSICS".into(),
                tab: StatusTab::All,
            })
            .await;
        assert_eq!(physics.len(), 2);
    }

    #[tokio::test]
    async fn test_accept_changes_only_status() {
        let s = service().await;
        let before = s.get("3").await.unwrap();
        let after = s.accept("3").await.unwrap();
        assert_eq!(after.status, SessionStatus::Upcoming);

        let local = s.get("3").await.unwrap();
        assert_eq!(local, after);
        let mut restored = local.clone();
        restored.status = before.status;
        assert_eq!(restored, before);
    }

    #[tokio::test]
    async fn test_accept_rejects_non_pending_and_unknown() {
        let s = service().await;
        assert!(matches!(
            s.accept("1").await,
            Err(TutordeskError::InvalidTransition { .. })
        ));
        assert!(matches!(
            s.accept("99").await,
            Err(TutordeskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_remote_failure_leaves_state() {
        let s = service().await;
        s.source().set_offline(true);
        assert!(matches!(
            s.accept("3").await,
            Err(TutordeskError::RemoteUpdate(_))
        ));
        assert!(s.get("3").await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_scheduled_only_upcoming() {
        let s = service().await;
        let scheduled = s.scheduled().await;
        assert_eq!(scheduled.len(), 2);
        assert!(scheduled.iter().all(|x| x.id == "1" || x.id == "2"));
    }

    #[tokio::test]
    async fn test_watch_refetches_on_change() {
        let source = MemorySessionSource::with_demo_data();
        let service = Arc::new(SessionService::new(source.clone()));
        service.refresh().await.unwrap();
        let handle = service.clone().watch();

        source.delete("7").unwrap();
        let mut seen = 0;
        for _ in 0..50 {
            seen = service.snapshot().await.len();
            if seen == 6 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(seen, 6);
        handle.abort();
    }
}
