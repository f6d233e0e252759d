use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeKind, SessionSource, CHANGE_CHANNEL_CAPACITY};
use crate::error::{Result, TutordeskError};
use crate::model::{Session, SessionStatus};

/// In-process session table with change notifications.
///
/// Clones share rows, the offline switch and the change channel.
#[derive(Clone)]
pub struct MemorySessionSource {
    rows: Arc<Mutex<Vec<Session>>>,
    offline: Arc<AtomicBool>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemorySessionSource {
    pub fn new(rows: Vec<Session>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            rows: Arc::new(Mutex::new(rows)),
            offline: Arc::new(AtomicBool::new(false)),
            changes,
        }
    }

    /// Seeded with the demo fixtures, dated relative to today.
    pub fn with_demo_data() -> Self {
        Self::new(super::demo_sessions(chrono::Local::now().date_naive()))
    }

    /// While offline, every fetch and update fails as a network error would.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert(&self, session: Session) -> Result<()> {
        let id = session.id.clone();
        self.lock()?.push(session);
        self.notify(ChangeKind::Insert, Some(id));
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        {
            let mut rows = self.lock()?;
            let before = rows.len();
            rows.retain(|s| s.id != id);
            if rows.len() == before {
                return Err(TutordeskError::NotFound(format!("session {id}")));
            }
        }
        self.notify(ChangeKind::Delete, Some(id.to_string()));
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Session>>> {
        self.rows
            .lock()
            .map_err(|e| TutordeskError::Storage(format!("failed to acquire session lock: {e}")))
    }

    fn notify(&self, kind: ChangeKind, id: Option<String>) {
        // no receivers is fine
        let _ = self.changes.send(ChangeEvent { kind, id });
    }

    fn check_online(&self) -> Option<&'static str> {
        self.offline
            .load(Ordering::SeqCst)
            .then_some("connection refused: session source is offline")
    }
}

impl SessionSource for MemorySessionSource {
    async fn fetch_all(&self) -> Result<Vec<Session>> {
        if let Some(msg) = self.check_online() {
            return Err(TutordeskError::RemoteFetch(msg.into()));
        }
        Ok(self.lock()?.clone())
    }

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<()> {
        if let Some(msg) = self.check_online() {
            return Err(TutordeskError::RemoteUpdate(msg.into()));
        }
        {
            let mut rows = self.lock()?;
            let row = rows
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| TutordeskError::NotFound(format!("session {id}")))?;
            row.status = status;
        }
        self.notify(ChangeKind::Update, Some(id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
