use std::hash::{Hash, Hasher};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{ChangeEvent, ChangeKind, SessionSource, CHANGE_CHANNEL_CAPACITY};
use crate::error::{Result, TutordeskError};
use crate::model::{Session, SessionRow, SessionStatus};

/// Sessions stored in a hosted PostgREST table.
///
/// Reads the whole table with `GET {url}/rest/v1/{table}?select=*` and
/// updates a single row's status with `PATCH ...?id=eq.{id}`. Requests carry
/// the project key both as `apikey` and as a bearer token.
#[derive(Clone)]
pub struct RestSessionSource {
    endpoint: String,
    table: String,
    api_key: String,
    http: reqwest::Client,
    changes: broadcast::Sender<ChangeEvent>,
}

#[derive(Serialize)]
struct StatusPatch<'a> {
    status: &'a str,
}

impl RestSessionSource {
    pub fn new(url: &str, table: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| TutordeskError::Config(format!("failed to build HTTP client: {e}")))?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            endpoint: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            table: table.to_string(),
            api_key: api_key.to_string(),
            http,
            changes,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn status_error(&self, status: reqwest::StatusCode, body: &str) -> TutordeskError {
        TutordeskError::HttpStatus {
            context: self.table.clone(),
            status,
            body: preview(body).to_string(),
        }
    }

    /// Raw table body, retried on transient errors.
    async fn fetch_body(&self) -> Result<String> {
        crate::retry::with_retry(3, 200, || self.fetch_body_once())
            .await
            .map_err(|e| match e {
                TutordeskError::Http(_) | TutordeskError::HttpStatus { .. } => {
                    TutordeskError::RemoteFetch(e.to_string())
                }
                other => other,
            })
    }

    async fn fetch_body_once(&self) -> Result<String> {
        let resp = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("order", "date.asc")])
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(self.status_error(status, &body));
        }
        Ok(body)
    }

    async fn update_once(&self, id: &str, status: SessionStatus) -> Result<()> {
        let status_text = status.to_string();
        let resp = self
            .request(reqwest::Method::PATCH)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&StatusPatch {
                status: &status_text,
            })
            .send()
            .await?;
        let code = resp.status();
        let body = resp.text().await?;

        if !code.is_success() {
            return Err(self.status_error(code, &body));
        }

        // An empty body means the server ignored `Prefer`; trust the 2xx.
        if body.trim().is_empty() {
            return Ok(());
        }
        let updated: Vec<serde_json::Value> = serde_json::from_str(&body).map_err(|e| {
            TutordeskError::RemoteUpdate(format!(
                "unexpected response: {e}\nBody: {}",
                preview(&body)
            ))
        })?;
        if updated.is_empty() {
            return Err(TutordeskError::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    /// Refetch every `every` and emit an `Update` change whenever the table
    /// contents differ from the previous poll. Fetch errors are logged and
    /// the poll continues.
    pub fn start_polling(&self, every: Duration) -> JoinHandle<()> {
        let source = self.clone();
        tokio::spawn(async move {
            let mut last: Option<u64> = None;
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match source.fetch_body().await {
                    Ok(body) => {
                        let print = fingerprint(&body);
                        if last.is_some_and(|prev| prev != print) {
                            tracing::debug!(table = %source.table, "remote sessions changed");
                            let _ = source.changes.send(ChangeEvent {
                                kind: ChangeKind::Update,
                                id: None,
                            });
                        }
                        last = Some(print);
                    }
                    Err(e) => tracing::warn!(error = %e, "session poll failed"),
                }
            }
        })
    }
}

impl SessionSource for RestSessionSource {
    async fn fetch_all(&self) -> Result<Vec<Session>> {
        let body = self.fetch_body().await?;
        parse_rows(&body)
    }

    async fn update_status(&self, id: &str, status: SessionStatus) -> Result<()> {
        crate::retry::with_retry(3, 200, || self.update_once(id, status))
            .await
            .map_err(|e| match e {
                TutordeskError::Http(_) | TutordeskError::HttpStatus { .. } => {
                    TutordeskError::RemoteUpdate(e.to_string())
                }
                other => other,
            })?;
        let _ = self.changes.send(ChangeEvent {
            kind: ChangeKind::Update,
            id: Some(id.to_string()),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

/// Convert a table body into sessions. Rows that fail the boundary checks
/// are skipped with a warning.
pub fn parse_rows(body: &str) -> Result<Vec<Session>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
        TutordeskError::RemoteFetch(format!(
            "unexpected response: {e}\nBody: {}",
            preview(body)
        ))
    })?;

    let mut sessions = Vec::with_capacity(values.len());
    for value in values {
        let converted = serde_json::from_value::<SessionRow>(value)
            .map_err(TutordeskError::from)
            .and_then(Session::try_from);
        match converted {
            Ok(session) => sessions.push(session),
            Err(e) => tracing::warn!(error = %e, "skipping invalid session row"),
        }
    }
    Ok(sessions)
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(300) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn fingerprint(body: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}
