use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    dictionary::CommandDictionary,
    protocol::{CommandRequest, EventEnvelope, SequenceEvent},
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

pub mod debounce;
pub use debounce::Debouncer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// The events feed may hold the request open until something happens.
const EVENTS_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Rejected { status: u16, reason: String },
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Sequence(SequenceEvent),
    /// The events feed started failing. Sent once per outage.
    Error(String),
    /// The events feed answered again after an outage.
    FeedRestored,
}

/// Remote authority for command checking and sequence editing.
#[async_trait]
pub trait CommandBackend: Send + Sync {
    async fn load_dictionary(&self) -> Result<CommandDictionary>;
    async fn validate_command(&self, command: &str) -> Result<ValidationOutcome>;
    async fn append_to_sequence(&self, command: &str) -> Result<()>;
}

pub struct SeqEditClient {
    http: Client,
    base_url: Url,
    events: broadcast::Sender<ClientEvent>,
}

impl SeqEditClient {
    pub fn new(server_url: &str) -> Result<Arc<Self>> {
        let base_url = normalize_base_url(server_url)?;
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Arc::new(Self {
            http,
            base_url,
            events,
        }))
    }

    pub fn server_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid endpoint path '{path}'"))
    }

    pub async fn fetch_events(&self) -> Result<Vec<SequenceEvent>> {
        let url = self.endpoint("events")?;
        let response = self
            .http
            .get(url)
            .timeout(EVENTS_REQUEST_TIMEOUT)
            .send()
            .await
            .context("events request failed")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(anyhow!("events feed not available on this server"));
        }
        let envelopes: Vec<EventEnvelope> = response
            .error_for_status()
            .context("events request failed")?
            .json()
            .await
            .context("malformed events payload")?;
        Ok(envelopes
            .iter()
            .filter_map(SequenceEvent::from_envelope)
            .collect())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Polls the events feed and rebroadcasts sequence notifications to subscribers.
    ///
    /// Feed failures are reported on the transition into failure only, and
    /// [`ClientEvent::FeedRestored`] follows once a poll succeeds again.
    pub fn start_event_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut failing = false;
            loop {
                match client.fetch_events().await {
                    Ok(events) => {
                        if std::mem::take(&mut failing) {
                            info!("event feed recovered");
                            let _ = client.events.send(ClientEvent::FeedRestored);
                        }
                        for event in events {
                            debug!(event = event.name(), "sequence event");
                            let _ = client.events.send(ClientEvent::Sequence(event));
                        }
                    }
                    Err(err) if failing => {
                        debug!("event polling still failing: {err:#}");
                    }
                    Err(err) => {
                        failing = true;
                        warn!("event polling failed: {err:#}");
                        let _ = client.events.send(ClientEvent::Error(format!("{err:#}")));
                    }
                }
                tokio::time::sleep(interval).await;
            }
        })
    }

    async fn post_command(&self, path: &str, command: &str) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        self.http
            .post(url.clone())
            .timeout(REQUEST_TIMEOUT)
            .form(&CommandRequest::new(command))
            .send()
            .await
            .with_context(|| format!("failed to connect to {url}"))
    }
}

#[async_trait]
impl CommandBackend for SeqEditClient {
    async fn load_dictionary(&self) -> Result<CommandDictionary> {
        let url = self.endpoint("cmd/dict")?;
        let body = self
            .http
            .get(url.clone())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("failed to connect to {url}"))?
            .error_for_status()
            .context("command dictionary request failed")?
            .text()
            .await
            .context("failed to read command dictionary body")?;
        let dictionary = CommandDictionary::from_json(&body)?;
        info!(
            commands = dictionary.len(),
            subsystems = dictionary.by_subsystem().len(),
            "loaded command dictionary"
        );
        Ok(dictionary)
    }

    async fn validate_command(&self, command: &str) -> Result<ValidationOutcome> {
        let response = self.post_command("cmd/validate", command).await?;
        let status = response.status();
        if status.is_success() {
            debug!(command, "command accepted by validator");
            return Ok(ValidationOutcome::Valid);
        }
        let reason = response.text().await.unwrap_or_default();
        debug!(command, status = status.as_u16(), "command rejected by validator");
        Ok(ValidationOutcome::Rejected {
            status: status.as_u16(),
            reason,
        })
    }

    async fn append_to_sequence(&self, command: &str) -> Result<()> {
        self.post_command("seqedit/add", command)
            .await?
            .error_for_status()
            .context("sequence append rejected")?;
        info!(command, "appended command to sequence");
        Ok(())
    }
}

fn normalize_base_url(server_url: &str) -> Result<Url> {
    let mut url = Url::parse(server_url.trim())
        .with_context(|| format!("invalid server url '{server_url}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "unsupported server url scheme '{}' (expected http or https)",
            url.scheme()
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
