use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::{AddressRecord, ErfNumber},
    protocol::LookupEnvelope,
};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::LookupSettings,
    error::LookupError,
    state::{LookupEvent, LookupState},
};

/// Resolves an ERF number. `Ok(None)` is a negative result, not a failure.
#[async_trait]
pub trait AddressSource: Send + Sync {
    async fn fetch(&self, erf: &ErfNumber) -> Result<Option<AddressRecord>, LookupError>;
}

/// `GET <endpoint>/{erf}` over HTTP.
pub struct HttpAddressSource {
    http: Client,
    endpoint: Url,
}

impl HttpAddressSource {
    pub fn new(settings: &LookupSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build lookup http client")?;
        Ok(Self {
            http,
            endpoint: settings.endpoint()?,
        })
    }

    pub fn url_for(&self, erf: &ErfNumber) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(erf.as_str());
        }
        url
    }
}

#[async_trait]
impl AddressSource for HttpAddressSource {
    async fn fetch(&self, erf: &ErfNumber) -> Result<Option<AddressRecord>, LookupError> {
        let response = self.http.get(self.url_for(erf)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response.error_for_status()?;
        let envelope: LookupEnvelope = response.json().await?;
        if !envelope.success {
            debug!(
                erf = %erf,
                reason = envelope.error.as_deref().unwrap_or_default(),
                "lookup: endpoint reported no mapping"
            );
        }
        Ok(envelope.into_record())
    }
}

/// Runs lookups and owns the generation-stamped [`LookupState`].
pub struct LookupClient {
    source: Arc<dyn AddressSource>,
    state: watch::Sender<LookupState>,
    events: broadcast::Sender<LookupEvent>,
    commit: Mutex<()>,
}

impl LookupClient {
    pub fn new(source: Arc<dyn AddressSource>) -> Self {
        let (state, _) = watch::channel(LookupState::default());
        let (events, _) = broadcast::channel(256);
        Self {
            source,
            state,
            events,
            commit: Mutex::new(()),
        }
    }

    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LookupEvent> {
        self.events.subscribe()
    }

    /// Starts a new generation: `loading = true`, `error = None`.
    pub fn bump_generation(&self) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.loading = true;
            state.error = None;
            generation = state.generation;
        });
        generation
    }

    /// Invalidates the in-flight lookup, if any, in favour of one about to be scheduled.
    ///
    /// `loading` stays true; the returned generation owns it until a lookup fires
    /// or [`release`](Self::release) is called.
    pub fn supersede_in_flight(&self) -> Option<u64> {
        let mut reserved = None;
        self.state.send_if_modified(|state| {
            if !state.loading {
                return false;
            }
            state.generation += 1;
            reserved = Some(state.generation);
            true
        });
        if let Some(generation) = reserved {
            debug!(generation, "lookup: in-flight request superseded");
        }
        reserved
    }

    /// Clears `loading` for a reserved generation that never got its lookup.
    pub fn release(&self, generation: u64) -> bool {
        self.state.send_if_modified(|state| {
            if state.generation != generation || !state.loading {
                return false;
            }
            state.loading = false;
            true
        })
    }

    /// Looks up `erf`, returning the record only if this lookup is still the latest.
    pub async fn lookup(&self, erf: &ErfNumber) -> Option<AddressRecord> {
        let mut found = None;
        self.lookup_then(erf, |record| found = record).await;
        found
    }

    /// Like [`lookup`](Self::lookup), but hands the outcome to `publish` while
    /// the commit lock is held, so publications happen in generation order.
    /// `publish` is not called for a superseded lookup.
    pub async fn lookup_then<F>(&self, erf: &ErfNumber, publish: F)
    where
        F: FnOnce(Option<AddressRecord>),
    {
        let generation = self.bump_generation();
        info!(generation, erf = %erf, "lookup: request issued");
        self.emit(LookupEvent::Triggered {
            erf: erf.clone(),
            generation,
        });

        let outcome = self.source.fetch(erf).await;

        let _commit = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        let latest = self.state.borrow().generation;
        if latest != generation {
            debug!(generation, latest, erf = %erf, "lookup: discarding stale result");
            self.emit(LookupEvent::Discarded {
                erf: erf.clone(),
                generation,
            });
            return;
        }

        let event = match outcome {
            Ok(Some(record)) => {
                info!(generation, erf = %erf, "lookup: address found");
                publish(Some(record.clone()));
                self.settle(generation, None);
                LookupEvent::Found {
                    erf: erf.clone(),
                    generation,
                    record,
                }
            }
            Ok(None) => {
                info!(generation, erf = %erf, "lookup: no address for erf");
                publish(None);
                self.settle(generation, None);
                LookupEvent::NotFound {
                    erf: erf.clone(),
                    generation,
                }
            }
            Err(err) => {
                warn!(generation, erf = %erf, "lookup: request failed: {err}");
                let message = err.user_message();
                publish(None);
                self.settle(generation, Some(message.clone()));
                LookupEvent::Failed {
                    erf: erf.clone(),
                    generation,
                    message,
                }
            }
        };
        self.emit(event);
    }

    /// Form fields are already written when subscribers see `loading = false`.
    fn settle(&self, generation: u64, error: Option<String>) {
        self.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.loading = false;
            state.error = error;
            true
        });
    }

    fn emit(&self, event: LookupEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
