//! Debounced ERF-number to postal-address lookup for form auto-fill.
//!
//! Keystrokes go through [`LookupController::on_identifier_change`]; a quiet
//! period collapses bursts into one request, and every request is stamped
//! with a generation so a late response can never overwrite a newer one.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use shared::domain::ErfNumber;
use tokio::{
    runtime::Handle,
    sync::{broadcast, watch},
};
use tracing::debug;

pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod publisher;
pub mod state;

pub use client::{AddressSource, HttpAddressSource, LookupClient};
pub use config::{load_settings, LookupSettings};
pub use debounce::DebounceTimer;
pub use error::{LookupError, LOOKUP_FAILED_MESSAGE};
pub use publisher::{AddressForm, ResultPublisher};
pub use state::{LookupEvent, LookupPhase, LookupState};

/// One lookup-driven input field. Lives as long as the owning form.
pub struct LookupController {
    min_identifier_len: usize,
    form: Arc<dyn AddressForm>,
    debounce: DebounceTimer,
    client: Arc<LookupClient>,
    publisher: Arc<ResultPublisher>,
    /// Generation taken from a superseded lookup while its replacement is debouncing.
    reserved: Mutex<Option<u64>>,
}

impl LookupController {
    /// Controller backed by [`HttpAddressSource`].
    pub fn from_settings(
        settings: &LookupSettings,
        form: Arc<dyn AddressForm>,
    ) -> anyhow::Result<Self> {
        let source = HttpAddressSource::new(settings)?;
        Self::new(settings, Arc::new(source), form)
    }

    /// Must be called from within a tokio runtime; keystrokes may then arrive from any thread.
    pub fn new(
        settings: &LookupSettings,
        source: Arc<dyn AddressSource>,
        form: Arc<dyn AddressForm>,
    ) -> anyhow::Result<Self> {
        let runtime =
            Handle::try_current().context("lookup controller requires a tokio runtime")?;
        let client = Arc::new(LookupClient::new(source));
        let publisher = Arc::new(ResultPublisher::new(form.clone(), client.subscribe_state()));
        Ok(Self {
            min_identifier_len: settings.min_identifier_len,
            form,
            debounce: DebounceTimer::new(settings.quiet_period(), runtime),
            client,
            publisher,
            reserved: Mutex::new(None),
        })
    }

    pub fn on_identifier_change(&self, raw: &str) {
        self.form.echo_identifier(raw);

        let Some(erf) = ErfNumber::eligible(raw, self.min_identifier_len) else {
            self.cancel_pending();
            debug!(
                len = raw.trim().chars().count(),
                "lookup: identifier too short, not scheduling"
            );
            return;
        };

        self.debounce.cancel();
        if let Some(generation) = self.client.supersede_in_flight() {
            *self.reserved.lock().unwrap_or_else(PoisonError::into_inner) = Some(generation);
        }

        debug!(
            erf = %erf,
            quiet_ms = self.debounce.quiet_period().as_millis() as u64,
            "lookup: scheduled"
        );
        let client = self.client.clone();
        let publisher = self.publisher.clone();
        self.debounce.schedule(async move {
            client
                .lookup_then(&erf, |record| {
                    publisher.on_result(record.as_ref());
                })
                .await;
        });
    }

    /// Drops a scheduled lookup that has not fired yet. In-flight lookups are unaffected.
    pub fn cancel_pending(&self) -> bool {
        let cancelled = self.debounce.cancel();
        let reserved = self
            .reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if cancelled {
            if let Some(generation) = reserved {
                self.client.release(generation);
            }
        }
        cancelled
    }

    pub fn phase(&self) -> LookupPhase {
        if self.debounce.is_pending() {
            return LookupPhase::Debouncing;
        }
        self.client.state().phase()
    }

    pub fn state(&self) -> LookupState {
        self.client.state()
    }

    pub fn loading(&self) -> bool {
        self.publisher.loading()
    }

    pub fn error(&self) -> Option<String> {
        self.publisher.error()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LookupState> {
        self.publisher.watch()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<LookupEvent> {
        self.client.subscribe_events()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
