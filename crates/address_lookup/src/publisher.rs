use std::sync::Arc;

use shared::domain::{AddressField, AddressRecord};
use tokio::sync::watch;
use tracing::debug;

use crate::state::LookupState;

/// Form-side callbacks driven by a lookup field.
pub trait AddressForm: Send + Sync {
    /// Receives every raw keystroke value, untrimmed.
    fn echo_identifier(&self, raw: &str);
    fn set_field(&self, field: AddressField, value: &str);
}

/// Writes lookup results into the form and exposes `loading`/`error` read-only.
pub struct ResultPublisher {
    form: Arc<dyn AddressForm>,
    state: watch::Receiver<LookupState>,
}

impl ResultPublisher {
    pub fn new(form: Arc<dyn AddressForm>, state: watch::Receiver<LookupState>) -> Self {
        Self { form, state }
    }

    /// Sets each present field; absent ones are never cleared. Returns the number set.
    pub fn on_result(&self, record: Option<&AddressRecord>) -> usize {
        let Some(record) = record else {
            return 0;
        };
        let mut applied = 0;
        for (field, value) in record.present_fields() {
            debug!(field = field.as_str(), "lookup: filling form field");
            self.form.set_field(field, value);
            applied += 1;
        }
        applied
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn watch(&self) -> watch::Receiver<LookupState> {
        self.state.clone()
    }
}
