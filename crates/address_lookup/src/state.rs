use shared::domain::{AddressRecord, ErfNumber};

/// Observable per-field lookup state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupState {
    pub loading: bool,
    pub error: Option<String>,
    /// Stamp of the most recently triggered lookup; 0 before the first one.
    pub generation: u64,
}

impl LookupState {
    pub fn phase(&self) -> LookupPhase {
        if self.loading {
            LookupPhase::LookingUp
        } else {
            LookupPhase::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPhase {
    Idle,
    Debouncing,
    LookingUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    Triggered {
        erf: ErfNumber,
        generation: u64,
    },
    Found {
        erf: ErfNumber,
        generation: u64,
        record: AddressRecord,
    },
    NotFound {
        erf: ErfNumber,
        generation: u64,
    },
    Failed {
        erf: ErfNumber,
        generation: u64,
        message: String,
    },
    /// A superseded lookup settled; nothing was published.
    Discarded {
        erf: ErfNumber,
        generation: u64,
    },
}

impl LookupEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LookupEvent::Triggered { generation, .. }
            | LookupEvent::Found { generation, .. }
            | LookupEvent::NotFound { generation, .. }
            | LookupEvent::Failed { generation, .. }
            | LookupEvent::Discarded { generation, .. } => *generation,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, LookupEvent::Triggered { .. })
    }
}
