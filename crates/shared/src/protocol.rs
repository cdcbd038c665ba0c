use serde::{Deserialize, Serialize};

use crate::domain::AddressRecord;

/// Body returned by `GET <lookup-path>/{erf}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AddressRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LookupEnvelope {
    pub fn found(record: AddressRecord) -> Self {
        Self {
            success: true,
            data: Some(record),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// The record carried by a successful envelope, if it has any populated field.
    pub fn into_record(self) -> Option<AddressRecord> {
        if !self.success {
            return None;
        }
        self.data.filter(|record| !record.is_empty())
    }
}
