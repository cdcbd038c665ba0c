use std::fmt;

use serde::{Deserialize, Serialize};

/// Shortest trimmed identifier that is worth sending to the lookup endpoint.
pub const DEFAULT_MIN_ERF_LEN: usize = 3;

/// A trimmed ERF (property/lot) number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErfNumber(String);

impl ErfNumber {
    /// Trims `raw` and returns it only when it has at least `min_len` characters.
    pub fn eligible(raw: &str, min_len: usize) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < min_len {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErfNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    StreetNumber,
    StreetName,
    FullAddress,
    Suburb,
    PostalCode,
}

impl AddressField {
    pub const ALL: [AddressField; 5] = [
        AddressField::StreetNumber,
        AddressField::StreetName,
        AddressField::FullAddress,
        AddressField::Suburb,
        AddressField::PostalCode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AddressField::StreetNumber => "street_number",
            AddressField::StreetName => "street_name",
            AddressField::FullAddress => "full_address",
            AddressField::Suburb => "suburb",
            AddressField::PostalCode => "postal_code",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl AddressRecord {
    /// Value for `field` when present and non-empty.
    pub fn get(&self, field: AddressField) -> Option<&str> {
        let value = match field {
            AddressField::StreetNumber => &self.street_number,
            AddressField::StreetName => &self.street_name,
            AddressField::FullAddress => &self.full_address,
            AddressField::Suburb => &self.suburb,
            AddressField::PostalCode => &self.postal_code,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Fields that carry a value, in declaration order.
    pub fn present_fields(&self) -> impl Iterator<Item = (AddressField, &str)> + '_ {
        AddressField::ALL
            .into_iter()
            .filter_map(move |field| self.get(field).map(|value| (field, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().next().is_none()
    }
}
