use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::DEFAULT_MIN_ERF_LEN;
use url::Url;

const SETTINGS_FILE: &str = "lookup.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct LookupSettings {
    pub base_url: String,
    pub lookup_path: String,
    pub quiet_period_ms: u64,
    pub min_identifier_len: usize,
    pub request_timeout_ms: u64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".into(),
            lookup_path: "/api/erf/lookup".into(),
            quiet_period_ms: 500,
            min_identifier_len: DEFAULT_MIN_ERF_LEN,
            request_timeout_ms: 10_000,
        }
    }
}

impl LookupSettings {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `base_url` joined with the normalized `lookup_path`; identifiers are appended as one segment.
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        let raw = format!(
            "{}{}",
            self.base_url.trim().trim_end_matches('/'),
            normalize_lookup_path(&self.lookup_path)
        );
        let url = Url::parse(&raw).with_context(|| format!("invalid lookup endpoint '{raw}'"))?;
        if url.cannot_be_a_base() {
            anyhow::bail!("lookup endpoint '{raw}' cannot carry path segments");
        }
        Ok(url)
    }
}

/// Reads `lookup.toml` from the working directory, then applies environment overrides.
pub fn load_settings() -> LookupSettings {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> LookupSettings {
    let mut settings = LookupSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, &file_cfg),
            Err(err) => tracing::warn!(
                path = %path.display(),
                "lookup: ignoring unreadable settings file: {err}"
            ),
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_settings(settings: &mut LookupSettings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("base_url").and_then(toml::Value::as_str) {
        settings.base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("lookup_path").and_then(toml::Value::as_str) {
        settings.lookup_path = v.to_string();
    }
    if let Some(v) = file_cfg.get("quiet_period_ms").and_then(as_u64) {
        settings.quiet_period_ms = v;
    }
    if let Some(v) = file_cfg.get("min_identifier_len").and_then(as_u64) {
        settings.min_identifier_len = v as usize;
    }
    if let Some(v) = file_cfg.get("request_timeout_ms").and_then(as_u64) {
        settings.request_timeout_ms = v;
    }
}

fn as_u64(value: &toml::Value) -> Option<u64> {
    value.as_integer().and_then(|v| u64::try_from(v).ok())
}

pub(crate) fn apply_env_overrides(
    settings: &mut LookupSettings,
    var: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = var("LOOKUP_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = var("APP__LOOKUP_BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = var("APP__LOOKUP_PATH") {
        settings.lookup_path = v;
    }

    if let Some(v) = var("APP__LOOKUP_QUIET_PERIOD_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.quiet_period_ms = parsed;
        }
    }

    if let Some(v) = var("APP__LOOKUP_MIN_IDENTIFIER_LEN") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.min_identifier_len = parsed;
        }
    }

    if let Some(v) = var("APP__LOOKUP_REQUEST_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_ms = parsed;
        }
    }
}

fn normalize_lookup_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("/{trimmed}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
