//! Global settings: load, validate, update and persist.
//!
//! Stored settings are merged over the defaults key by key, so a settings
//! object written by an older client (missing keys, `null`s, wrongly typed
//! values) always yields a complete, valid [`GlobalSettings`].

use serde_json::{Map, Value};

use gemchat_shared::constants::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, KEY_GLOBAL_SETTINGS, MAX_OUTPUT_TOKENS,
    MAX_TEMPERATURE, MIN_OUTPUT_TOKENS, MIN_TEMPERATURE,
};

use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::models::{GlobalSettings, Theme};

/// Fields replaced by [`SettingsManager::update`].  `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct GlobalSettingsUpdate {
    pub api_key: Option<String>,
    pub theme: Option<Theme>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<f64>,
}

/// Owner of the `globalSettings` key.
pub struct SettingsManager<S: KeyValueStore> {
    store: S,
    current: GlobalSettings,
}

impl<S: KeyValueStore> SettingsManager<S> {
    /// Read the stored settings, merge them over the defaults, write the
    /// merged result back and keep it as the current settings.
    pub fn load(store: S) -> Result<Self> {
        let stored = match store.get_raw(KEY_GLOBAL_SETTINGS)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored settings are not valid JSON, using defaults");
                Value::Null
            }),
            None => Value::Null,
        };

        let current = merge_over_defaults(stored)?;
        store.set(KEY_GLOBAL_SETTINGS, &current)?;
        tracing::debug!(
            model = %current.model,
            theme = current.theme.as_str(),
            has_api_key = current.has_api_key(),
            "settings loaded"
        );

        Ok(Self { store, current })
    }

    pub fn current(&self) -> &GlobalSettings {
        &self.current
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply `update`, normalizing numeric fields, and persist.
    pub fn update(&mut self, update: GlobalSettingsUpdate) -> Result<&GlobalSettings> {
        let mut next = self.current.clone();

        if let Some(api_key) = update.api_key {
            next.api_key = api_key.trim().to_string();
        }
        if let Some(theme) = update.theme {
            next.theme = theme;
        }
        if let Some(model) = update.model {
            next.model = model;
        }
        if let Some(temperature) = update.temperature {
            next.temperature = normalize_temperature(temperature);
        }
        if let Some(max_output_tokens) = update.max_output_tokens {
            next.max_output_tokens = normalize_max_tokens(max_output_tokens);
        }

        self.store.set(KEY_GLOBAL_SETTINGS, &next)?;
        self.current = next;
        tracing::info!(
            model = %self.current.model,
            temperature = self.current.temperature,
            max_output_tokens = self.current.max_output_tokens,
            "settings updated"
        );
        Ok(&self.current)
    }

    /// Restore every setting to its default and persist.
    pub fn reset(&mut self) -> Result<&GlobalSettings> {
        let defaults = GlobalSettings::default();
        self.store.set(KEY_GLOBAL_SETTINGS, &defaults)?;
        self.current = defaults;
        tracing::info!("settings reset to defaults");
        Ok(&self.current)
    }
}

/// Clamp to `[0, 1]`; non-finite input yields the default.
pub fn normalize_temperature(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    } else {
        DEFAULT_TEMPERATURE
    }
}

/// Clamp to `[1, 8192]` and floor; non-finite input yields the default.
pub fn normalize_max_tokens(value: f64) -> u32 {
    if value.is_finite() {
        value
            .clamp(f64::from(MIN_OUTPUT_TOKENS), f64::from(MAX_OUTPUT_TOKENS))
            .floor() as u32
    } else {
        DEFAULT_MAX_OUTPUT_TOKENS
    }
}

fn merge_over_defaults(stored: Value) -> Result<GlobalSettings> {
    let Value::Object(mut merged) = serde_json::to_value(GlobalSettings::default())? else {
        return Ok(GlobalSettings::default());
    };

    let Value::Object(stored) = stored else {
        if !stored.is_null() {
            tracing::warn!("stored settings are not an object, using defaults");
        }
        return Ok(serde_json::from_value(Value::Object(merged))?);
    };

    for (key, value) in stored {
        if value.is_null() {
            continue;
        }
        let value = match (key.as_str(), value.as_f64()) {
            ("temperature", Some(t)) => Value::from(normalize_temperature(t)),
            ("maxOutputTokens", Some(n)) => Value::from(normalize_max_tokens(n)),
            _ => value,
        };
        if accepts(&merged, &key, &value) {
            merged.insert(key, value);
        } else {
            tracing::warn!(key = %key, "ignoring invalid stored setting");
        }
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

/// Whether `key = value` still decodes as [`GlobalSettings`].
fn accepts(merged: &Map<String, Value>, key: &str, value: &Value) -> bool {
    let mut candidate = merged.clone();
    candidate.insert(key.to_string(), value.clone());
    serde_json::from_value::<GlobalSettings>(Value::Object(candidate)).is_ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use gemchat_shared::constants::DEFAULT_MODEL;

    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_load_empty_store_writes_defaults() {
        let manager = SettingsManager::load(MemoryStore::new()).unwrap();
        assert_eq!(manager.current(), &GlobalSettings::default());

        let stored: GlobalSettings = manager.store().get(KEY_GLOBAL_SETTINGS).unwrap().unwrap();
        assert_eq!(stored, GlobalSettings::default());
    }

    #[test]
    fn test_load_merges_key_by_key() {
        let store = MemoryStore::new();
        store
            .set(
                KEY_GLOBAL_SETTINGS,
                &json!({
                    "apiKey": "secret",
                    "theme": null,
                    "model": 7,
                    "temperature": 3,
                    "maxOutputTokens": 99.9,
                    "fontScale": 1.25
                }),
            )
            .unwrap();

        let manager = SettingsManager::load(&store).unwrap();
        let current = manager.current();
        assert_eq!(current.api_key, "secret");
        assert_eq!(current.theme, Theme::System);
        assert_eq!(current.model, DEFAULT_MODEL);
        assert_eq!(current.temperature, 1.0);
        assert_eq!(current.max_output_tokens, 99);
        assert_eq!(current.extra.get("fontScale"), Some(&json!(1.25)));

        let written: Value = store.get(KEY_GLOBAL_SETTINGS).unwrap().unwrap();
        assert_eq!(written["model"], DEFAULT_MODEL);
        assert_eq!(written["theme"], "system");
    }

    #[test]
    fn test_load_tolerates_garbage() {
        let store = MemoryStore::new();
        store.set_raw(KEY_GLOBAL_SETTINGS, "[1, 2").unwrap();
        let manager = SettingsManager::load(&store).unwrap();
        assert_eq!(manager.current(), &GlobalSettings::default());
    }

    #[test]
    fn test_update_clamps_temperature() {
        let mut manager = SettingsManager::load(MemoryStore::new()).unwrap();

        let current = manager
            .update(GlobalSettingsUpdate {
                temperature: Some(5.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(current.temperature, 1.0);

        let current = manager
            .update(GlobalSettingsUpdate {
                temperature: Some(f64::NAN),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(current.temperature, DEFAULT_TEMPERATURE);

        let current = manager
            .update(GlobalSettingsUpdate {
                temperature: Some(-0.5),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(current.temperature, 0.0);
    }

    #[test]
    fn test_normalize_max_tokens() {
        assert_eq!(normalize_max_tokens(0.0), 1);
        assert_eq!(normalize_max_tokens(100.9), 100);
        assert_eq!(normalize_max_tokens(1e9), 8192);
        assert_eq!(normalize_max_tokens(f64::INFINITY), DEFAULT_MAX_OUTPUT_TOKENS);
        assert_eq!(normalize_max_tokens(f64::NAN), DEFAULT_MAX_OUTPUT_TOKENS);
    }

    #[test]
    fn test_update_persists_and_trims_key() {
        let store = MemoryStore::new();
        let mut manager = SettingsManager::load(&store).unwrap();
        manager
            .update(GlobalSettingsUpdate {
                api_key: Some("  abc  ".into()),
                theme: Some(Theme::Dark),
                model: Some("gemini-1.5-pro".into()),
                max_output_tokens: Some(2048.0),
                ..Default::default()
            })
            .unwrap();

        let reloaded = SettingsManager::load(&store).unwrap();
        let current = reloaded.current();
        assert_eq!(current.api_key, "abc");
        assert_eq!(current.theme, Theme::Dark);
        assert_eq!(current.model, "gemini-1.5-pro");
        assert_eq!(current.max_output_tokens, 2048);
    }

    #[test]
    fn test_reset() {
        let mut manager = SettingsManager::load(MemoryStore::new()).unwrap();
        manager
            .update(GlobalSettingsUpdate {
                api_key: Some("k".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(manager.reset().unwrap(), &GlobalSettings::default());
    }
}
