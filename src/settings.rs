//! Per-chat settings and their persistence.
//!
//! Settings are keyed by chat id and persisted as one JSON document; every
//! mutation replaces the whole per-chat record (last writer wins).

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;

/// Per-chat scanner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    /// Maximum NO price to flag as an opportunity.
    pub max_price_no_tokens: Decimal,
    /// Default order size in shares.
    pub max_order_size: Decimal,
    /// Target price for eventual resale.
    pub sell_target_price: Decimal,
    /// Automatically place orders for discovered opportunities.
    pub auto_place_orders: bool,
}

impl ChatSettings {
    /// Process defaults derived from config.
    pub fn defaults(config: &Config) -> Self {
        Self {
            max_price_no_tokens: config.max_price_no_tokens,
            max_order_size: config.max_order_size,
            sell_target_price: config.sell_target_price,
            auto_place_orders: config.auto_order,
        }
    }
}

/// Partial settings update; unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    /// New price threshold.
    pub max_price_no_tokens: Option<Decimal>,
    /// New order size.
    pub max_order_size: Option<Decimal>,
    /// New sell target.
    pub sell_target_price: Option<Decimal>,
    /// New auto-place flag.
    pub auto_place_orders: Option<bool>,
}

impl SettingsPatch {
    fn apply(&self, settings: &mut ChatSettings) {
        if let Some(v) = self.max_price_no_tokens {
            settings.max_price_no_tokens = v;
        }
        if let Some(v) = self.max_order_size {
            settings.max_order_size = v;
        }
        if let Some(v) = self.sell_target_price {
            settings.sell_target_price = v;
        }
        if let Some(v) = self.auto_place_orders {
            settings.auto_place_orders = v;
        }
    }
}

/// Per-chat settings persistence.
pub trait SettingsStore: Send + Sync {
    /// Settings for a chat, created with defaults on first access.
    fn get(&self, chat_id: i64) -> Result<ChatSettings>;

    /// Apply a partial update and persist the merged record.
    fn patch(&self, chat_id: i64, patch: SettingsPatch) -> Result<ChatSettings>;

    /// Adjust the order size by a signed delta, floored at 1.
    fn increment_order_size(&self, chat_id: i64, delta: i64) -> Result<ChatSettings>;
}

/// JSON-file backed settings store.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    defaults: ChatSettings,
    // Serializes read-modify-write cycles; the file is the source of truth.
    lock: Mutex<()>,
}

impl JsonSettingsStore {
    /// Create a store writing to `<dir>/settings.json`.
    pub fn new(dir: impl Into<PathBuf>, defaults: ChatSettings) -> Self {
        Self {
            path: dir.into().join("settings.json"),
            defaults,
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> BTreeMap<String, ChatSettings> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        }
    }

    fn write_all(&self, all: &BTreeMap<String, ChatSettings>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(all)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self, chat_id: i64) -> Result<ChatSettings> {
        let _guard = self.lock.lock().expect("settings lock poisoned");
        let mut all = self.read_all();
        let key = chat_id.to_string();

        if let Some(existing) = all.get(&key) {
            return Ok(existing.clone());
        }

        debug!(chat_id, "Creating default settings");
        all.insert(key, self.defaults.clone());
        self.write_all(&all)?;
        Ok(self.defaults.clone())
    }

    fn patch(&self, chat_id: i64, patch: SettingsPatch) -> Result<ChatSettings> {
        let _guard = self.lock.lock().expect("settings lock poisoned");
        let mut all = self.read_all();
        let key = chat_id.to_string();

        let mut settings = all.get(&key).cloned().unwrap_or_else(|| self.defaults.clone());
        patch.apply(&mut settings);
        all.insert(key, settings.clone());
        self.write_all(&all)?;
        Ok(settings)
    }

    fn increment_order_size(&self, chat_id: i64, delta: i64) -> Result<ChatSettings> {
        let _guard = self.lock.lock().expect("settings lock poisoned");
        let mut all = self.read_all();
        let key = chat_id.to_string();

        let mut settings = all.get(&key).cloned().unwrap_or_else(|| self.defaults.clone());
        let next = settings.max_order_size + Decimal::from(delta);
        settings.max_order_size = next.max(Decimal::ONE);
        all.insert(key, settings.clone());
        self.write_all(&all)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn defaults() -> ChatSettings {
        ChatSettings {
            max_price_no_tokens: dec!(0.01),
            max_order_size: dec!(100),
            sell_target_price: dec!(0.05),
            auto_place_orders: false,
        }
    }

    fn store() -> (tempfile::TempDir, JsonSettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::new(dir.path(), defaults());
        (dir, store)
    }

    #[test]
    fn get_creates_defaults_and_persists() {
        let (_dir, store) = store();
        let settings = store.get(42).unwrap();
        assert_eq!(settings, defaults());

        // The record survives a fresh store over the same file.
        let reopened = JsonSettingsStore::new(
            store.path.parent().unwrap(),
            ChatSettings {
                max_price_no_tokens: dec!(0.99),
                ..defaults()
            },
        );
        assert_eq!(reopened.get(42).unwrap(), defaults());
    }

    #[test]
    fn patch_merges_over_current_values() {
        let (_dir, store) = store();
        let patched = store
            .patch(
                7,
                SettingsPatch {
                    max_price_no_tokens: Some(dec!(0.008)),
                    auto_place_orders: Some(true),
                    ..SettingsPatch::default()
                },
            )
            .unwrap();

        assert_eq!(patched.max_price_no_tokens, dec!(0.008));
        assert!(patched.auto_place_orders);
        assert_eq!(patched.max_order_size, dec!(100));

        let fetched = store.get(7).unwrap();
        assert_eq!(fetched, patched);
    }

    #[test]
    fn increment_order_size_floors_at_one() {
        let (_dir, store) = store();
        let bumped = store.increment_order_size(7, 20).unwrap();
        assert_eq!(bumped.max_order_size, dec!(120));

        let floored = store.increment_order_size(7, -500).unwrap();
        assert_eq!(floored.max_order_size, dec!(1));
    }

    #[test]
    fn chats_are_independent() {
        let (_dir, store) = store();
        store
            .patch(
                1,
                SettingsPatch {
                    max_order_size: Some(dec!(5)),
                    ..SettingsPatch::default()
                },
            )
            .unwrap();

        assert_eq!(store.get(2).unwrap().max_order_size, dec!(100));
        assert_eq!(store.get(1).unwrap().max_order_size, dec!(5));
    }

    #[test]
    fn settings_serialize_with_legacy_field_names() {
        let raw = serde_json::to_string(&defaults()).unwrap();
        assert!(raw.contains("maxPriceNoTokens"));
        assert!(raw.contains("autoPlaceOrders"));
    }
}
