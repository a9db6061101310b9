//! Persisted user preferences — theme and language, separate from the chat
//! session record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, warn};

use super::storage::Storage;

/// Storage namespace for the preferences record.
pub const PREFERENCES_NAMESPACE: &str = "preferences-storage";

/// UI theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
}

/// User preferences persisted across reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
        }
    }
}

/// Preference store with write-through persistence.
pub struct PreferencesStore {
    state: RwLock<Preferences>,
    storage: Arc<Storage>,
}

impl PreferencesStore {
    /// Restore preferences from storage, defaulting on absence or corruption.
    pub fn open(storage: Arc<Storage>) -> Arc<Self> {
        let state = match storage.load::<Preferences>(PREFERENCES_NAMESPACE) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                warn!(error = %e, "Preferences record unreadable, using defaults");
                Preferences::default()
            }
        };
        Arc::new(Self {
            state: RwLock::new(state),
            storage,
        })
    }

    pub async fn get(&self) -> Preferences {
        self.state.read().await.clone()
    }

    /// Replace the preferences and persist.
    pub async fn update(&self, prefs: Preferences) {
        let mut state = self.state.write().await;
        *state = prefs;
        if let Err(e) = self.storage.save(PREFERENCES_NAMESPACE, &*state) {
            error!(error = %e, "Failed to persist preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_when_nothing_persisted() {
        let store = PreferencesStore::open(Arc::new(Storage::in_memory()));
        let prefs = store.get().await;
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.language, "en");
    }

    #[tokio::test]
    async fn update_survives_reopen() {
        let storage = Arc::new(Storage::in_memory());
        let store = PreferencesStore::open(Arc::clone(&storage));
        store
            .update(Preferences {
                theme: Theme::Dark,
                language: "hi".to_string(),
            })
            .await;
        drop(store);

        let reopened = PreferencesStore::open(storage);
        let prefs = reopened.get().await;
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.language, "hi");
    }

    #[test]
    fn wire_layout_is_camel_case() {
        let prefs = Preferences {
            theme: Theme::Dark,
            language: "mr".to_string(),
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert_eq!(json, r#"{"theme":"dark","language":"mr"}"#);
    }
}
