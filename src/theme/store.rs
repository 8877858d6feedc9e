use super::{
    preference::{Appearance, ThemePreference},
    storage::{PreferenceStorage, SqlitePreferenceStorage},
};
use crate::{Result, config::ThemeConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

pub const THEME_STORAGE_KEY: &str = "foodscan-theme-storage";

// Envelope written by the mobile app's persistence layer.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedTheme {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    theme: ThemePreference,
}

/// Observable theme preference, saved on every change.
pub struct ThemeStore {
    storage: Arc<dyn PreferenceStorage>,
    state: watch::Sender<ThemePreference>,
    // Serializes change-then-save so the stored value matches the last change.
    write_lock: Mutex<()>,
}

impl ThemeStore {
    /// Restores the saved preference, or starts at `System`.
    pub async fn load(storage: Arc<dyn PreferenceStorage>) -> Result<Self> {
        let initial = match storage.load(THEME_STORAGE_KEY).await? {
            Some(raw) => match serde_json::from_str::<PersistedTheme>(&raw) {
                Ok(persisted) => persisted.state.theme,
                Err(e) => {
                    warn!("Ignoring unreadable theme preference: {}", e);
                    ThemePreference::default()
                }
            },
            None => ThemePreference::default(),
        };

        info!("Theme preference loaded: {}", initial);

        let (state, _) = watch::channel(initial);
        Ok(Self {
            storage,
            state,
            write_lock: Mutex::new(()),
        })
    }

    pub async fn open(config: &ThemeConfig) -> Result<Self> {
        let storage = SqlitePreferenceStorage::new(&config.database_path).await?;
        Self::load(Arc::new(storage)).await
    }

    pub fn get(&self) -> ThemePreference {
        *self.state.borrow()
    }

    pub async fn set(&self, theme: ThemePreference) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.state.send_if_modified(|current| {
            let changed = *current != theme;
            *current = theme;
            changed
        });
        self.persist(theme).await
    }

    /// Advances light -> dark -> system -> light and returns the new value.
    pub async fn toggle(&self) -> Result<ThemePreference> {
        let _guard = self.write_lock.lock().await;
        let mut next = ThemePreference::default();
        self.state.send_modify(|current| {
            *current = current.toggled();
            next = *current;
        });
        self.persist(next).await?;
        Ok(next)
    }

    pub fn current_theme(&self, system: Option<Appearance>) -> Appearance {
        self.get().resolve(system)
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemePreference> {
        self.state.subscribe()
    }

    async fn persist(&self, theme: ThemePreference) -> Result<()> {
        let persisted = PersistedTheme {
            state: PersistedState { theme },
            version: 0,
        };
        let raw = serde_json::to_string(&persisted)?;
        self.storage.save(THEME_STORAGE_KEY, &raw).await?;
        debug!("Theme preference saved: {}", theme);
        Ok(())
    }
}
