//! Tri-state theme preference consumed by the mobile UI, with persistence.

mod preference;
mod storage;
mod store;

pub use preference::{Appearance, ThemePreference};
pub use storage::{PreferenceStorage, SqlitePreferenceStorage};
pub use store::{THEME_STORAGE_KEY, ThemeStore};
