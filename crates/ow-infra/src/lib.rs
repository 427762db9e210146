pub mod security;
pub mod settings;

pub use security::FilePassphraseStore;
pub use settings::{FileSettingsRepository, SettingsMigrator};
