use anyhow::{bail, Result};
use tracing::info;

use ow_core::ports::SettingsMigrationPort;
use ow_core::settings::model::{Settings, CURRENT_SCHEMA_VERSION};
use ow_core::transport::parse_bridge_lines;

/// Documents written before the schema was versioned.
///
/// They could carry `use_custom_bridges = true` with nothing but comments in
/// `bridge_lines`, which would launch the proxy with bridges enabled and no
/// bridge to use.
pub struct MigrationV0ToV1;

impl SettingsMigrationPort for MigrationV0ToV1 {
    fn from_version(&self) -> u32 {
        0
    }

    fn to_version(&self) -> u32 {
        1
    }

    fn migrate(&self, mut settings: Settings) -> Settings {
        let transport = &mut settings.transport;
        transport.bridge_lines = transport.bridge_lines.replace("\r\n", "\n");
        if transport.use_custom_bridges && parse_bridge_lines(&transport.bridge_lines).is_empty() {
            transport.use_custom_bridges = false;
        }
        settings.schema_version = self.to_version();
        settings
    }
}

pub struct SettingsMigrator {
    migrations: Vec<Box<dyn SettingsMigrationPort>>,
}

impl Default for SettingsMigrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsMigrator {
    pub fn new() -> Self {
        Self {
            migrations: vec![Box::new(MigrationV0ToV1)],
        }
    }

    pub fn migrate_to_latest(&self, mut settings: Settings) -> Result<Settings> {
        loop {
            let current = settings.schema_version;

            if current >= CURRENT_SCHEMA_VERSION {
                break;
            }

            let Some(migration) = self.migrations.iter().find(|m| m.from_version() == current)
            else {
                bail!("no settings migration from version {current}");
            };

            settings = migration.migrate(settings);
            info!(
                from = current,
                to = settings.schema_version,
                "settings migrated"
            );
        }

        Ok(settings)
    }
}
