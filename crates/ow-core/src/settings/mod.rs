pub mod defaults;
pub mod model;

pub use model::{Settings, TransportSettings, WalletSettings, CURRENT_SCHEMA_VERSION};
