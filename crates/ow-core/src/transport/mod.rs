//! Transport domain: status, bootstrap tracking, start/stop serialization,
//! bridges and launch parameters.

pub mod bootstrap;
pub mod bridges;
pub mod error;
pub mod event;
pub mod launch;
pub mod serializer;
pub mod status;

pub use bootstrap::{BootstrapStep, BootstrapTracker, BOOTSTRAP_COMPLETE};
pub use bridges::{parse_bridge_lines, BridgeConfiguration, BridgeType};
pub use error::{ConnectionFailure, TransportError};
pub use event::ControlEvent;
pub use launch::{
    IpPreference, LaunchParameters, NetworkCapability, PluggableTransport, TransportConfig,
};
pub use serializer::{ActionSerializer, Admission, SerializerState, TransportAction};
pub use status::{TransportSnapshot, TransportStatus};
