use serde::{Deserialize, Serialize};

use super::error::TransportError;

/// Connection status of the local anonymizing proxy.
///
/// `Connecting` and `Disconnecting` are only entered while the
/// [`ActionSerializer`](super::ActionSerializer) is locked. `Connected` is only
/// reachable from `PortsOpen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    #[default]
    Disconnected,
    Connecting,
    PortsOpen,
    Connected,
    Disconnecting,
}

impl TransportStatus {
    /// Whether dependents (the wallet backend) may start using the transport.
    pub fn is_ready(self) -> bool {
        matches!(self, TransportStatus::PortsOpen | TransportStatus::Connected)
    }

    /// Whether a start or stop sequence is currently running.
    pub fn is_transitioning(self) -> bool {
        matches!(
            self,
            TransportStatus::Connecting | TransportStatus::Disconnecting
        )
    }
}

/// Everything a presentation layer needs to render transport state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportSnapshot {
    pub status: TransportStatus,
    pub bootstrap_progress: u8,
    pub last_error: Option<TransportError>,
}

impl TransportSnapshot {
    pub fn is_ready(&self) -> bool {
        self.status.is_ready()
    }
}
