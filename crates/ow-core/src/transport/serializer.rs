//! Start/stop serialization.
//!
//! Pure state for the "one transition in flight, latest request wins" rule.
//! The orchestrator keeps it behind its state mutex so that admit/enqueue and
//! unlock/replay are atomic with respect to each other.

use serde::{Deserialize, Serialize};

/// A transport transition a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportAction {
    Connect,
    Disconnect,
    /// Full stop then start, used when the launch configuration changed.
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializerState {
    #[default]
    Unlocked,
    Locked,
}

/// Result of asking the serializer to run an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The serializer is now locked for the caller; run the sequence.
    Proceed,
    /// Another transition is in flight; the action was queued.
    Deferred,
}

#[derive(Debug, Clone, Default)]
pub struct ActionSerializer {
    state: SerializerState,
    queued: Option<TransportAction>,
}

impl ActionSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SerializerState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == SerializerState::Locked
    }

    pub fn queued(&self) -> Option<TransportAction> {
        self.queued
    }

    /// Lock for `action`, or queue it (overwriting any queued value) when
    /// already locked.
    pub fn admit(&mut self, action: TransportAction) -> Admission {
        match self.state {
            SerializerState::Unlocked => {
                self.state = SerializerState::Locked;
                Admission::Proceed
            }
            SerializerState::Locked => {
                if let Some(previous) = self.queued.replace(action) {
                    tracing::debug!(?previous, ?action, "queued transport action overwritten");
                }
                Admission::Deferred
            }
        }
    }

    /// Idempotent lock, used while bootstrap is between 1 and 99.
    pub fn lock(&mut self) {
        self.state = SerializerState::Locked;
    }

    /// Unlock and hand back the queued action, clearing the queue.
    pub fn unlock(&mut self) -> Option<TransportAction> {
        self.state = SerializerState::Unlocked;
        self.queued.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_action_proceeds_and_locks() {
        let mut serializer = ActionSerializer::new();
        assert_eq!(serializer.admit(TransportAction::Connect), Admission::Proceed);
        assert!(serializer.is_locked());
        assert_eq!(serializer.queued(), None);
    }

    #[test]
    fn latest_request_wins_while_locked() {
        let mut serializer = ActionSerializer::new();
        serializer.admit(TransportAction::Connect);

        assert_eq!(serializer.admit(TransportAction::Disconnect), Admission::Deferred);
        assert_eq!(serializer.admit(TransportAction::Connect), Admission::Deferred);
        assert_eq!(serializer.admit(TransportAction::Disconnect), Admission::Deferred);

        assert_eq!(serializer.queued(), Some(TransportAction::Disconnect));
    }

    #[test]
    fn unlock_returns_and_clears_queue() {
        let mut serializer = ActionSerializer::new();
        serializer.admit(TransportAction::Connect);
        serializer.admit(TransportAction::Disconnect);

        assert_eq!(serializer.unlock(), Some(TransportAction::Disconnect));
        assert!(!serializer.is_locked());
        assert_eq!(serializer.unlock(), None);
    }

    #[test]
    fn queued_restart_is_not_collapsed_into_connect() {
        let mut serializer = ActionSerializer::new();
        serializer.lock();

        assert_eq!(serializer.admit(TransportAction::Restart), Admission::Deferred);
        assert_eq!(serializer.unlock(), Some(TransportAction::Restart));
    }

    #[test]
    fn lock_is_idempotent() {
        let mut serializer = ActionSerializer::new();
        serializer.lock();
        serializer.lock();
        assert_eq!(serializer.state(), SerializerState::Locked);
        assert_eq!(serializer.admit(TransportAction::Connect), Admission::Deferred);
    }
}
