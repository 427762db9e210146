//! One-shot stall recovery timer.
//!
//! Armed when the ports open, cancelled when bootstrap completes. If it fires
//! first, the transport network is toggled so the proxy renegotiates.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::control_client::ControlChannelClient;

pub struct RetryScheduler {
    delay: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

impl RetryScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Arm the timer, replacing any armed one.
    pub async fn arm(&self, control: Arc<ControlChannelClient>) {
        let mut pending = self.pending.lock().await;
        if let Some(existing) = pending.take() {
            existing.abort();
        }

        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            warn!(?delay, "bootstrap did not complete in time, kicking transport");
            if let Err(err) = control.kick_network().await {
                warn!(error = %err, "transport kick failed");
            }
        });

        *pending = Some(handle.abort_handle());
        debug!(?delay, "retry timer armed");
    }

    /// Cancel the armed timer. Returns whether one was still pending.
    pub async fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.take() {
            Some(handle) => {
                let was_live = !handle.is_finished();
                handle.abort();
                if was_live {
                    debug!("retry timer cancelled");
                }
                was_live
            }
            None => false,
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
