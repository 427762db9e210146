//! Persist a new bridge configuration and restart the transport with it.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use ow_core::ports::SettingsPort;
use ow_core::transport::{BridgeConfiguration, TransportError};

use super::transport::TransportControl;

#[derive(Debug, thiserror::Error)]
pub enum ApplyBridgesError {
    #[error("failed to persist bridge configuration: {0}")]
    Persist(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<anyhow::Error> for ApplyBridgesError {
    fn from(err: anyhow::Error) -> Self {
        ApplyBridgesError::Persist(format!("{err:#}"))
    }
}

/// Bridges are never reconfigured on a live process: the transport always
/// goes through a full stop then start. When a transition is in flight the
/// restart is queued and runs once it finishes.
pub struct ApplyBridgeConfiguration {
    settings: Arc<dyn SettingsPort>,
    transport: Arc<dyn TransportControl>,
}

impl ApplyBridgeConfiguration {
    pub fn new(settings: Arc<dyn SettingsPort>, transport: Arc<dyn TransportControl>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    pub async fn execute(&self, bridges: BridgeConfiguration) -> Result<(), ApplyBridgesError> {
        let span = info_span!(
            "usecase.apply_bridges.execute",
            bridge_type = ?bridges.bridge_type,
            lines = bridges.lines.len()
        );

        async {
            let mut settings = self.settings.load().await?;
            settings.transport.set_bridges(&bridges);
            self.settings.save(&settings).await?;
            info!("bridge configuration saved, restarting transport");

            self.transport.restart().await?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::{mock, Sequence};
    use ow_core::settings::Settings;
    use ow_core::transport::{BridgeType, TransportSnapshot};
    use tokio::sync::watch;

    mock! {
        pub SettingsStore {}

        #[async_trait]
        impl SettingsPort for SettingsStore {
            async fn load(&self) -> anyhow::Result<Settings>;
            async fn save(&self, settings: &Settings) -> anyhow::Result<()>;
        }
    }

    mock! {
        pub Transport {}

        #[async_trait]
        impl TransportControl for Transport {
            async fn start(&self) -> Result<(), TransportError>;
            async fn stop(&self) -> Result<(), TransportError>;
            async fn restart(&self) -> Result<(), TransportError>;
            fn subscribe(&self) -> watch::Receiver<TransportSnapshot>;
        }
    }

    #[tokio::test]
    async fn saves_then_restarts_the_transport() {
        let mut seq = Sequence::new();
        let mut settings = MockSettingsStore::new();
        let mut transport = MockTransport::new();

        settings
            .expect_load()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Settings::default()));
        settings
            .expect_save()
            .withf(|saved| {
                saved.transport.use_custom_bridges
                    && saved.transport.bridge_lines == "obfs4 192.0.2.1:443 FP cert=abc iat-mode=0"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        transport
            .expect_restart()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        transport.expect_stop().never();
        transport.expect_start().never();

        let use_case = ApplyBridgeConfiguration::new(Arc::new(settings), Arc::new(transport));
        let bridges =
            BridgeConfiguration::custom("// pasted\nobfs4 192.0.2.1:443 FP cert=abc iat-mode=0\n\n");
        assert_eq!(bridges.bridge_type, BridgeType::Custom);

        use_case.execute(bridges).await.unwrap();
    }

    #[tokio::test]
    async fn persist_failure_leaves_the_transport_alone() {
        let mut settings = MockSettingsStore::new();
        let mut transport = MockTransport::new();

        settings
            .expect_load()
            .returning(|| Ok(Settings::default()));
        settings
            .expect_save()
            .returning(|_| Err(anyhow::anyhow!("disk full")));
        transport.expect_restart().never();

        let use_case = ApplyBridgeConfiguration::new(Arc::new(settings), Arc::new(transport));
        let err = use_case
            .execute(BridgeConfiguration::none())
            .await
            .unwrap_err();

        assert!(matches!(err, ApplyBridgesError::Persist(_)));
    }
}
