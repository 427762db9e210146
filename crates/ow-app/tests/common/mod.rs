#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex, Notify};

use ow_app::usecases::{TransportOptions, TransportOrchestrator, TransportOrchestratorDeps};
use ow_core::ports::{
    ControlChannelConnectorPort, ControlChannelPort, NetworkProbePort, PluggableTransportPort,
    SettingsPort, TransportProcessPort,
};
use ow_core::settings::Settings;
use ow_core::transport::{
    BridgeConfiguration, ConnectionFailure, ControlEvent, LaunchParameters, NetworkCapability,
    PluggableTransport, TransportConfig, TransportError, TransportSnapshot,
};

pub type CallLog = Arc<Mutex<Vec<String>>>;

async fn record(log: &CallLog, call: impl Into<String>) {
    log.lock().await.push(call.into());
}

/// Proxy process double. Exits when its control channel disconnects, unless
/// told to hang.
pub struct FakeProcess {
    pub log: CallLog,
    pub active: Arc<AtomicBool>,
    pub hangs_on_stop: AtomicBool,
    pub cookie: Mutex<Option<Vec<u8>>>,
    pub launches: Mutex<Vec<LaunchParameters>>,
}

#[async_trait]
impl TransportProcessPort for FakeProcess {
    async fn prepare_directories(&self) -> anyhow::Result<()> {
        record(&self.log, "process.prepare_directories").await;
        Ok(())
    }

    async fn start(&self, params: LaunchParameters) -> anyhow::Result<()> {
        record(&self.log, "process.start").await;
        if self.active.swap(true, Ordering::SeqCst) {
            anyhow::bail!("process already active");
        }
        self.launches.lock().await.push(params);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn read_auth_cookie(&self) -> Result<Vec<u8>, TransportError> {
        record(&self.log, "process.read_auth_cookie").await;
        self.cookie
            .lock()
            .await
            .clone()
            .ok_or_else(|| TransportError::MissingCredential("control_auth_cookie".into()))
    }

    async fn abandon(&self) {
        record(&self.log, "process.abandon").await;
        self.active.store(false, Ordering::SeqCst);
    }
}

pub struct FakeChannel {
    log: CallLog,
    process: Arc<FakeProcess>,
    reject_auth: bool,
    subscribe_gate: Option<Arc<Notify>>,
    events: Mutex<Option<mpsc::Sender<ControlEvent>>>,
}

impl FakeChannel {
    pub async fn emit(&self, event: ControlEvent) {
        let sender = self.events.lock().await.clone();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// Drop the event stream as if the proxy died.
    pub async fn close(&self) {
        self.events.lock().await.take();
    }
}

#[async_trait]
impl ControlChannelPort for FakeChannel {
    async fn authenticate(&self, cookie: &[u8]) -> Result<(), TransportError> {
        record(&self.log, format!("control.authenticate {}", cookie.len())).await;
        if self.reject_auth {
            return Err(TransportError::AuthenticationFailed(
                "515 Authentication failed".into(),
            ));
        }
        Ok(())
    }

    async fn take_ownership(&self) -> Result<(), TransportError> {
        record(&self.log, "control.take_ownership").await;
        Ok(())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), TransportError> {
        record(&self.log, format!("control.set_config {key}={value}")).await;
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<ControlEvent>, TransportError> {
        record(&self.log, "control.subscribe").await;
        if let Some(gate) = &self.subscribe_gate {
            gate.notified().await;
        }
        let (tx, rx) = mpsc::channel(32);
        *self.events.lock().await = Some(tx);
        Ok(rx)
    }

    async fn disconnect(&self) {
        record(&self.log, "control.disconnect").await;
        self.events.lock().await.take();
        if !self.process.hangs_on_stop.load(Ordering::SeqCst) {
            self.process.active.store(false, Ordering::SeqCst);
        }
    }
}

pub struct FakeConnector {
    pub log: CallLog,
    pub process: Arc<FakeProcess>,
    pub attempts: AtomicUsize,
    /// Number of upcoming connection attempts to refuse. A refusal also
    /// takes the process down, as a proxy rejecting its configuration would.
    pub refusals_left: AtomicUsize,
    pub reject_auth: AtomicBool,
    /// When set, `subscribe` on new channels blocks until notified.
    pub subscribe_gate: Mutex<Option<Arc<Notify>>>,
    pub channels: Mutex<Vec<Arc<FakeChannel>>>,
}

impl FakeConnector {
    pub async fn latest(&self) -> Arc<FakeChannel> {
        self.channels
            .lock()
            .await
            .last()
            .cloned()
            .expect("no control channel opened yet")
    }
}

#[async_trait]
impl ControlChannelConnectorPort for FakeConnector {
    async fn connect(
        &self,
        _endpoint: SocketAddr,
    ) -> Result<Arc<dyn ControlChannelPort>, ConnectionFailure> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refusals_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            self.process.active.store(false, Ordering::SeqCst);
            return Err(ConnectionFailure::from(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }
        record(&self.log, "control.connect").await;
        let channel = Arc::new(FakeChannel {
            log: self.log.clone(),
            process: self.process.clone(),
            reject_auth: self.reject_auth.load(Ordering::SeqCst),
            subscribe_gate: self.subscribe_gate.lock().await.clone(),
            events: Mutex::new(None),
        });
        self.channels.lock().await.push(channel.clone());
        Ok(channel)
    }
}

pub struct FakePluggable {
    pub log: CallLog,
}

#[async_trait]
impl PluggableTransportPort for FakePluggable {
    fn registrations(&self, bridges: &BridgeConfiguration) -> Vec<PluggableTransport> {
        let names = bridges.transport_names();
        if names.is_empty() {
            return Vec::new();
        }
        vec![PluggableTransport {
            names,
            endpoint: "exec /usr/bin/lyrebird".into(),
        }]
    }

    async fn start(&self) -> anyhow::Result<()> {
        record(&self.log, "pluggable.start").await;
        Ok(())
    }
}

pub struct FixedProbe(pub NetworkCapability);

#[async_trait]
impl NetworkProbePort for FixedProbe {
    async fn probe(&self) -> NetworkCapability {
        self.0
    }
}

#[derive(Default)]
pub struct InMemorySettings {
    pub settings: Mutex<Settings>,
    pub saves: AtomicUsize,
}

impl InMemorySettings {
    pub fn with(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            saves: AtomicUsize::new(0),
        }
    }

    pub async fn current(&self) -> Settings {
        self.settings.lock().await.clone()
    }
}

#[async_trait]
impl SettingsPort for InMemorySettings {
    async fn load(&self) -> anyhow::Result<Settings> {
        Ok(self.settings.lock().await.clone())
    }

    async fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.settings.lock().await = settings.clone();
        Ok(())
    }
}

pub struct Harness {
    pub log: CallLog,
    pub process: Arc<FakeProcess>,
    pub connector: Arc<FakeConnector>,
    pub settings: Arc<InMemorySettings>,
    pub orchestrator: TransportOrchestrator,
}

pub fn harness() -> Harness {
    harness_with(Settings::default())
}

pub fn harness_with(settings: Settings) -> Harness {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let process = Arc::new(FakeProcess {
        log: log.clone(),
        active: Arc::new(AtomicBool::new(false)),
        hangs_on_stop: AtomicBool::new(false),
        cookie: Mutex::new(Some(vec![0xAB; 32])),
        launches: Mutex::new(Vec::new()),
    });
    let connector = Arc::new(FakeConnector {
        log: log.clone(),
        process: process.clone(),
        attempts: AtomicUsize::new(0),
        refusals_left: AtomicUsize::new(0),
        reject_auth: AtomicBool::new(false),
        subscribe_gate: Mutex::new(None),
        channels: Mutex::new(Vec::new()),
    });
    let settings = Arc::new(InMemorySettings::with(settings));

    let options = TransportOptions {
        owning_process: Some(4242),
        ..TransportOptions::new(TransportConfig::new(PathBuf::from("/tmp/ow-test/tor")))
    };

    let orchestrator = TransportOrchestrator::new(TransportOrchestratorDeps {
        process: process.clone(),
        pluggable: Arc::new(FakePluggable { log: log.clone() }),
        connector: connector.clone(),
        probe: Arc::new(FixedProbe(NetworkCapability::DualStack)),
        settings: settings.clone(),
        options,
    });

    Harness {
        log,
        process,
        connector,
        settings,
        orchestrator,
    }
}

impl Harness {
    pub async fn calls(&self) -> Vec<String> {
        self.log.lock().await.clone()
    }

    pub async fn count(&self, call: &str) -> usize {
        self.log
            .lock()
            .await
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub async fn emit(&self, event: ControlEvent) {
        self.connector.latest().await.emit(event).await;
    }

    /// Let spawned tasks (event pump, replays) run.
    pub async fn settle(&self) {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&TransportSnapshot) -> bool,
    ) -> TransportSnapshot {
        wait_for_snapshot(self.orchestrator.subscribe(), predicate).await
    }
}

pub async fn wait_for_snapshot(
    mut rx: watch::Receiver<TransportSnapshot>,
    predicate: impl FnMut(&TransportSnapshot) -> bool,
) -> TransportSnapshot {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for transport snapshot")
        .expect("transport status channel closed")
        .clone()
}
