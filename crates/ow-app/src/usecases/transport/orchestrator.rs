//! Transport lifecycle orchestrator
//!
//! Boots, authenticates, monitors and tears down the proxy process.
//!
//! ```text
//! start()/stop() ─┐                       ┌─ control events (pump task)
//!                 ▼                       ▼
//!        ActionSerializer + BootstrapTracker (state mutex)
//!                 │
//!                 ▼
//!        watch<TransportSnapshot> ──► wallet coordinator, daemon, logs
//! ```
//!
//! Only one start/stop transition runs at a time. A start keeps the
//! serializer locked until bootstrap reaches 100; requests made meanwhile
//! are queued (latest wins) and replayed on unlock.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::AbortHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use ow_core::ports::{
    ControlChannelConnectorPort, NetworkProbePort, PluggableTransportPort, SettingsPort,
    TransportProcessPort,
};
use ow_core::transport::{
    ActionSerializer, Admission, BootstrapStep, BootstrapTracker, ControlEvent,
    LaunchParameters, TransportAction, TransportError, TransportSnapshot, TransportStatus,
};

use super::control::TransportControl;
use super::control_client::ControlChannelClient;
use super::options::TransportOptions;
use super::retry::RetryScheduler;

pub struct TransportOrchestratorDeps {
    pub process: Arc<dyn TransportProcessPort>,
    pub pluggable: Arc<dyn PluggableTransportPort>,
    pub connector: Arc<dyn ControlChannelConnectorPort>,
    pub probe: Arc<dyn NetworkProbePort>,
    pub settings: Arc<dyn SettingsPort>,
    pub options: TransportOptions,
}

#[derive(Clone)]
pub struct TransportOrchestrator {
    process: Arc<dyn TransportProcessPort>,
    pluggable: Arc<dyn PluggableTransportPort>,
    connector: Arc<dyn ControlChannelConnectorPort>,
    probe: Arc<dyn NetworkProbePort>,
    settings: Arc<dyn SettingsPort>,
    options: Arc<TransportOptions>,
    state: Arc<Mutex<OrchestratorState>>,
    retry: Arc<RetryScheduler>,
    status_tx: Arc<watch::Sender<TransportSnapshot>>,
}

struct OrchestratorState {
    serializer: ActionSerializer,
    bootstrap: BootstrapTracker,
    control: Option<Arc<ControlChannelClient>>,
    event_pump: Option<AbortHandle>,
    /// Bumped on every start and stop; events tagged with an older
    /// generation come from a connection that is already gone.
    generation: u64,
}

impl TransportOrchestrator {
    pub fn new(deps: TransportOrchestratorDeps) -> Self {
        let TransportOrchestratorDeps {
            process,
            pluggable,
            connector,
            probe,
            settings,
            options,
        } = deps;

        let (status_tx, _) = watch::channel(TransportSnapshot::default());

        Self {
            process,
            pluggable,
            connector,
            probe,
            settings,
            retry: Arc::new(RetryScheduler::new(options.retry_delay)),
            options: Arc::new(options),
            state: Arc::new(Mutex::new(OrchestratorState {
                serializer: ActionSerializer::new(),
                bootstrap: BootstrapTracker::new(),
                control: None,
                event_pump: None,
                generation: 0,
            })),
            status_tx: Arc::new(status_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TransportSnapshot> {
        self.status_tx.subscribe()
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        self.status_tx.borrow().clone()
    }

    /// Bring the transport up. Queued if a transition is in flight; a no-op
    /// when the transport is already up.
    ///
    /// Failures are returned and also published as the snapshot's last error.
    pub async fn start(&self) -> Result<(), TransportError> {
        self.start_boxed().await
    }

    /// Tear the transport down. Queued if a transition is in flight.
    pub async fn stop(&self) -> Result<(), TransportError> {
        self.stop_boxed().await
    }

    /// Stop and start again with freshly loaded settings. Queued as a single
    /// action if a transition is in flight.
    pub async fn restart(&self) -> Result<(), TransportError> {
        self.restart_boxed().await
    }

    /// Toggle the network now instead of waiting for the retry timer.
    pub async fn kick(&self) -> Result<(), TransportError> {
        let control = self
            .state
            .lock()
            .await
            .control
            .clone()
            .ok_or(TransportError::MissingController)?;
        control.kick_network().await
    }

    pub async fn is_retry_armed(&self) -> bool {
        self.retry.is_armed().await
    }

    fn start_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(
            async move {
                let generation = {
                    let mut state = self.state.lock().await;
                    if !state.serializer.is_locked() && self.snapshot().is_ready() {
                        debug!("transport already up, start ignored");
                        return Ok(());
                    }
                    if state.serializer.admit(TransportAction::Connect) == Admission::Deferred {
                        info!("transport transition in flight, start queued");
                        return Ok(());
                    }
                    self.begin_start(&mut state)
                };

                self.run_start(generation).await
            }
            .instrument(info_span!("usecase.transport.start")),
        )
    }

    fn stop_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(
            async move {
                let (control, pump) = {
                    let mut state = self.state.lock().await;
                    let idle = state.control.is_none()
                        && self.snapshot().status == TransportStatus::Disconnected
                        && !self.process.is_active();
                    if !state.serializer.is_locked() && idle {
                        debug!("transport already stopped, stop ignored");
                        return Ok(());
                    }
                    if state.serializer.admit(TransportAction::Disconnect) == Admission::Deferred {
                        info!("transport transition in flight, stop queued");
                        return Ok(());
                    }
                    self.begin_stop(&mut state)
                };

                let shutdown_error = self.tear_down(control, pump).await;

                let queued = {
                    let mut state = self.state.lock().await;
                    state.bootstrap.reset();
                    let queued = state.serializer.unlock();
                    self.status_tx.send_modify(|s| {
                        s.status = TransportStatus::Disconnected;
                        s.bootstrap_progress = 0;
                        if shutdown_error.is_some() {
                            s.last_error = shutdown_error.clone();
                        }
                    });
                    queued
                };
                info!("transport stopped");

                self.replay(queued).await;
                Ok(())
            }
            .instrument(info_span!("usecase.transport.stop")),
        )
    }

    /// The serializer stays locked from teardown through the new start, so
    /// no other request can slip in between the two halves.
    fn restart_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(
            async move {
                let (control, pump) = {
                    let mut state = self.state.lock().await;
                    if state.serializer.admit(TransportAction::Restart) == Admission::Deferred {
                        info!("transport transition in flight, restart queued");
                        return Ok(());
                    }
                    self.begin_stop(&mut state)
                };

                if let Some(err) = self.tear_down(control, pump).await {
                    warn!(error = %err, "previous transport process abandoned during restart");
                }

                let generation = {
                    let mut state = self.state.lock().await;
                    self.begin_start(&mut state)
                };
                self.run_start(generation).await
            }
            .instrument(info_span!("usecase.transport.restart")),
        )
    }

    /// Caller holds the serializer.
    fn begin_start(&self, state: &mut OrchestratorState) -> u64 {
        state.bootstrap.reset();
        state.generation += 1;
        self.status_tx.send_modify(|s| {
            s.status = TransportStatus::Connecting;
            s.bootstrap_progress = 0;
            s.last_error = None;
        });
        state.generation
    }

    async fn run_start(&self, generation: u64) -> Result<(), TransportError> {
        info!(generation, "starting transport");
        match self.run_start_sequence(generation).await {
            Ok(()) => {
                info!("transport ports open, waiting for bootstrap");
                Ok(())
            }
            Err(err) => self.handle_start_failure(err).await,
        }
    }

    /// Caller holds the serializer.
    fn begin_stop(
        &self,
        state: &mut OrchestratorState,
    ) -> (Option<Arc<ControlChannelClient>>, Option<AbortHandle>) {
        state.generation += 1;
        self.status_tx
            .send_modify(|s| s.status = TransportStatus::Disconnecting);
        (state.control.take(), state.event_pump.take())
    }

    async fn tear_down(
        &self,
        control: Option<Arc<ControlChannelClient>>,
        pump: Option<AbortHandle>,
    ) -> Option<TransportError> {
        info!("stopping transport");
        self.retry.cancel().await;
        if let Some(pump) = pump {
            pump.abort();
        }
        if let Some(control) = control {
            control.disconnect().await;
        }
        self.wait_for_process_exit().await
    }

    /// Run a queued action, if any.
    fn replay(&self, queued: Option<TransportAction>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some(action) = queued else {
                return;
            };
            debug!(?action, "replaying queued transport action");
            let result = match action {
                TransportAction::Connect => self.start_boxed().await,
                TransportAction::Disconnect => self.stop_boxed().await,
                TransportAction::Restart => self.restart_boxed().await,
            };
            if let Err(err) = result {
                warn!(?action, error = %err, "queued transport action failed");
            }
        })
    }

    fn spawn_replay(&self, queued: Option<TransportAction>) {
        if queued.is_none() {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move { this.replay(queued).await });
    }

    async fn run_start_sequence(&self, generation: u64) -> Result<(), TransportError> {
        if self.process.is_active() {
            warn!("transport process from a previous attempt is still running");
            if let Some(err) = self.wait_for_process_exit().await {
                debug!(error = %err, "previous process abandoned, continuing start");
            }
        }

        self.process.prepare_directories().await?;

        let settings = self.settings.load().await?;
        let bridges = settings.transport.bridges();
        let capability = self.probe.probe().await;
        let registrations = self.pluggable.registrations(&bridges);

        let mut params = LaunchParameters::build(
            &self.options.transport,
            &bridges,
            registrations,
            capability,
        );
        if let Some(pid) = self.options.owning_process {
            params = params.with_owning_process(pid);
        }

        info!(
            bridges = params.bridge_lines.len(),
            pluggable_transports = params.pluggable_transports.len(),
            ?capability,
            "launching transport process"
        );
        self.process.start(params).await?;
        self.pluggable.start().await?;

        let client = Arc::new(
            ControlChannelClient::connect(
                self.connector.as_ref(),
                self.options.transport.control_endpoint(),
                self.options.connect_attempts,
                self.options.connect_retry_delay,
            )
            .await?,
        );

        if let Err(err) = self.open_control_session(&client, generation).await {
            client.disconnect().await;
            return Err(err);
        }
        Ok(())
    }

    async fn open_control_session(
        &self,
        client: &Arc<ControlChannelClient>,
        generation: u64,
    ) -> Result<(), TransportError> {
        let cookie = self.process.read_auth_cookie().await?;
        client.authenticate(&cookie).await?;
        client.take_ownership().await?;

        {
            let mut state = self.state.lock().await;
            state.control = Some(client.clone());
            self.status_tx
                .send_modify(|s| s.status = TransportStatus::PortsOpen);
        }

        // Subscribing takes several round trips; the state lock is not held
        // across them so the control reader is never stuck behind it.
        let events = client.subscribe().await?;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(generation, "start superseded while subscribing");
            return Ok(());
        }
        // Pump and retry timer are installed under the state lock so a
        // bootstrap-complete event cannot cancel the timer before it is armed.
        state.event_pump = Some(self.spawn_event_pump(events, generation));
        self.retry.arm(client.clone()).await;
        Ok(())
    }

    async fn handle_start_failure(&self, err: TransportError) -> Result<(), TransportError> {
        warn!(error = %err, "transport start failed");

        let (control, pump) = {
            let mut state = self.state.lock().await;
            (state.control.take(), state.event_pump.take())
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        self.retry.cancel().await;
        if let Some(control) = control {
            control.disconnect().await;
        }
        // Ownership may not have been taken yet, so closing the control
        // channel does not make the process exit on its own.
        if self.process.is_active() {
            warn!("terminating transport process left by the failed start");
            self.process.abandon().await;
        }

        let fall_back = err.is_connection_refused() && self.disable_custom_bridges().await;

        let queued = {
            let mut state = self.state.lock().await;
            state.bootstrap.reset();
            let queued = state.serializer.unlock();
            self.status_tx.send_modify(|s| {
                s.status = TransportStatus::Disconnected;
                s.bootstrap_progress = 0;
                s.last_error = Some(err.clone());
            });
            queued
        };

        if fall_back {
            warn!("control connection refused with custom bridges, retrying without bridges");
            let result = self.start_boxed().await;
            self.replay(queued).await;
            return result;
        }

        self.replay(queued).await;
        Err(err)
    }

    /// Persist `use_custom_bridges = false`. Returns whether anything changed.
    async fn disable_custom_bridges(&self) -> bool {
        let mut settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "failed to load settings for bridge fallback");
                return false;
            }
        };
        if !settings.transport.use_custom_bridges {
            return false;
        }

        settings.transport.use_custom_bridges = false;
        match self.settings.save(&settings).await {
            Ok(()) => {
                info!("custom bridges disabled");
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to persist bridge fallback");
                false
            }
        }
    }

    /// Poll until the process exits, abandoning it after the shutdown timeout.
    async fn wait_for_process_exit(&self) -> Option<TransportError> {
        let timeout = self.options.shutdown_timeout;
        let deadline = Instant::now() + timeout;

        while self.process.is_active() {
            if Instant::now() >= deadline {
                warn!(?timeout, "transport process did not exit, abandoning it");
                self.process.abandon().await;
                return Some(TransportError::ShutdownTimedOut(timeout));
            }
            sleep(self.options.poll_interval).await;
        }
        None
    }

    fn spawn_event_pump(
        &self,
        mut events: mpsc::Receiver<ControlEvent>,
        generation: u64,
    ) -> AbortHandle {
        let this = self.clone();
        let span = info_span!("transport.event_pump", generation);

        let handle = tokio::spawn(
            async move {
                let mut circuit_reported = false;
                loop {
                    let event = events.recv().await.unwrap_or(ControlEvent::ChannelClosed);
                    match event {
                        ControlEvent::CircuitEstablished if circuit_reported => continue,
                        ControlEvent::CircuitEstablished => circuit_reported = true,
                        ControlEvent::ChannelClosed => {
                            this.handle_event(ControlEvent::ChannelClosed, generation)
                                .await;
                            break;
                        }
                        _ => {}
                    }
                    this.handle_event(event, generation).await;
                }
            }
            .instrument(span),
        );
        handle.abort_handle()
    }

    async fn handle_event(&self, event: ControlEvent, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(?event, "dropping event from a previous connection");
            return;
        }

        match event {
            ControlEvent::BootstrapProgress {
                progress,
                tag,
                summary,
            } => match state.bootstrap.advance(progress) {
                BootstrapStep::Ignored => {}
                BootstrapStep::InProgress(progress) => {
                    state.serializer.lock();
                    self.status_tx
                        .send_modify(|s| s.bootstrap_progress = progress);
                    debug!(progress, ?tag, ?summary, "bootstrap progress");
                }
                BootstrapStep::Complete => {
                    self.retry.cancel().await;
                    let queued = state.serializer.unlock();
                    self.status_tx.send_modify(|s| {
                        s.bootstrap_progress = 100;
                        if s.status == TransportStatus::Connecting {
                            s.status = TransportStatus::PortsOpen;
                        }
                    });
                    info!("transport bootstrap complete");
                    drop(state);
                    self.spawn_replay(queued);
                }
            },
            ControlEvent::CircuitEstablished => {
                if self.snapshot().status == TransportStatus::PortsOpen {
                    self.status_tx
                        .send_modify(|s| s.status = TransportStatus::Connected);
                    info!("transport circuits established");
                } else {
                    debug!(status = ?self.snapshot().status, "circuit event ignored");
                }
            }
            ControlEvent::CircuitNotEstablished { reason } => {
                warn!(?reason, "transport reports no usable circuits");
            }
            ControlEvent::ChannelClosed => {
                state.generation += 1;
                state.control = None;
                state.event_pump = None;
                state.bootstrap.reset();
                self.retry.cancel().await;
                let queued = state.serializer.unlock();
                self.status_tx.send_modify(|s| {
                    s.status = TransportStatus::Disconnected;
                    s.bootstrap_progress = 0;
                    s.last_error = Some(TransportError::Unknown("control channel closed".into()));
                });
                warn!("control channel closed unexpectedly");
                drop(state);
                self.spawn_replay(queued);
            }
        }
    }
}

#[async_trait]
impl TransportControl for TransportOrchestrator {
    async fn start(&self) -> Result<(), TransportError> {
        TransportOrchestrator::start(self).await
    }

    async fn stop(&self) -> Result<(), TransportError> {
        TransportOrchestrator::stop(self).await
    }

    async fn restart(&self) -> Result<(), TransportError> {
        TransportOrchestrator::restart(self).await
    }

    fn subscribe(&self) -> watch::Receiver<TransportSnapshot> {
        TransportOrchestrator::subscribe(self)
    }
}
