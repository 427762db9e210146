//! Control-port client over TCP.
//!
//! A reader task owns the read half of the socket. Replies are handed to
//! waiting commands in the order the commands were written; `650` events go
//! to the subscriber, if any.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::AbortHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, trace, warn};

use ow_core::ports::{ControlChannelConnectorPort, ControlChannelPort};
use ow_core::transport::{ConnectionFailure, ControlEvent, TransportError};

use super::protocol::{
    self, ControlProtocolError, Reply, ReplyAssembler, GETINFO_BOOTSTRAP_PHASE,
    GETINFO_CIRCUIT_ESTABLISHED, QUIT, SET_EVENTS, TAKE_OWNERSHIP,
};

const MAX_LINE_LENGTH: usize = 64 * 1024;
const EVENT_BUFFER: usize = 64;

type PendingReply = oneshot::Sender<Result<Reply, ControlProtocolError>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct TorControlConnector;

impl TorControlConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ControlChannelConnectorPort for TorControlConnector {
    async fn connect(
        &self,
        endpoint: SocketAddr,
    ) -> Result<Arc<dyn ControlChannelPort>, ConnectionFailure> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(ConnectionFailure::from)?;
        debug!(%endpoint, "control port connected");
        Ok(Arc::new(TorControlChannel::new(stream)))
    }
}

#[derive(Default)]
struct Shared {
    pending: Mutex<VecDeque<PendingReply>>,
    events: Mutex<Option<mpsc::Sender<ControlEvent>>>,
    closed: AtomicBool,
}

impl Shared {
    async fn deliver(&self, event: ControlEvent) {
        let sender = self.events.lock().await.clone();
        if let Some(sender) = sender {
            if sender.send(event).await.is_err() {
                self.events.lock().await.take();
            }
        }
    }

    async fn close(&self, reason: ControlProtocolError) {
        let waiting: Vec<PendingReply> = {
            let mut pending = self.pending.lock().await;
            self.closed.store(true, Ordering::SeqCst);
            pending.drain(..).collect()
        };
        for tx in waiting {
            let _ = tx.send(Err(reason.clone()));
        }

        let sender = self.events.lock().await.take();
        if let Some(sender) = sender {
            let _ = sender.send(ControlEvent::ChannelClosed).await;
        }
    }
}

pub struct TorControlChannel {
    writer: Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
    shared: Arc<Shared>,
    reader: AbortHandle,
}

impl TorControlChannel {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let shared = Arc::new(Shared::default());
        let lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let reader = tokio::spawn(read_loop(lines, shared.clone())).abort_handle();

        Self {
            writer: Mutex::new(FramedWrite::new(write_half, LinesCodec::new())),
            shared,
            reader,
        }
    }

    async fn command(&self, line: &str) -> Result<Reply, ControlProtocolError> {
        let verb = line.split_whitespace().next().unwrap_or_default();
        trace!(command = verb, "sending control command");

        let rx = {
            let mut writer = self.writer.lock().await;
            let (tx, rx) = oneshot::channel();
            {
                let mut pending = self.shared.pending.lock().await;
                if self.shared.closed.load(Ordering::SeqCst) {
                    return Err(ControlProtocolError::Closed);
                }
                pending.push_back(tx);
            }
            // CRLF line ending; the codec appends the LF.
            if let Err(e) = writer.send(format!("{line}\r")).await {
                self.shared.pending.lock().await.pop_back();
                return Err(ControlProtocolError::Io(e.to_string()));
            }
            rx
        };

        rx.await.map_err(|_| ControlProtocolError::Closed)?
    }

    async fn checked(&self, line: &str) -> Result<Reply, TransportError> {
        Ok(self.command(line).await?.into_ok()?)
    }
}

impl Drop for TorControlChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl ControlChannelPort for TorControlChannel {
    async fn authenticate(&self, cookie: &[u8]) -> Result<(), TransportError> {
        let reply = self.command(&protocol::authenticate_command(cookie)).await?;
        if reply.is_ok() {
            debug!("control channel authenticated");
            return Ok(());
        }
        Err(TransportError::AuthenticationFailed(format!(
            "{} {}",
            reply.code,
            reply.message()
        )))
    }

    async fn take_ownership(&self) -> Result<(), TransportError> {
        self.checked(TAKE_OWNERSHIP).await.map(|_| ())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), TransportError> {
        self.checked(&protocol::set_conf_command(key, value))
            .await
            .map(|_| ())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<ControlEvent>, TransportError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        {
            let mut events = self.shared.events.lock().await;
            if events.is_some() {
                return Err(TransportError::Unknown(
                    "control events are already subscribed".into(),
                ));
            }
            *events = Some(tx.clone());
        }

        self.checked(SET_EVENTS).await?;

        // Progress reached before SETEVENTS took effect is not re-announced.
        let phase = self.checked(GETINFO_BOOTSTRAP_PHASE).await?;
        if let Some(event) = protocol::decode_bootstrap_phase(&phase) {
            let _ = tx.send(event).await;
        }
        let circuit = self.checked(GETINFO_CIRCUIT_ESTABLISHED).await?;
        if protocol::circuit_established(&circuit) {
            let _ = tx.send(ControlEvent::CircuitEstablished).await;
        }

        Ok(rx)
    }

    async fn disconnect(&self) {
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(format!("{QUIT}\r")).await {
                debug!(error = %e, "failed to send QUIT");
            }
            if let Err(e) = writer.get_mut().shutdown().await {
                debug!(error = %e, "failed to shut down control socket");
            }
        }
        self.reader.abort();
        self.shared.close(ControlProtocolError::Closed).await;
        debug!("control channel disconnected");
    }
}

async fn read_loop(mut lines: FramedRead<OwnedReadHalf, LinesCodec>, shared: Arc<Shared>) {
    let mut assembler = ReplyAssembler::default();

    let reason = loop {
        let line = match lines.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => break ControlProtocolError::Io(e.to_string()),
            None => break ControlProtocolError::Closed,
        };

        let reply = match assembler.push(&line) {
            Ok(Some(reply)) => reply,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "dropping unparseable control line");
                continue;
            }
        };

        if reply.is_async_event() {
            match protocol::decode_event(&reply) {
                Some(event) => shared.deliver(event).await,
                None => trace!(line = reply.message(), "ignoring control event"),
            }
            continue;
        }

        let waiter = shared.pending.lock().await.pop_front();
        match waiter {
            Some(tx) => {
                let _ = tx.send(Ok(reply));
            }
            None => warn!(code = reply.code, "control reply without a pending command"),
        }
    };

    debug!(reason = %reason, "control reader stopped");
    shared.close(reason).await;
}
