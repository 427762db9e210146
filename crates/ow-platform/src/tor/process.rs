use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ow_core::ports::TransportProcessPort;
use ow_core::transport::{LaunchParameters, TransportConfig, TransportError};

const REAP_TIMEOUT: Duration = Duration::from_secs(5);

struct Supervisor {
    kill_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The proxy child process.
///
/// A supervisor task owns the [`Child`] and clears the active flag when it
/// exits. Output lines are forwarded to `tracing` under `ow_platform::tor`.
pub struct TorProcess {
    binary: PathBuf,
    config: TransportConfig,
    active: Arc<AtomicBool>,
    supervisor: Mutex<Option<Supervisor>>,
}

impl TorProcess {
    pub fn new(binary: impl Into<PathBuf>, config: TransportConfig) -> Self {
        Self {
            binary: binary.into(),
            config,
            active: Arc::new(AtomicBool::new(false)),
            supervisor: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TransportProcessPort for TorProcess {
    async fn prepare_directories(&self) -> anyhow::Result<()> {
        let auth_dir = self.config.onion_auth_dir();
        tokio::fs::create_dir_all(&auth_dir)
            .await
            .with_context(|| format!("failed to create {}", auth_dir.display()))?;

        // The proxy refuses a data directory readable by others.
        restrict_to_owner(&self.config.data_dir).await?;
        restrict_to_owner(&auth_dir).await?;
        Ok(())
    }

    async fn start(&self, params: LaunchParameters) -> anyhow::Result<()> {
        if self.is_active() {
            anyhow::bail!("proxy process is already running");
        }

        let mut child = Command::new(&self.binary)
            .args(params.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.binary.display()))?;

        let pid = child.id();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr));
        }

        self.active.store(true, Ordering::SeqCst);
        let (kill_tx, kill_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(child, kill_rx, self.active.clone()));
        *self.supervisor.lock().await = Some(Supervisor { kill_tx, task });

        info!(
            ?pid,
            bridges = params.uses_bridges(),
            transports = params.pluggable_transports.len(),
            "proxy process started"
        );
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn read_auth_cookie(&self) -> Result<Vec<u8>, TransportError> {
        let path = self.config.cookie_path();
        match tokio::fs::read(&path).await {
            Ok(cookie) if !cookie.is_empty() => Ok(cookie),
            Ok(_) => Err(TransportError::MissingCredential(format!(
                "{} is empty",
                path.display()
            ))),
            Err(e) => Err(TransportError::MissingCredential(format!(
                "{}: {e}",
                path.display()
            ))),
        }
    }

    async fn abandon(&self) {
        let Some(supervisor) = self.supervisor.lock().await.take() else {
            return;
        };
        warn!("force-terminating proxy process");
        let _ = supervisor.kill_tx.send(());
        if tokio::time::timeout(REAP_TIMEOUT, supervisor.task)
            .await
            .is_err()
        {
            error!("proxy process was not reaped after kill");
        }
    }
}

// A dropped kill switch also terminates the child.
async fn supervise(mut child: Child, kill_rx: oneshot::Receiver<()>, active: Arc<AtomicBool>) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to signal proxy process");
            }
            child.wait().await
        }
    };

    active.store(false, Ordering::SeqCst);
    match status {
        Ok(status) => info!(%status, "proxy process exited"),
        Err(e) => warn!(error = %e, "failed to reap proxy process"),
    }
}

async fn forward_output<R>(stream: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log_proxy_line(&line),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "proxy output stream failed");
                break;
            }
        }
    }
}

fn log_proxy_line(line: &str) {
    if line.contains("[err]") {
        error!(target: "ow_platform::tor", "{line}");
    } else if line.contains("[warn]") {
        warn!(target: "ow_platform::tor", "{line}");
    } else {
        info!(target: "ow_platform::tor", "{line}");
    }
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .await
        .with_context(|| format!("failed to restrict permissions on {}", path.display()))
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
