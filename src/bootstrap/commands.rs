//! Line commands accepted on stdin.

use std::path::PathBuf;

use ow_core::transport::TransportSnapshot;
use ow_core::wallet::{Network, UnknownNetwork, WalletState};

pub const HELP: &str = "\
commands:
  foreground              start the transport, reconnect the wallet if enabled
  background              disconnect the wallet and stop the transport
  status                  print transport and wallet state
  network <name>          switch wallet network (mainnet, nextnet, stagenet, esmeralda, localnet)
  bridges none            disable custom bridges and restart the transport
  bridges custom <file>   use bridge lines from <file> and restart the transport
  hold | release          ignore / honour background requests
  retry                   restart a stopped transport or kick a stalled bootstrap
  quit                    shut down";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    None,
    Custom(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    Foreground,
    Background,
    Status,
    Network(Network),
    Bridges(BridgeRequest),
    Hold,
    Release,
    Retry,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Network(#[from] UnknownNetwork),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<DaemonCommand>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("foreground", []) => DaemonCommand::Foreground,
        ("background", []) => DaemonCommand::Background,
        ("status", []) => DaemonCommand::Status,
        ("network", [name]) => DaemonCommand::Network(name.parse()?),
        ("network", _) => return Err(CommandError::Usage("network <name>")),
        ("bridges", ["none"]) => DaemonCommand::Bridges(BridgeRequest::None),
        ("bridges", ["custom", path]) => {
            DaemonCommand::Bridges(BridgeRequest::Custom(PathBuf::from(*path)))
        }
        ("bridges", _) => return Err(CommandError::Usage("bridges none | bridges custom <file>")),
        ("hold", []) => DaemonCommand::Hold,
        ("release", []) => DaemonCommand::Release,
        ("retry", []) => DaemonCommand::Retry,
        ("help", _) => DaemonCommand::Help,
        ("quit" | "exit", []) => DaemonCommand::Quit,
        _ => return Err(CommandError::Unknown(line.trim().to_string())),
    };
    Ok(Some(command))
}

/// One-line summary for the `status` command.
pub fn describe_status(transport: &TransportSnapshot, wallet: &WalletState, held: bool) -> String {
    let mut out = format!(
        "transport: {:?} ({}%) | wallet: {}",
        transport.status,
        transport.bootstrap_progress,
        describe_wallet(wallet)
    );
    if held {
        out.push_str(" | background ignored");
    }
    if let Some(err) = &transport.last_error {
        out.push_str(&format!(" | last error: {err}"));
    }
    out
}

fn describe_wallet(state: &WalletState) -> String {
    match state {
        WalletState::NotReady => "not ready".into(),
        WalletState::Starting => "starting".into(),
        WalletState::Started => "started".into(),
        WalletState::StartFailed(err) => format!("start failed ({err})"),
    }
}
