//! Process launch parameters for the proxy client.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::bridges::BridgeConfiguration;

pub const DEFAULT_CONTROL_PORT: u16 = 39069;
pub const DEFAULT_SOCKS_PORT: u16 = 39059;
pub const AUTH_COOKIE_FILE: &str = "control_auth_cookie";
pub const ONION_AUTH_DIR: &str = "auth";

/// Result of the local network-capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkCapability {
    Ipv6Only,
    Ipv4Only,
    DualStack,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpPreference {
    Ipv6Only,
    /// Dual stack, unknown, or IPv4 fallback.
    Ipv4WithIpv6,
}

impl From<NetworkCapability> for IpPreference {
    fn from(capability: NetworkCapability) -> Self {
        match capability {
            NetworkCapability::Ipv6Only => IpPreference::Ipv6Only,
            NetworkCapability::Ipv4Only
            | NetworkCapability::DualStack
            | NetworkCapability::Unknown => IpPreference::Ipv4WithIpv6,
        }
    }
}

/// A pluggable-transport registration (`ClientTransportPlugin` value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluggableTransport {
    /// Transport names served by this helper, e.g. `obfs4,meek_lite`.
    pub names: Vec<String>,
    /// How the proxy reaches the helper, e.g. `exec /usr/bin/lyrebird` or
    /// `socks5 127.0.0.1:47351`.
    pub endpoint: String,
}

impl PluggableTransport {
    pub fn plugin_line(&self) -> String {
        format!("{} {}", self.names.join(","), self.endpoint)
    }
}

/// Static part of the transport configuration (from `AppConfig`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub data_dir: PathBuf,
    pub control_port: u16,
    pub socks_port: u16,
}

impl TransportConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            control_port: DEFAULT_CONTROL_PORT,
            socks_port: DEFAULT_SOCKS_PORT,
        }
    }

    pub fn control_endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.control_port))
    }

    pub fn socks_endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, self.socks_port))
    }

    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir.join(AUTH_COOKIE_FILE)
    }

    pub fn onion_auth_dir(&self) -> PathBuf {
        self.data_dir.join(ONION_AUTH_DIR)
    }
}

/// Full parameter set for one launch of the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParameters {
    pub data_dir: PathBuf,
    pub onion_auth_dir: PathBuf,
    pub control_endpoint: SocketAddr,
    pub socks_endpoint: SocketAddr,
    pub pluggable_transports: Vec<PluggableTransport>,
    pub bridge_lines: Vec<String>,
    pub ip_preference: IpPreference,
    pub owning_process: Option<u32>,
}

impl LaunchParameters {
    pub fn build(
        config: &TransportConfig,
        bridges: &BridgeConfiguration,
        pluggable_transports: Vec<PluggableTransport>,
        capability: NetworkCapability,
    ) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            onion_auth_dir: config.onion_auth_dir(),
            control_endpoint: config.control_endpoint(),
            socks_endpoint: config.socks_endpoint(),
            pluggable_transports,
            bridge_lines: bridges.effective_lines(),
            ip_preference: capability.into(),
            owning_process: None,
        }
    }

    pub fn with_owning_process(mut self, pid: u32) -> Self {
        self.owning_process = Some(pid);
        self
    }

    pub fn uses_bridges(&self) -> bool {
        !self.bridge_lines.is_empty()
    }

    /// Command-line arguments for the proxy binary.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--ignore-missing-torrc".into(),
            "--ClientOnly".into(),
            "1".into(),
            "--AvoidDiskWrites".into(),
            "1".into(),
            "--SocksPort".into(),
            self.socks_endpoint.to_string(),
            "--ControlPort".into(),
            self.control_endpoint.to_string(),
            "--CookieAuthentication".into(),
            "1".into(),
            "--DataDirectory".into(),
            path_arg(&self.data_dir),
            "--ClientOnionAuthDir".into(),
            path_arg(&self.onion_auth_dir),
            "--Log".into(),
            "notice stdout".into(),
        ];

        if let Some(pid) = self.owning_process {
            args.push("--__OwningControllerProcess".into());
            args.push(pid.to_string());
        }

        for transport in &self.pluggable_transports {
            args.push("--ClientTransportPlugin".into());
            args.push(transport.plugin_line());
        }

        if self.uses_bridges() {
            args.push("--UseBridges".into());
            args.push("1".into());
            for line in &self.bridge_lines {
                args.push("--Bridge".into());
                args.push(line.clone());
            }
        }

        match self.ip_preference {
            IpPreference::Ipv6Only => {
                args.extend(
                    [
                        "--ClientUseIPv4",
                        "0",
                        "--ClientUseIPv6",
                        "1",
                        "--ClientPreferIPv6ORPort",
                        "1",
                    ]
                    .map(String::from),
                );
            }
            IpPreference::Ipv4WithIpv6 => {
                args.extend(["--ClientUseIPv4", "1", "--ClientUseIPv6", "1"].map(String::from));
            }
        }

        args
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
