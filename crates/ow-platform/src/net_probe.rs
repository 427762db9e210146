use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use local_ip_address::list_afinet_netifas;
use tracing::{debug, warn};

use ow_core::ports::NetworkProbePort;
use ow_core::transport::NetworkCapability;

/// Classifies the host's connectivity from its configured interface
/// addresses. Only globally routable addresses count.
#[derive(Debug, Default)]
pub struct LocalNetworkProbe;

impl LocalNetworkProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NetworkProbePort for LocalNetworkProbe {
    async fn probe(&self) -> NetworkCapability {
        let interfaces = match tokio::task::spawn_blocking(list_afinet_netifas).await {
            Ok(Ok(ifaces)) => ifaces,
            Ok(Err(e)) => {
                warn!(error = %e, "failed to enumerate network interfaces");
                return NetworkCapability::Unknown;
            }
            Err(e) => {
                warn!(error = %e, "network probe task failed");
                return NetworkCapability::Unknown;
            }
        };

        let capability = classify(interfaces.iter().map(|(_, ip)| *ip));
        debug!(?capability, interfaces = interfaces.len(), "network capability probed");
        capability
    }
}

pub(crate) fn classify(addresses: impl IntoIterator<Item = IpAddr>) -> NetworkCapability {
    let mut has_v4 = false;
    let mut has_v6 = false;

    for ip in addresses {
        match ip {
            IpAddr::V4(v4) if is_usable_ipv4(v4) => has_v4 = true,
            IpAddr::V6(v6) if is_global_ipv6(v6) => has_v6 = true,
            _ => {}
        }
    }

    match (has_v4, has_v6) {
        (true, true) => NetworkCapability::DualStack,
        (true, false) => NetworkCapability::Ipv4Only,
        (false, true) => NetworkCapability::Ipv6Only,
        (false, false) => NetworkCapability::Unknown,
    }
}

// Private IPv4 still reaches the internet through NAT; only loopback,
// link-local and unspecified addresses are discarded.
fn is_usable_ipv4(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback() || ip.is_link_local() || ip.is_unspecified())
}

fn is_global_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return false;
    }
    let first = ip.segments()[0];
    let link_local = (first & 0xffc0) == 0xfe80;
    let unique_local = (first & 0xfe00) == 0xfc00;
    !(link_local || unique_local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn loopback_only_is_unknown() {
        assert_eq!(
            classify([ip("127.0.0.1"), ip("::1")]),
            NetworkCapability::Unknown
        );
    }

    #[test]
    fn private_ipv4_counts_as_ipv4() {
        assert_eq!(
            classify([ip("127.0.0.1"), ip("192.168.1.20"), ip("fe80::1")]),
            NetworkCapability::Ipv4Only
        );
    }

    #[test]
    fn global_ipv6_without_ipv4_is_ipv6_only() {
        assert_eq!(
            classify([ip("::1"), ip("169.254.3.4"), ip("2001:db8::7")]),
            NetworkCapability::Ipv6Only
        );
    }

    #[test]
    fn unique_local_ipv6_is_ignored() {
        assert_eq!(
            classify([ip("10.0.0.2"), ip("fd12:3456::1")]),
            NetworkCapability::Ipv4Only
        );
    }

    #[test]
    fn both_families_are_dual_stack() {
        assert_eq!(
            classify([ip("10.0.0.2"), ip("2a01:4f8::1")]),
            NetworkCapability::DualStack
        );
    }
}
