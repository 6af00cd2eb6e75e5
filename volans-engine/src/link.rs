//! Link list of the calling thread's network namespace

use nix::ifaddrs::getifaddrs;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;
use volans_core::{ChannelConfig, LinkFlags, OffloadFeatures, Result};

use crate::ethtool::EthtoolSocket;

/// One interface as seen from inside its namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    /// Interface name
    pub name: String,
    /// MAC address; `None` when absent or all zero
    pub hardware_address: Option<String>,
    /// `ARPHRD_*` hardware type
    pub hardware_type: Option<u16>,
    /// Interface flags
    pub flags: LinkFlags,
    /// Addresses, link-local ones excluded
    pub addresses: Vec<IpAddr>,
    /// MTU, zero when unknown
    pub mtu: u32,
    /// Driver name
    pub driver: Option<String>,
    /// Channel configuration
    pub channels: Option<ChannelConfig>,
    /// Offload switches
    pub offload: OffloadFeatures,
}

impl LinkSnapshot {
    /// Driver name, or the hardware type name without one
    #[must_use]
    pub fn link_type(&self) -> Option<String> {
        self.driver
            .clone()
            .or_else(|| self.hardware_type.map(|t| hardware_type_name(t).to_string()))
    }
}

/// Name of an `ARPHRD_*` hardware type
#[must_use]
pub const fn hardware_type_name(hardware_type: u16) -> &'static str {
    match hardware_type {
        1 => "ether",
        512 => "ppp",
        768 => "ipip",
        769 => "tunnel6",
        772 => "loopback",
        776 => "sit",
        778 => "gre",
        823 => "ip6gre",
        0xFFFE => "none",
        0xFFFF => "void",
        _ => "unknown",
    }
}

/// Check for link-local unicast (169.254.0.0/16, fe80::/10)
#[must_use]
pub const fn is_link_local(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_unicast_link_local(),
    }
}

fn format_mac(bytes: [u8; 6]) -> Option<String> {
    if bytes.iter().all(|&b| b == 0) {
        return None;
    }
    Some(
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":"),
    )
}

/// List links of the current namespace from getifaddrs(3)
///
/// Order follows the first appearance of each name.
///
/// # Errors
/// Returns error if getifaddrs(3) fails
pub fn list_links() -> Result<Vec<LinkSnapshot>> {
    let mut links: Vec<LinkSnapshot> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entry in getifaddrs()? {
        let position = *positions
            .entry(entry.interface_name.clone())
            .or_insert_with(|| {
                links.push(LinkSnapshot {
                    name: entry.interface_name.clone(),
                    flags: LinkFlags::from_bits(entry.flags.bits().cast_unsigned()),
                    ..LinkSnapshot::default()
                });
                links.len() - 1
            });
        let link = &mut links[position];

        let Some(address) = entry.address else {
            continue;
        };

        if let Some(link_addr) = address.as_link_addr() {
            link.hardware_type = Some(link_addr.hatype());
            link.hardware_address = link_addr.addr().and_then(format_mac);
        } else if let Some(v4) = address.as_sockaddr_in() {
            push_address(link, IpAddr::V4(v4.ip()));
        } else if let Some(v6) = address.as_sockaddr_in6() {
            push_address(link, IpAddr::V6(v6.ip()));
        }
    }

    Ok(links)
}

fn push_address(link: &mut LinkSnapshot, addr: IpAddr) {
    if !is_link_local(&addr) && !link.addresses.contains(&addr) {
        link.addresses.push(addr);
    }
}

/// List links and fill in the driver-reported fields
///
/// Per-interface driver failures leave the field empty.
///
/// # Errors
/// Returns error if the link list or the query socket is unavailable
pub fn snapshot() -> Result<Vec<LinkSnapshot>> {
    let mut links = list_links()?;
    let socket = EthtoolSocket::open()?;

    for link in &mut links {
        match socket.mtu(&link.name) {
            Ok(mtu) => link.mtu = mtu,
            Err(e) => debug!(interface = %link.name, error = %e, "MTU unavailable"),
        }
        link.driver = socket.driver(&link.name).ok();
        link.channels = socket.channels(&link.name).ok();
        link.offload = socket.offload(&link.name);
    }

    debug!(count = links.len(), "Collected link snapshot");

    Ok(links)
}
