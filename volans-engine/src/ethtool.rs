//! Driver queries over `SIOCGIFMTU` and `SIOCETHTOOL`
//!
//! Both requests go through nix's ioctl wrappers. Every request points at a
//! `#[repr(C)]` struct that lives for the duration of the call.

use nix::sys::socket::{socket, AddressFamily, SockFlag, SockType};
use std::os::fd::{AsRawFd, OwnedFd};
use tracing::trace;
use volans_core::{ChannelConfig, Error, OffloadFeatures, Result};

const ETHTOOL_GDRVINFO: u32 = 0x03;
const ETHTOOL_GRXCSUM: u32 = 0x14;
const ETHTOOL_GTXCSUM: u32 = 0x16;
const ETHTOOL_GSG: u32 = 0x18;
const ETHTOOL_GTSO: u32 = 0x1e;
const ETHTOOL_GGSO: u32 = 0x23;
const ETHTOOL_GFLAGS: u32 = 0x25;
const ETHTOOL_GGRO: u32 = 0x2b;
const ETHTOOL_GCHANNELS: u32 = 0x3c;

const ETH_FLAG_LRO: u32 = 1 << 15;

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union IfReqData {
    mtu: libc::c_int,
    data: *mut libc::c_void,
    // struct ifmap, the largest member
    _pad: [u8; 24],
}

#[repr(C)]
struct IfReq {
    name: [u8; libc::IFNAMSIZ],
    data: IfReqData,
}

impl IfReq {
    fn new(interface: &str) -> Result<Self> {
        let bytes = interface.as_bytes();
        if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ {
            return Err(Error::parse(format!("invalid interface name: {interface:?}")));
        }

        let mut name = [0u8; libc::IFNAMSIZ];
        name[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            name,
            data: IfReqData { _pad: [0; 24] },
        })
    }
}

mod request {
    use super::IfReq;

    nix::ioctl_read_bad!(siocgifmtu, libc::SIOCGIFMTU, IfReq);
    nix::ioctl_readwrite_bad!(siocethtool, libc::SIOCETHTOOL, IfReq);
}

#[repr(C)]
struct EthtoolValue {
    cmd: u32,
    data: u32,
}

#[repr(C)]
#[allow(dead_code)]
struct EthtoolDrvInfo {
    cmd: u32,
    driver: [u8; 32],
    version: [u8; 32],
    fw_version: [u8; 32],
    bus_info: [u8; 32],
    erom_version: [u8; 32],
    reserved2: [u8; 12],
    n_priv_flags: u32,
    n_stats: u32,
    testinfo_len: u32,
    eedump_len: u32,
    regdump_len: u32,
}

#[repr(C)]
#[derive(Default)]
#[allow(dead_code)]
struct EthtoolChannels {
    cmd: u32,
    max_rx: u32,
    max_tx: u32,
    max_other: u32,
    max_combined: u32,
    rx_count: u32,
    tx_count: u32,
    other_count: u32,
    combined_count: u32,
}

/// Datagram socket used as the ioctl handle
///
/// Must be opened inside the namespace whose interfaces it will query.
#[derive(Debug)]
pub struct EthtoolSocket {
    fd: OwnedFd,
}

impl EthtoolSocket {
    /// Open a socket in the calling thread's network namespace
    ///
    /// # Errors
    /// Returns error if socket(2) fails
    pub fn open() -> Result<Self> {
        let fd = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC,
            None,
        )?;
        Ok(Self { fd })
    }

    /// Interface MTU
    ///
    /// # Errors
    /// Returns error if the interface is unknown
    pub fn mtu(&self, interface: &str) -> Result<u32> {
        let mut req = IfReq::new(interface)?;
        // SAFETY: req is a valid ifreq for the duration of the call
        unsafe { request::siocgifmtu(self.fd.as_raw_fd(), &raw mut req) }?;

        // SAFETY: SIOCGIFMTU fills ifr_mtu
        let mtu = unsafe { req.data.mtu };
        Ok(u32::try_from(mtu).unwrap_or_default())
    }

    /// Driver name, e.g. `veth` or `virtio_net`
    ///
    /// # Errors
    /// Returns error if the interface has no ethtool support
    pub fn driver(&self, interface: &str) -> Result<String> {
        let mut info = EthtoolDrvInfo {
            cmd: ETHTOOL_GDRVINFO,
            driver: [0; 32],
            version: [0; 32],
            fw_version: [0; 32],
            bus_info: [0; 32],
            erom_version: [0; 32],
            reserved2: [0; 12],
            n_priv_flags: 0,
            n_stats: 0,
            testinfo_len: 0,
            eedump_len: 0,
            regdump_len: 0,
        };
        self.ethtool(interface, (&raw mut info).cast())?;

        let len = info.driver.iter().position(|&b| b == 0).unwrap_or(32);
        let driver = String::from_utf8_lossy(&info.driver[..len]).into_owned();
        if driver.is_empty() {
            return Err(Error::parse(format!("{interface}: empty driver name")));
        }
        Ok(driver)
    }

    /// Combined channel configuration
    ///
    /// # Errors
    /// Returns error if the driver does not report channels
    pub fn channels(&self, interface: &str) -> Result<ChannelConfig> {
        let mut channels = EthtoolChannels {
            cmd: ETHTOOL_GCHANNELS,
            ..EthtoolChannels::default()
        };
        self.ethtool(interface, (&raw mut channels).cast())?;

        Ok(ChannelConfig {
            combined: channels.combined_count,
            max_combined: channels.max_combined,
        })
    }

    /// Offload switches; any query the driver rejects reads as off
    #[must_use]
    pub fn offload(&self, interface: &str) -> OffloadFeatures {
        let flag = |cmd| self.value(interface, cmd).is_ok_and(|v| v != 0);

        OffloadFeatures {
            tso: flag(ETHTOOL_GTSO),
            gso: flag(ETHTOOL_GGSO),
            lro: self
                .value(interface, ETHTOOL_GFLAGS)
                .is_ok_and(|flags| flags & ETH_FLAG_LRO != 0),
            gro: flag(ETHTOOL_GGRO),
            scatter_gather: flag(ETHTOOL_GSG),
            rx_checksum: flag(ETHTOOL_GRXCSUM),
            tx_checksum: flag(ETHTOOL_GTXCSUM),
        }
    }

    fn value(&self, interface: &str, cmd: u32) -> Result<u32> {
        let mut value = EthtoolValue { cmd, data: 0 };
        self.ethtool(interface, (&raw mut value).cast())?;
        Ok(value.data)
    }

    fn ethtool(&self, interface: &str, data: *mut libc::c_void) -> Result<()> {
        let mut req = IfReq::new(interface)?;
        req.data = IfReqData { data };

        // SAFETY: req and the struct behind data outlive the call
        unsafe { request::siocethtool(self.fd.as_raw_fd(), &raw mut req) }.map_err(|e| {
            trace!(interface, error = %e, "ethtool query rejected");
            Error::System(e)
        })?;
        Ok(())
    }
}
