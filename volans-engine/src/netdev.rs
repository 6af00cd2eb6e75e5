//! `/proc/<pid>/net/dev` counters

use procfs::FromBufRead;
use procfs::net::{DeviceStatus, InterfaceDeviceStatus};
use tracing::debug;

/// Error and drop counters of one interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    /// Interface name
    pub name: String,
    /// Bytes received
    pub rx_bytes: u64,
    /// Packets received
    pub rx_packets: u64,
    /// Receive errors
    pub rx_errors: u64,
    /// Receive drops
    pub rx_dropped: u64,
    /// Bytes sent
    pub tx_bytes: u64,
    /// Packets sent
    pub tx_packets: u64,
    /// Transmit errors
    pub tx_errors: u64,
    /// Transmit drops
    pub tx_dropped: u64,
}

impl From<DeviceStatus> for InterfaceCounters {
    fn from(dev: DeviceStatus) -> Self {
        Self {
            name: dev.name,
            rx_bytes: dev.recv_bytes,
            rx_packets: dev.recv_packets,
            rx_errors: dev.recv_errs,
            rx_dropped: dev.recv_drop,
            tx_bytes: dev.sent_bytes,
            tx_packets: dev.sent_packets,
            tx_errors: dev.sent_errs,
            tx_dropped: dev.sent_drop,
        }
    }
}

/// Parse the whole file, keeping its row order
///
/// Each row goes through procfs's parser on its own, so a malformed row is
/// skipped without losing the rest of the table.
#[must_use]
pub fn parse_net_dev(text: &str) -> Vec<InterfaceCounters> {
    let mut lines = text.lines();
    let header: String = lines.by_ref().take(2).map(|l| format!("{l}\n")).collect();

    lines
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let row = format!("{header}{line}\n");
            match InterfaceDeviceStatus::from_buf_read(row.as_bytes()) {
                Ok(parsed) => parsed.0.into_values().next().map(InterfaceCounters::from),
                Err(e) => {
                    debug!(row = line.trim(), error = %e, "Skipping malformed net/dev row");
                    None
                }
            }
        })
        .collect()
}
