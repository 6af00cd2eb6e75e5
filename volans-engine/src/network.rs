//! Merged interface telemetry for one network namespace

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument};
use volans_core::{
    EngineEvent, InterfaceStat, NamespaceId, NamespaceKind, ProcessId, Result,
};
use volans_namespace::run_in_namespace;

use crate::link::{self, LinkSnapshot};
use crate::netdev::{parse_net_dev, InterfaceCounters};

/// Merge counters and links by interface name
///
/// Every counters row yields one stat in counters order; link fields stay
/// empty when no link of that name exists. Links without counters are
/// dropped.
#[must_use]
pub fn join_interfaces(
    counters: Vec<InterfaceCounters>,
    links: Vec<LinkSnapshot>,
) -> Vec<InterfaceStat> {
    let links: HashMap<String, LinkSnapshot> =
        links.into_iter().map(|l| (l.name.clone(), l)).collect();

    counters
        .into_iter()
        .map(|c| {
            let mut stat = InterfaceStat {
                rx_errors: c.rx_errors,
                rx_dropped: c.rx_dropped,
                tx_errors: c.tx_errors,
                tx_dropped: c.tx_dropped,
                ..InterfaceStat::default()
            };

            if let Some(link) = links.get(&c.name) {
                stat.link_type = link.link_type();
                stat.hardware_address.clone_from(&link.hardware_address);
                stat.addresses = link.addresses.iter().map(ToString::to_string).collect();
                stat.mtu = link.mtu;
                stat.flags = link.flags;
                stat.channels = link.channels;
                stat.offload = link.offload;
            }

            stat.name = c.name;
            stat
        })
        .collect()
}

/// Collects interface telemetry from inside a network namespace
#[derive(Debug, Clone)]
pub struct NetworkCollector {
    proc_root: PathBuf,
    timeout: Duration,
}

impl NetworkCollector {
    /// Create a collector reading the procfs at `proc_root`
    #[must_use]
    pub fn new(proc_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            proc_root: proc_root.into(),
            timeout,
        }
    }

    /// procfs mount point
    #[must_use]
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Interfaces of the namespace `pid` lives in
    ///
    /// Failure to enter the namespace or a timeout yields no rows.
    #[instrument(skip(self), level = "debug")]
    pub async fn collect(&self, namespace_id: NamespaceId, pid: ProcessId) -> Vec<InterfaceStat> {
        match self.try_collect(pid).await {
            Ok(stats) => stats,
            Err(e) => {
                EngineEvent::entry_failed(namespace_id, &e).emit_trace();
                Vec::new()
            }
        }
    }

    /// Interfaces of the namespace `pid` lives in
    ///
    /// # Errors
    /// Returns error if the namespace cannot be entered, the work times out,
    /// or the counters file is unreadable
    pub async fn try_collect(&self, pid: ProcessId) -> Result<Vec<InterfaceStat>> {
        let pid_dir = self.proc_root.join(pid.to_string());

        let links = run_in_namespace(
            pid_dir.join("ns").join(NamespaceKind::Net.as_str()),
            NamespaceKind::Net,
            self.timeout,
            link::snapshot,
        )
        .await?;

        // net/dev is scoped by pid, no namespace entry needed
        let text = fs::read_to_string(pid_dir.join("net").join("dev")).await?;
        let counters = parse_net_dev(&text);

        debug!(
            pid = %pid,
            links = links.len(),
            counters = counters.len(),
            "Joining interface data"
        );

        Ok(join_interfaces(counters, links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volans_core::{ChannelConfig, LinkFlags};

    fn counters(name: &str, rx_errors: u64) -> InterfaceCounters {
        InterfaceCounters {
            name: name.to_string(),
            rx_errors,
            ..InterfaceCounters::default()
        }
    }

    fn eth0_link() -> LinkSnapshot {
        LinkSnapshot {
            name: "eth0".to_string(),
            hardware_address: Some("02:42:ac:11:00:02".to_string()),
            hardware_type: Some(1),
            flags: LinkFlags::from_bits(libc::IFF_UP as u32),
            addresses: vec!["10.0.0.5".parse().unwrap()],
            mtu: 1500,
            driver: Some("veth".to_string()),
            channels: Some(ChannelConfig {
                combined: 1,
                max_combined: 4,
            }),
            ..LinkSnapshot::default()
        }
    }

    #[test]
    fn test_join_counters_are_authoritative() {
        let links = vec![
            eth0_link(),
            LinkSnapshot {
                name: "tunl0".to_string(),
                ..LinkSnapshot::default()
            },
        ];

        let stats = join_interfaces(vec![counters("eth0", 1), counters("eth1", 7)], links);

        assert_eq!(stats.len(), 2);

        let eth0 = &stats[0];
        assert_eq!(eth0.name, "eth0");
        assert_eq!(eth0.link_type.as_deref(), Some("veth"));
        assert_eq!(eth0.addresses, vec!["10.0.0.5"]);
        assert_eq!(eth0.mtu, 1500);
        assert_eq!(eth0.channels.unwrap().to_string(), "1/4");
        assert_eq!(eth0.rx_errors, 1);

        let eth1 = &stats[1];
        assert_eq!(eth1.name, "eth1");
        assert_eq!(eth1.rx_errors, 7);
        assert!(eth1.link_type.is_none());
        assert!(eth1.hardware_address.is_none());
        assert!(eth1.addresses.is_empty());
        assert_eq!(eth1.mtu, 0);
    }

    #[test]
    fn test_join_keeps_counters_order() {
        let stats = join_interfaces(
            vec![counters("lo", 0), counters("eth0", 0), counters("docker0", 0)],
            vec![eth0_link()],
        );

        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["lo", "eth0", "docker0"]);
    }

    #[tokio::test]
    async fn test_unenterable_namespace_yields_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let collector = NetworkCollector::new(dir.path(), Duration::from_secs(1));

        let stats = collector
            .collect(NamespaceId::from_inode(1), ProcessId::from_raw(4242))
            .await;

        assert!(stats.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires CAP_SYS_ADMIN"]
    async fn test_collect_own_namespace() {
        let collector = NetworkCollector::new("/proc", Duration::from_secs(5));

        let stats = collector.try_collect(ProcessId::current()).await.unwrap();
        let lo = stats.iter().find(|s| s.name == "lo").unwrap();

        assert_eq!(lo.link_type.as_deref(), Some("loopback"));
        assert!(lo.flags.is_up());
    }
}
