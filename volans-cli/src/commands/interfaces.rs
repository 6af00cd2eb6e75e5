//! Interfaces command implementation

use anyhow::Result;
use volans_core::{InterfaceStat, NamespaceId};
use volans_engine::Engine;

use super::{on_off, print_json};

pub async fn execute(engine: &Engine, namespace: NamespaceId, json: bool) -> Result<()> {
    let rows = engine.get_interfaces(namespace).await;

    if json {
        return print_json(&rows);
    }

    println!("\n🌐 Interfaces of namespace {namespace}");
    println!("{:-<60}", "");
    print_table(&rows);

    Ok(())
}

pub fn print_table(rows: &[InterfaceStat]) {
    if rows.is_empty() {
        println!("No interfaces found");
        return;
    }

    for row in rows {
        println!(
            "{} ({})",
            row.name,
            row.link_type.as_deref().unwrap_or("unknown")
        );
        println!(
            "  mac: {}  mtu: {}  flags: {}",
            row.hardware_address.as_deref().unwrap_or("-"),
            row.mtu,
            row.flags
        );
        if !row.addresses.is_empty() {
            println!("  addresses: {}", row.addresses.join(", "));
        }
        println!(
            "  rx errors/dropped: {}/{}  tx errors/dropped: {}/{}",
            row.rx_errors, row.rx_dropped, row.tx_errors, row.tx_dropped
        );
        println!(
            "  channels: {}",
            row.channels
                .map_or_else(|| "-".to_string(), |c| c.to_string())
        );
        let o = &row.offload;
        println!(
            "  tso: {} gso: {} lro: {} gro: {} sg: {} rx-csum: {} tx-csum: {}",
            on_off(o.tso),
            on_off(o.gso),
            on_off(o.lro),
            on_off(o.gro),
            on_off(o.scatter_gather),
            on_off(o.rx_checksum),
            on_off(o.tx_checksum)
        );
    }

    println!("{:-<60}", "");
    println!("Total: {} interface(s)", rows.len());
}
