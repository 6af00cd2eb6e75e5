//! Processes command implementation

use anyhow::Result;
use volans_core::{NamespaceId, ProcessAttributes};
use volans_engine::Engine;

use super::print_json;

pub async fn execute(engine: &Engine, namespace: NamespaceId, json: bool) -> Result<()> {
    let rows = engine.get_processes(namespace).await;

    if json {
        return print_json(&rows);
    }

    println!("\n⚙️  Processes of namespace {namespace}");
    println!("{:-<60}", "");
    print_table(&rows);

    Ok(())
}

pub fn print_table(rows: &[ProcessAttributes]) {
    if rows.is_empty() {
        println!("No processes found");
        return;
    }

    println!(
        "{:>8} {:<16} {:<5} {:<20} CPUS",
        "PID", "NAME", "STATE", "CMDLINE"
    );
    for row in rows {
        println!(
            "{:>8} {:<16} {:<5} {:<20} {}",
            row.pid,
            row.command_name,
            row.state,
            row.command_line,
            row.cpu_affinity.to_binary_string()
        );
    }

    println!("{:-<60}", "");
    println!("Total: {} process(es)", rows.len());
}
