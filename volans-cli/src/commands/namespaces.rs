//! Namespaces command implementation

use anyhow::Result;
use volans_engine::Engine;

use super::print_json;

pub async fn execute(engine: &Engine, json: bool) -> Result<()> {
    tracing::debug!("Listing namespaces");

    let rows = engine.list_namespaces().await;

    if json {
        return print_json(&rows);
    }

    println!("\n📋 Namespaces");
    println!("{:-<60}", "");

    if rows.is_empty() {
        println!("No namespaces found");
        return Ok(());
    }

    println!("{:<14} {:<6} {:>8}  POD", "NAMESPACE", "KIND", "MEMBERS");
    for row in &rows {
        println!(
            "{:<14} {:<6} {:>8}  {}",
            row.namespace_id,
            row.kind,
            row.member_count,
            row.owner_pod.as_deref().unwrap_or("-")
        );
    }

    println!("{:-<60}", "");
    println!("Total: {} namespace(s)", rows.len());

    Ok(())
}
