//! Index the host's namespaces
//!
//! Run with: sudo cargo run --example list_namespaces

use std::sync::Arc;
use volans_core::NamespaceKind;
use volans_namespace::{NamespaceIndex, ProcFs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("🦀 volans namespace index\n");

    let index = NamespaceIndex::new(
        Arc::new(ProcFs::default()),
        vec![NamespaceKind::Net, NamespaceKind::Pid],
    );
    let memberships = index.full_scan().await?;
    println!("📊 {memberships} memberships indexed\n");

    for group in index.groups().await {
        println!(
            "  {:<5} {:<12} {} process(es)",
            group.kind,
            group.namespace_id,
            group.pids.len()
        );
    }

    let report = index.reconcile().await?;
    println!("\n🔄 Reconcile: +{} -{}", report.added, report.removed);

    Ok(())
}
