//! Ownership sync against a mock runtime

use std::sync::Arc;
use volans_container::{ContainerCorrelator, MockRuntime, OwnershipRetention};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("debug").init();

    println!("🧪 Syncing with MockRuntime (no daemon required)\n");

    let runtime = MockRuntime::new();
    runtime.add_sandbox("a1", "default", "web", 100).await;
    runtime.add_sandbox("b2", "kube-system", "coredns", 210).await;

    let correlator = ContainerCorrelator::new(Arc::new(runtime.clone()))
        .with_retention(OwnershipRetention::PruneUnobserved);

    let report = correlator.sync().await;
    println!("✅ First sync: {report:?}");

    // Pod restarted with a new pause process
    runtime.set_pid("a1", 300).await;
    runtime.remove("b2").await;

    let report = correlator.sync().await;
    println!("✅ Second sync: {report:?}");

    // Daemon goes away; records stay
    runtime.set_unreachable(true).await;
    let report = correlator.sync().await;
    println!("⚠️  Third sync degraded: {}", report.degraded);

    println!("\n📋 Ownership:");
    for ownership in correlator.ownerships().await {
        println!("  {} -> pid {}", ownership.pod_label(), ownership.pid);
    }

    Ok(())
}
