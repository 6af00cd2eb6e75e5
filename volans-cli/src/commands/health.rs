use anyhow::Result;
use nix::unistd::Uid;
use serde::Serialize;
use volans_engine::{Engine, EngineHealth, RuntimeStatus};

use super::print_json;

#[derive(Serialize)]
struct HealthOutput<'a> {
    root: bool,
    proc_root: &'a std::path::Path,
    #[serde(flatten)]
    engine: EngineHealth,
}

/// Execute health check command
pub async fn execute(engine: &Engine, json: bool) -> Result<()> {
    let health = engine.health().await;
    let root = Uid::effective().is_root();

    if json {
        return print_json(&HealthOutput {
            root,
            proc_root: &engine.config().proc_root,
            engine: health,
        });
    }

    println!("\n🏥 volans Health Check\n");
    println!("{:-<60}", "");

    // Engine::init already proved the process table readable
    println!(
        "Checking procfs... ✅ OK ({} processes in {} namespaces under {})",
        health.indexed_processes,
        health.namespaces,
        engine.config().proc_root.display()
    );

    print!("Checking permissions... ");
    if root {
        println!("✅ OK (root)");
    } else {
        println!("⚠️  NOT ROOT");
        println!("   Entering other namespaces needs CAP_SYS_ADMIN;");
        println!("   interface queries will return no rows");
    }

    print!("Checking container runtime... ");
    match &health.runtime {
        RuntimeStatus::Disabled => println!("⚠️  DISABLED"),
        RuntimeStatus::Reachable => {
            println!("✅ OK ({} pod(s) known)", health.ownerships);
        }
        RuntimeStatus::Unreachable { reason } => {
            println!("❌ UNREACHABLE");
            println!("   {reason}");
            println!("   Namespaces will be listed without owning pods");
        }
    }

    println!("{:-<60}", "");

    Ok(())
}
