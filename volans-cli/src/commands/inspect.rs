//! Inspect command implementation

use anyhow::Result;
use serde::Serialize;
use volans_core::{InterfaceStat, NamespaceId, ProcessAttributes};
use volans_engine::Engine;

use super::{interfaces, print_json, processes};

#[derive(Serialize)]
struct Inspection {
    namespace_id: NamespaceId,
    owner_pod: Option<String>,
    interfaces: Vec<InterfaceStat>,
    processes: Vec<ProcessAttributes>,
}

pub async fn execute(engine: &Engine, namespace: NamespaceId, json: bool) -> Result<()> {
    let owner_pod = engine
        .list_namespaces()
        .await
        .into_iter()
        .find(|row| row.namespace_id == namespace)
        .and_then(|row| row.owner_pod);

    let inspection = Inspection {
        namespace_id: namespace,
        owner_pod,
        interfaces: engine.get_interfaces(namespace).await,
        processes: engine.get_processes(namespace).await,
    };

    if json {
        return print_json(&inspection);
    }

    println!("\n🔍 Namespace {namespace}");
    println!("{:-<60}", "");
    println!(
        "Pod: {}",
        inspection.owner_pod.as_deref().unwrap_or("-")
    );

    println!("\n🌐 Interfaces");
    println!("{:-<60}", "");
    interfaces::print_table(&inspection.interfaces);

    println!("\n⚙️  Processes");
    println!("{:-<60}", "");
    processes::print_table(&inspection.processes);

    Ok(())
}
