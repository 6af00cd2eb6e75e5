use crate::cli::Commands;
use anyhow::Result;
use serde::Serialize;
use volans_engine::Engine;

pub mod health;
pub mod inspect;
pub mod interfaces;
pub mod namespaces;
pub mod processes;

/// Dispatch command to appropriate handler
pub async fn dispatch(engine: &Engine, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Namespaces => namespaces::execute(engine, json).await,
        Commands::Interfaces { namespace } => interfaces::execute(engine, namespace, json).await,
        Commands::Processes { namespace } => processes::execute(engine, namespace, json).await,
        Commands::Inspect { namespace } => inspect::execute(engine, namespace, json).await,
        Commands::Health => health::execute(engine, json).await,
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a boolean feature switch
pub const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}
