use extern_sync::{default_pipeline, SyncConfig, SyncContext, SyncTaskManager};
use log::{info, warn};
use registry_persistence::DieselRegistryStore;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Corrida única de sincronización hacia el registro externo.
///
/// Lee `SyncConfig` del entorno (`.env` incluido), abre el store de origen
/// en sólo lectura y el de destino aplicando migraciones, y ejecuta el pipeline
/// por defecto. Ctrl-C cancela en la siguiente frontera de tarea.
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("sync-core: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = SyncConfig::from_env()?;
    let source = DieselRegistryStore::open_read_only(&config.source_database_url, config.pool_size)?;
    let target = DieselRegistryStore::with_options(&config.target_database_url, config.pool_size, true)?;
    let ctx = Arc::new(SyncContext::from_config(Arc::new(source), Arc::new(target), &config));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C recibido, cancelando la sincronización");
            on_signal.cancel();
        }
    });

    let manager = SyncTaskManager::new();
    manager.execute_tasks(&default_pipeline(ctx), &cancel).await?;

    let summary = json!({
        "run_id": manager.run_id().map(|id| id.to_string()),
        "tasks": manager.reports(),
    });
    info!("sincronización completada: {}", summary);
    println!("{}", summary);
    Ok(())
}
