use crate::config::FileConfig;
use crate::error::Result;
use crate::progress::CliProgressHandler;
use cibascreen::engine::progress::ProgressReporter;
use cibascreen::store::StructureStore;
use cibascreen::workflows;
use std::fs;
use tracing::info;

pub fn run(file_config: &FileConfig) -> Result<()> {
    let config = file_config.to_screen_config()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Enumerating substituted structures...");
    let records = workflows::generate::run(
        &config,
        &file_config.paths.pyridine_template,
        &file_config.paths.thiophene_template,
        &reporter,
    )?;

    let store_path = &file_config.paths.structure_store;
    if let Some(parent) = store_path.parent() {
        fs::create_dir_all(parent)?;
    }
    StructureStore::create(store_path, &records)?;

    println!(
        "✓ {} structures written to {}",
        records.len(),
        store_path.display()
    );
    Ok(())
}
