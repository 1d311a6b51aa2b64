use crate::config::FileConfig;
use crate::error::Result;
use crate::progress::CliProgressHandler;
use cibascreen::engine::progress::ProgressReporter;
use cibascreen::store::{ResultStore, StructureStore};
use cibascreen::workflows;
use std::fs;
use tracing::info;

pub fn run(file_config: &FileConfig) -> Result<()> {
    let config = file_config.to_screen_config()?;
    let store = StructureStore::open(&file_config.paths.structure_store)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Extracting data from {} screened structures...", store.len());
    let extracted = workflows::extract::run(store.all(), &config, &reporter)?;

    let result_path = &file_config.paths.result_store;
    if let Some(parent) = result_path.parent() {
        fs::create_dir_all(parent)?;
    }
    ResultStore::write(result_path, &extracted)?;

    println!(
        "✓ extracted {} of {} structures to {}",
        extracted.len(),
        store.len(),
        result_path.display()
    );
    Ok(())
}
