use crate::config::FileConfig;
use crate::error::{CliError, Result};
use cibascreen::engine::runner::SubprocessRunner;
use cibascreen::store::StructureStore;
use cibascreen::workflows::screen::{self, ScreenOutcome};
use tracing::{debug, info};

pub fn run(index: u32, file_config: &FileConfig) -> Result<()> {
    let config = file_config.to_screen_config()?;

    let store = StructureStore::open(&file_config.paths.structure_store)?;
    let record = store.get(index).ok_or_else(|| {
        CliError::Argument(format!(
            "no structure with index {} in '{}'",
            index,
            file_config.paths.structure_store.display()
        ))
    })?;

    info!(
        "Screening structure {} ('{}')...",
        index, record.tags.title
    );
    let runner = SubprocessRunner::new(config.engine_command.clone());

    match screen::run(record, &config, &runner)? {
        // already-done is a silent no-op so finished indices can be
        // re-submitted freely
        ScreenOutcome::AlreadyDone => {
            debug!("{} already archived as success, exiting", record.tags.title);
        }
        ScreenOutcome::Success => {
            println!("✓ {} archived as success", record.tags.title);
        }
        ScreenOutcome::Failure => {
            println!("✗ {} archived as error", record.tags.title);
        }
    }
    Ok(())
}
