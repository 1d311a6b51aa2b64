use crate::engine::error::EngineError;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// The seam between the job driver and the external engine.
///
/// Implementations execute one stage: consume the named input deck inside
/// `workdir` and leave the engine's output in the named log file. The call
/// blocks until the engine exits; no timeout is imposed at this layer.
pub trait GaussianRunner {
    fn run(&self, workdir: &Path, input_file: &str, log_file: &str) -> Result<(), EngineError>;
}

/// Runs the engine as a blocking subprocess with the input deck on stdin
/// and the log file as stdout, the way the campaign's queue scripts invoke
/// it.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    command: String,
}

impl SubprocessRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl GaussianRunner for SubprocessRunner {
    fn run(&self, workdir: &Path, input_file: &str, log_file: &str) -> Result<(), EngineError> {
        let stdin = File::open(workdir.join(input_file))?;
        let stdout = File::create(workdir.join(log_file))?;

        debug!(command = %self.command, input = input_file, "invoking engine");
        let status = Command::new(&self.command)
            .current_dir(workdir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::null())
            .status()
            .map_err(|source| EngineError::EngineLaunch {
                command: self.command.clone(),
                source,
            })?;

        // success and failure are encoded in the log text, not the exit
        // code, so the status is recorded and otherwise ignored
        debug!(code = ?status.code(), log = log_file, "engine process exited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn stdin_and_stdout_are_wired_to_the_stage_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stage.com"), "deck contents\n").unwrap();

        // `cat` stands in for the engine: copies the deck to the log
        let runner = SubprocessRunner::new("cat");
        runner.run(dir.path(), "stage.com", "stage.log").unwrap();

        let log = std::fs::read_to_string(dir.path().join("stage.log")).unwrap();
        assert_eq!(log, "deck contents\n");
    }

    #[test]
    fn nonzero_exit_codes_are_not_errors() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stage.com"), "").unwrap();

        let runner = SubprocessRunner::new("false");
        assert!(runner.run(dir.path(), "stage.com", "stage.log").is_ok());
    }

    #[test]
    fn missing_engine_command_is_a_launch_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("stage.com"), "").unwrap();

        let runner = SubprocessRunner::new("definitely-not-a-real-engine-binary");
        let err = runner.run(dir.path(), "stage.com", "stage.log").unwrap_err();
        assert!(matches!(err, EngineError::EngineLaunch { .. }));
    }
}
