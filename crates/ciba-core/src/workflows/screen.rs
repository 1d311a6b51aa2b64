use crate::core::models::record::StructureRecord;
use crate::engine::archive::{ArchiveManager, Outcome, Prepared};
use crate::engine::config::ScreenConfig;
use crate::engine::driver::JobDriver;
use crate::engine::error::EngineError;
use crate::engine::runner::GaussianRunner;
use tracing::{info, instrument};

/// Terminal states of one screening job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOutcome {
    /// A success archive already existed; nothing was run or written.
    AlreadyDone,
    /// All stages completed; the success archive now exists.
    Success,
    /// A required stage failed; the error archive now exists.
    Failure,
}

/// Runs one structure end-to-end: prepare the working directory from any
/// prior archive state, drive the calculation pipeline, and archive the
/// outcome.
///
/// Safe to run concurrently with other invocations as long as every
/// concurrent job has a distinct title.
#[instrument(skip_all, name = "screen_workflow", fields(title = %record.tags.title))]
pub fn run(
    record: &StructureRecord,
    config: &ScreenConfig,
    runner: &impl GaussianRunner,
) -> Result<ScreenOutcome, EngineError> {
    let title = &record.tags.title;
    let archives = ArchiveManager::new(&config.calculations_dir);

    let was_resumed = match archives.prepare(title)? {
        Prepared::AlreadyDone => {
            info!("success archive already exists, nothing to do");
            return Ok(ScreenOutcome::AlreadyDone);
        }
        Prepared::Resumed => true,
        Prepared::Clean => false,
    };

    let driver = JobDriver::new(config, runner, archives.workdir(title));
    let outcome = driver.run(record)?;
    archives.finalize(title, outcome, was_resumed)?;

    Ok(match outcome {
        Outcome::Success => ScreenOutcome::Success,
        Outcome::Failure => ScreenOutcome::Failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::{Molecule, Site};
    use crate::core::models::record::StructureTags;
    use crate::engine::config::ScreenConfigBuilder;
    use crate::engine::stage::{self, Stage};
    use flate2::read::GzDecoder;
    use nalgebra::Point3;
    use std::cell::RefCell;
    use std::fs::{self, File};
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const NORMAL_END: &str = " Normal termination of Gaussian 09 at Thu Mar  1 04:10:22 2018.\n";

    /// Stands in for the engine: emits a canned log per stage, plus the
    /// checkpoint file a real relaxation leaves behind.
    struct FakeEngine {
        relax_terminates: bool,
        invocations: RefCell<usize>,
    }

    impl FakeEngine {
        fn succeeding() -> Self {
            Self {
                relax_terminates: true,
                invocations: RefCell::new(0),
            }
        }

        fn failing_relax() -> Self {
            Self {
                relax_terminates: false,
                invocations: RefCell::new(0),
            }
        }

        fn invocations(&self) -> usize {
            *self.invocations.borrow()
        }
    }

    impl GaussianRunner for FakeEngine {
        fn run(&self, workdir: &Path, _input: &str, log_file: &str) -> Result<(), EngineError> {
            *self.invocations.borrow_mut() += 1;
            let content = match log_file {
                "relax.log" => relax_log(self.relax_terminates),
                "td.log" | "tda.log" => format!(
                    " Excited State   1:      Singlet-A      3.3 eV  373.0 nm  f=0.1\n{}",
                    NORMAL_END
                ),
                _ => "shielding output\n".to_string(),
            };
            fs::write(workdir.join(log_file), content).unwrap();
            fs::write(workdir.join("chkpt.chk"), "wavefunction blob").unwrap();
            Ok(())
        }
    }

    fn relax_log(terminated: bool) -> String {
        let mut text = String::from(
            " #p b3lyp/6-311++G(d,p) integral=(acc2e=12) opt\n Charge =  0 Multiplicity = 1\n\
                                     Standard orientation:\n\
             ---------------------------------------------------------------------\n\
             Center     Atomic      Atomic             Coordinates (Angstroms)\n\
             Number     Number       Type             X           Y           Z\n\
             ---------------------------------------------------------------------\n\
                  1          6           0        0.000000    0.000000    0.000000\n\
                  2          6           0        1.400000    0.000000    0.000000\n\
                  3          6           0        0.700000    1.212436    0.000000\n\
             ---------------------------------------------------------------------\n",
        );
        if terminated {
            text.push_str(NORMAL_END);
        }
        text
    }

    fn test_record() -> StructureRecord {
        let tags = StructureTags::new(
            "ciba",
            Some(1),
            Some(2),
            Some("nitro".to_string()),
            None,
            None,
        );
        let molecule = Molecule::new(vec![
            Site::new("C", Point3::new(0.0, 0.0, 0.0)),
            Site::new("C", Point3::new(1.4, 0.0, 0.0)),
            Site::new("C", Point3::new(0.7, 1.212436, 0.0)),
        ]);
        let config = ScreenConfigBuilder::new()
            .calculations_dir("unused".into())
            .build()
            .unwrap();
        StructureRecord {
            index: 1,
            input: stage::build_input(&config, Stage::Relax, &tags.title, molecule),
            tags,
        }
    }

    fn test_config(tmp: &TempDir) -> ScreenConfig {
        ScreenConfigBuilder::new()
            .calculations_dir(tmp.path().join("calculations"))
            .rings(vec![vec![0, 1, 2]])
            .build()
            .unwrap()
    }

    fn archive_entries(path: &Path) -> Vec<String> {
        let mut tar = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
        tar.entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn fresh_job_ends_with_exactly_one_success_archive() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record();
        let engine = FakeEngine::succeeding();

        let outcome = run(&record, &config, &engine).unwrap();
        assert_eq!(outcome, ScreenOutcome::Success);

        let archives = ArchiveManager::new(&config.calculations_dir);
        let title = &record.tags.title;
        assert!(archives.success_archive(title).exists());
        assert!(!archives.error_archive(title).exists());
        assert!(!archives.workdir(title).exists());

        // the transient checkpoint never reaches the archive
        let entries = archive_entries(&archives.success_archive(title));
        assert!(entries.iter().any(|e| e.ends_with("relax.log")));
        assert!(entries.iter().any(|e| e.ends_with("nics_triplet.log")));
        assert!(!entries.iter().any(|e| e.ends_with("chkpt.chk")));
    }

    #[test]
    fn second_invocation_is_a_no_op_with_an_identical_archive() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record();

        let engine = FakeEngine::succeeding();
        run(&record, &config, &engine).unwrap();
        let first_run_invocations = engine.invocations();

        let archives = ArchiveManager::new(&config.calculations_dir);
        let archive = archives.success_archive(&record.tags.title);
        let bytes_before = fs::read(&archive).unwrap();

        let outcome = run(&record, &config, &engine).unwrap();
        assert_eq!(outcome, ScreenOutcome::AlreadyDone);
        assert_eq!(engine.invocations(), first_run_invocations);
        assert_eq!(fs::read(&archive).unwrap(), bytes_before);
    }

    #[test]
    fn failed_job_leaves_only_an_error_archive() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record();

        let outcome = run(&record, &config, &FakeEngine::failing_relax()).unwrap();
        assert_eq!(outcome, ScreenOutcome::Failure);

        let archives = ArchiveManager::new(&config.calculations_dir);
        let title = &record.tags.title;
        assert!(archives.error_archive(title).exists());
        assert!(!archives.success_archive(title).exists());
        assert!(!archives.workdir(title).exists());
    }

    #[test]
    fn resumed_job_replaces_the_error_archive_on_success() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record();

        // first attempt: the relaxation never terminates
        run(&record, &config, &FakeEngine::failing_relax()).unwrap();

        // second attempt resumes from the error archive; the abnormal
        // relax log forces a patched retry, which now succeeds
        let engine = FakeEngine::succeeding();
        let outcome = run(&record, &config, &engine).unwrap();
        assert_eq!(outcome, ScreenOutcome::Success);

        let archives = ArchiveManager::new(&config.calculations_dir);
        let title = &record.tags.title;
        assert!(archives.success_archive(title).exists());
        assert!(!archives.error_archive(title).exists());

        // the archived retry deck carries the tightened accuracy setting
        let tmp_unpack = tempdir().unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(
            File::open(archives.success_archive(title)).unwrap(),
        ));
        tar.unpack(tmp_unpack.path()).unwrap();
        let deck =
            fs::read_to_string(tmp_unpack.path().join(title).join("relax.com")).unwrap();
        assert!(deck.contains("integral=(acc2e=14)"));
    }
}
