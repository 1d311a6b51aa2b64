use crate::core::io::com::GaussianInput;
use crate::core::io::log::GaussianLog;
use crate::core::models::molecule::Molecule;
use crate::core::models::record::StructureRecord;
use crate::core::utils::geometry;
use crate::engine::archive::Outcome;
use crate::engine::config::ScreenConfig;
use crate::engine::error::EngineError;
use crate::engine::runner::GaussianRunner;
use crate::engine::stage::{self, Stage};
use nalgebra::Point3;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info};

/// What re-entering the relaxation stage found, and therefore what this
/// attempt must do. The four variants are mutually exclusive and cover
/// every state a prior attempt can leave behind.
#[derive(Debug)]
enum RelaxPlan {
    /// Prior log terminated normally: reuse its final geometry, run nothing.
    Done(Molecule),
    /// Prior log is readable but terminated abnormally: re-run from its
    /// last geometry with tightened accuracy.
    Retry(GaussianInput),
    /// Prior log exists but is malformed (wrong configuration): rebuild the
    /// deck, patch the accuracy and restart from the original geometry.
    Rebuild(GaussianInput),
    /// No prior log: run the stored input as-is.
    Fresh,
}

/// Drives one structure through the calculation pipeline.
///
/// The driver owns no persistent state: which stages are done is inferred
/// from the log files present in the working directory, which makes a
/// repeated invocation on the same directory resume instead of redo.
pub struct JobDriver<'a, R: GaussianRunner> {
    config: &'a ScreenConfig,
    runner: &'a R,
    workdir: PathBuf,
}

impl<'a, R: GaussianRunner> JobDriver<'a, R> {
    pub fn new(config: &'a ScreenConfig, runner: &'a R, workdir: PathBuf) -> Self {
        Self {
            config,
            runner,
            workdir,
        }
    }

    /// Runs the pipeline to a terminal outcome.
    ///
    /// The transient checkpoint file is removed on every exit path: it is
    /// a large engine-internal artifact and must never end up in an
    /// archive.
    pub fn run(&self, record: &StructureRecord) -> Result<Outcome, EngineError> {
        let outcome = self.execute(record);
        let cleanup = self.remove_checkpoint();
        match outcome {
            Err(e) => Err(e),
            Ok(outcome) => cleanup.map(|_| outcome),
        }
    }

    fn execute(&self, record: &StructureRecord) -> Result<Outcome, EngineError> {
        let title = &record.tags.title;
        info!(title = %title, "started processing");

        let relaxed = match self.run_relax(record)? {
            Some(geometry) => geometry,
            None => {
                error!("{} relaxation did not terminate correctly", title);
                return Ok(Outcome::Failure);
            }
        };

        for stage in [Stage::Td, Stage::Tda] {
            if !self.run_excited_state(title, &relaxed, stage)? {
                error!(
                    "{} {} calculation did not terminate correctly",
                    title,
                    stage.name()
                );
                return Ok(Outcome::Failure);
            }
        }

        let probed = self.with_ring_probes(&relaxed)?;
        for stage in [Stage::NicsSinglet, Stage::NicsTriplet] {
            self.run_unchecked(title, &probed, stage)?;
        }

        info!(title = %title, "finished processing");
        Ok(Outcome::Success)
    }

    /// Executes the relaxation stage under the four-branch recovery policy
    /// and returns the relaxed geometry, or `None` when this attempt's run
    /// did not terminate normally.
    fn run_relax(&self, record: &StructureRecord) -> Result<Option<Molecule>, EngineError> {
        let title = &record.tags.title;
        let input = match self.plan_relax(record)? {
            RelaxPlan::Done(geometry) => {
                debug!(title = %title, "relaxation already terminated normally, skipping");
                return Ok(Some(geometry));
            }
            RelaxPlan::Retry(input) => {
                info!(title = %title, "re-running relaxation from prior geometry with tightened accuracy");
                input
            }
            RelaxPlan::Rebuild(input) => {
                info!(title = %title, "prior relaxation log unusable, rebuilding input and restarting");
                input
            }
            RelaxPlan::Fresh => record.input.clone(),
        };

        let log = self.run_stage(Stage::Relax, &input)?;
        if !log.terminated_normally() {
            return Ok(None);
        }
        match log.final_geometry() {
            Some(geometry) => Ok(Some(geometry.clone())),
            None => Err(EngineError::MissingRelaxedGeometry {
                title: title.clone(),
            }),
        }
    }

    fn plan_relax(&self, record: &StructureRecord) -> Result<RelaxPlan, EngineError> {
        let log_path = self.stage_log_path(Stage::Relax);
        if !log_path.exists() {
            return Ok(RelaxPlan::Fresh);
        }

        let log = self.parse_log(Stage::Relax)?;
        if log.route_is_readable() {
            if log.terminated_normally() {
                if let Some(geometry) = log.final_geometry() {
                    return Ok(RelaxPlan::Done(geometry.clone()));
                }
            } else if let Some(geometry) = log.final_geometry() {
                let mut input = record.input.clone();
                input.molecule = geometry.clone();
                input.set_route_param(
                    "integral",
                    stage::integral_keyword(self.config.retry_integral_accuracy),
                );
                return Ok(RelaxPlan::Retry(input));
            }
        }

        // malformed log: salvage what the log attests, keep the original
        // starting geometry, and tighten the accuracy
        let mut input = log
            .recover_input(&record.tags.title)
            .unwrap_or_else(|_| record.input.clone());
        input.molecule = record.input.molecule.clone();
        input.set_route_param(
            "integral",
            stage::integral_keyword(self.config.retry_integral_accuracy),
        );
        Ok(RelaxPlan::Rebuild(input))
    }

    /// Runs one excited-state stage unless a prior normally-terminated log
    /// makes it skippable. Returns whether the stage's log terminated
    /// normally.
    fn run_excited_state(
        &self,
        title: &str,
        relaxed: &Molecule,
        stage: Stage,
    ) -> Result<bool, EngineError> {
        debug_assert!(stage.resume_checked());
        if self.stage_log_path(stage).exists() {
            if let Ok(log) = GaussianLog::read_from_path(self.stage_log_path(stage)) {
                if log.terminated_normally() {
                    debug!(title = %title, stage = stage.name(), "already terminated normally, skipping");
                    return Ok(true);
                }
            }
        }

        let input = stage::build_input(self.config, stage, title, relaxed.clone());
        let log = self.run_stage(stage, &input)?;
        Ok(log.terminated_normally())
    }

    /// Runs a shielding stage with no completion check: the log cannot be
    /// classified reliably, so correctness checking is deferred to the
    /// data extractor.
    fn run_unchecked(
        &self,
        title: &str,
        probed: &Molecule,
        stage: Stage,
    ) -> Result<(), EngineError> {
        debug_assert!(!stage.resume_checked());
        let input = stage::build_input(self.config, stage, title, probed.clone());
        self.write_deck(stage, &input)?;
        self.runner
            .run(&self.workdir, &stage.input_file(), &stage.log_file())?;
        debug!(title = %title, stage = stage.name(), "completed without termination check");
        Ok(())
    }

    /// Adds the shielding probe pair for every configured ring to a copy
    /// of the relaxed geometry.
    fn with_ring_probes(&self, relaxed: &Molecule) -> Result<Molecule, EngineError> {
        let mut probed = relaxed.clone();
        for ring in &self.config.rings {
            let points = ring
                .iter()
                .map(|&i| relaxed.site(i).map(|s| s.position))
                .collect::<Option<Vec<Point3<f64>>>>()
                .ok_or_else(|| EngineError::ProbePlacement {
                    ring: ring.clone(),
                    reason: "ring site index out of range",
                })?;
            let (above, below) =
                geometry::ring_probe_points(&points).ok_or_else(|| EngineError::ProbePlacement {
                    ring: ring.clone(),
                    reason: "degenerate ring geometry",
                })?;
            probed.push_ghost(above);
            probed.push_ghost(below);
        }
        Ok(probed)
    }

    fn run_stage(&self, stage: Stage, input: &GaussianInput) -> Result<GaussianLog, EngineError> {
        self.write_deck(stage, input)?;
        self.runner
            .run(&self.workdir, &stage.input_file(), &stage.log_file())?;
        self.parse_log(stage)
    }

    fn write_deck(&self, stage: Stage, input: &GaussianInput) -> Result<(), EngineError> {
        let path = self.workdir.join(stage.input_file());
        input
            .write_to_path(&path)
            .map_err(|source| EngineError::Deck { path, source })
    }

    fn parse_log(&self, stage: Stage) -> Result<GaussianLog, EngineError> {
        let path = self.stage_log_path(stage);
        GaussianLog::read_from_path(&path).map_err(|source| EngineError::Log { path, source })
    }

    fn stage_log_path(&self, stage: Stage) -> PathBuf {
        self.workdir.join(stage.log_file())
    }

    fn remove_checkpoint(&self) -> Result<(), EngineError> {
        let path = self.workdir.join(&self.config.checkpoint_file);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    "removed transient checkpoint (intentionally deleted, not archived)"
                );
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
