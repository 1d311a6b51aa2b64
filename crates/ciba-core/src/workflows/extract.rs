use crate::core::io::log::{GaussianLog, ShieldingTensor};
use crate::core::models::record::{PropertyRecord, StructureRecord};
use crate::engine::archive::ArchiveManager;
use crate::engine::config::ScreenConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Mean absolute isotropic shieldings of the probe pairs, grouped by ring
/// family and side of the molecular plane.
struct RingCurrentIndices {
    six_above: f64,
    six_below: f64,
    five_above: f64,
    five_below: f64,
}

/// Sweeps the success archives of the given records and assembles the
/// extracted dataset.
///
/// The sweep survives anything a single job can throw at it: a structure
/// with no success archive, an unreadable archive, missing excitations or
/// an unverifiable shielding run is skipped with a diagnostic, never a
/// failure. The returned records are those that passed every check.
#[instrument(skip_all, name = "extract_workflow")]
pub fn run(
    records: &[StructureRecord],
    config: &ScreenConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<PropertyRecord>, EngineError> {
    let archives = ArchiveManager::new(&config.calculations_dir);
    reporter.report(Progress::TaskStart {
        total_steps: records.len() as u64,
    });

    let mut extracted = Vec::new();
    for record in records {
        let title = &record.tags.title;
        if archives.success_archive(title).exists() {
            match extract_one(&archives, record) {
                Ok(Some(properties)) => extracted.push(properties),
                Ok(None) => warn!("{} did not finish correctly, skipping", title),
                Err(e) => warn!("{} could not be read, skipping: {}", title, e),
            }
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    info!(
        extracted = extracted.len(),
        screened = records.len(),
        "extraction sweep complete"
    );
    Ok(extracted)
}

/// Extracts one structure from its success archive, unpacked into a fresh
/// scratch directory so the shared archive area is never written to.
///
/// Returns `Ok(None)` when the archived logs fail verification: the
/// shielding stages run without a completion check at job time, so this is
/// where an incomplete shielding run is finally caught.
fn extract_one(
    archives: &ArchiveManager,
    record: &StructureRecord,
) -> Result<Option<PropertyRecord>, EngineError> {
    let title = &record.tags.title;
    let scratch = tempfile::tempdir()?;
    archives.unpack_success_into(title, scratch.path())?;
    let job_dir = scratch.path().join(title);

    let td = read_log(&job_dir, "td.log")?;
    let tda = read_log(&job_dir, "tda.log")?;
    let (Some((td_singlet, td_triplet)), Some((tda_singlet, tda_triplet))) =
        (first_singlet_and_triplet(&td), first_singlet_and_triplet(&tda))
    else {
        return Ok(None);
    };

    let Some(nicss) = verified_ring_currents(&read_log(&job_dir, "nics_singlet.log")?) else {
        return Ok(None);
    };
    let Some(nicst) = verified_ring_currents(&read_log(&job_dir, "nics_triplet.log")?) else {
        return Ok(None);
    };

    Ok(Some(PropertyRecord {
        tags: record.tags.clone(),
        td_singlet,
        td_triplet,
        tda_singlet,
        tda_triplet,
        nicss_six_ring_above: nicss.six_above,
        nicss_six_ring_below: nicss.six_below,
        nicss_five_ring_above: nicss.five_above,
        nicss_five_ring_below: nicss.five_below,
        nicst_six_ring_above: nicst.six_above,
        nicst_six_ring_below: nicst.six_below,
        nicst_five_ring_above: nicst.five_above,
        nicst_five_ring_below: nicst.five_below,
    }))
}

fn read_log(job_dir: &Path, name: &str) -> Result<GaussianLog, EngineError> {
    let path = job_dir.join(name);
    GaussianLog::read_from_path(&path).map_err(|source| EngineError::Log { path, source })
}

/// First singlet and first triplet excitation energies, in eV.
fn first_singlet_and_triplet(log: &GaussianLog) -> Option<(f64, f64)> {
    let states = log.excitation_energies();
    let singlet = states.iter().find(|e| e.is_singlet())?.energy_ev;
    let triplet = states.iter().find(|e| e.is_triplet())?.energy_ev;
    Some((singlet, triplet))
}

/// Independently verifies a shielding log and derives its ring-current
/// indices.
///
/// Verification requires the normal-termination banner and the full probe
/// block: the trailing eight centers must all be ghost probes, in the
/// placement order of the ring tables (above/below per ring, six-membered
/// rings first). Anything less makes the structure unverifiable.
fn verified_ring_currents(log: &GaussianLog) -> Option<RingCurrentIndices> {
    if !log.terminated_normally() {
        return None;
    }
    let shieldings = log.magnetic_shielding();
    if shieldings.len() < 8 {
        return None;
    }
    let probes: &[ShieldingTensor] = &shieldings[shieldings.len() - 8..];
    if probes.iter().any(|t| t.label != "Bq") {
        return None;
    }

    let iso = |i: usize| probes[i].isotropic.abs();
    Some(RingCurrentIndices {
        six_above: (iso(0) + iso(2)) / 2.0,
        six_below: (iso(1) + iso(3)) / 2.0,
        five_above: (iso(4) + iso(6)) / 2.0,
        five_below: (iso(5) + iso(7)) / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::{Molecule, Site};
    use crate::core::models::record::StructureTags;
    use crate::engine::archive::Outcome;
    use crate::engine::config::{ScreenConfig, ScreenConfigBuilder};
    use crate::engine::stage::{self, Stage};
    use nalgebra::Point3;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const NORMAL_END: &str = " Normal termination of Gaussian 09 at Thu Mar  1 04:10:22 2018.\n";

    fn excited_log(singlet_ev: f64, triplet_ev: f64) -> String {
        format!(
            " Excited State   1:      Triplet-A      {:.4} eV  589.21 nm  f=0.0000\n \
             Excited State   2:      Singlet-A      {:.4} eV  373.29 nm  f=0.1234\n{}",
            triplet_ev, singlet_ev, NORMAL_END
        )
    }

    fn shielding_log(terminated: bool, probe_isotropics: &[f64]) -> String {
        let mut text = String::from(
            "      1  C    Isotropic =    57.1234   Anisotropy =    12.3456\n\
                   2  C    Isotropic =    61.0000   Anisotropy =     9.0000\n",
        );
        for (i, iso) in probe_isotropics.iter().enumerate() {
            text.push_str(&format!(
                "     {:2}  Bq   Isotropic =  {:9.4}   Anisotropy =    4.0000\n",
                i + 3,
                iso
            ));
        }
        if terminated {
            text.push_str(NORMAL_END);
        }
        text
    }

    fn test_record(title_suffix: &str) -> StructureRecord {
        let tags = StructureTags::new("ciba", Some(1), None, Some(title_suffix.into()), None, None);
        let config = ScreenConfigBuilder::new()
            .calculations_dir("unused".into())
            .build()
            .unwrap();
        StructureRecord {
            index: 1,
            input: stage::build_input(
                &config,
                Stage::Relax,
                &tags.title,
                Molecule::new(vec![Site::new("C", Point3::new(0.0, 0.0, 0.0))]),
            ),
            tags,
        }
    }

    fn test_config(tmp: &TempDir) -> ScreenConfig {
        ScreenConfigBuilder::new()
            .calculations_dir(tmp.path().join("calculations"))
            .build()
            .unwrap()
    }

    /// Eight probes whose absolute isotropics are 10..80 in placement
    /// order.
    fn standard_probes() -> Vec<f64> {
        vec![-10.0, -20.0, -30.0, -40.0, -50.0, -60.0, -70.0, -80.0]
    }

    fn archive_success(
        config: &ScreenConfig,
        record: &StructureRecord,
        nics_singlet: &str,
        nics_triplet: &str,
    ) {
        let archives = ArchiveManager::new(&config.calculations_dir);
        let title = &record.tags.title;
        archives.prepare(title).unwrap();
        let work = archives.workdir(title);
        fs::write(work.join("relax.log"), NORMAL_END).unwrap();
        fs::write(work.join("td.log"), excited_log(3.3211, 2.1043)).unwrap();
        fs::write(work.join("tda.log"), excited_log(3.5, 2.3)).unwrap();
        fs::write(work.join("nics_singlet.log"), nics_singlet).unwrap();
        fs::write(work.join("nics_triplet.log"), nics_triplet).unwrap();
        archives.finalize(title, Outcome::Success, false).unwrap();
    }

    #[test]
    fn complete_archives_yield_property_records() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record("nitro");
        let nics = shielding_log(true, &standard_probes());
        archive_success(&config, &record, &nics, &nics);

        let extracted = run(
            std::slice::from_ref(&record),
            &config,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(extracted.len(), 1);

        let row = &extracted[0];
        assert_eq!(row.tags.title, record.tags.title);
        assert!((row.td_singlet - 3.3211).abs() < 1e-10);
        assert!((row.td_triplet - 2.1043).abs() < 1e-10);
        assert!((row.tda_singlet - 3.5).abs() < 1e-10);

        // probe pairs averaged per ring family and side, absolute values
        assert!((row.nicss_six_ring_above - 20.0).abs() < 1e-10);
        assert!((row.nicss_six_ring_below - 30.0).abs() < 1e-10);
        assert!((row.nicss_five_ring_above - 60.0).abs() < 1e-10);
        assert!((row.nicss_five_ring_below - 70.0).abs() < 1e-10);
    }

    #[test]
    fn structures_without_a_success_archive_are_skipped() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        fs::create_dir_all(&config.calculations_dir).unwrap();

        let extracted = run(&[test_record("amine")], &config, &ProgressReporter::new()).unwrap();
        assert!(extracted.is_empty());
    }

    #[test]
    fn unterminated_shielding_runs_are_skipped_not_fatal() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let good = test_record("nitro");
        let bad = test_record("cyano");

        let nics_ok = shielding_log(true, &standard_probes());
        let nics_bad = shielding_log(false, &standard_probes());
        archive_success(&config, &good, &nics_ok, &nics_ok);
        archive_success(&config, &bad, &nics_ok, &nics_bad);

        let records = [good.clone(), bad];
        let extracted = run(&records, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].tags.title, good.tags.title);
    }

    #[test]
    fn incomplete_probe_blocks_are_unverifiable() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record("fluoro");

        let nics_short = shielding_log(true, &standard_probes()[..5]);
        archive_success(&config, &record, &nics_short, &nics_short);

        let extracted = run(&[record], &config, &ProgressReporter::new()).unwrap();
        assert!(extracted.is_empty());
    }

    #[test]
    fn missing_excitations_are_skipped() {
        let tmp = tempdir().unwrap();
        let config = test_config(&tmp);
        let record = test_record("bromo");

        let archives = ArchiveManager::new(&config.calculations_dir);
        let title = &record.tags.title;
        archives.prepare(title).unwrap();
        let work = archives.workdir(title);
        // a td log with no excitation block at all
        fs::write(work.join("td.log"), NORMAL_END).unwrap();
        fs::write(work.join("tda.log"), excited_log(3.5, 2.3)).unwrap();
        let nics = shielding_log(true, &standard_probes());
        fs::write(work.join("nics_singlet.log"), &nics).unwrap();
        fs::write(work.join("nics_triplet.log"), &nics).unwrap();
        archives.finalize(title, Outcome::Success, false).unwrap();

        let extracted = run(&[record], &config, &ProgressReporter::new()).unwrap();
        assert!(extracted.is_empty());
    }
}
