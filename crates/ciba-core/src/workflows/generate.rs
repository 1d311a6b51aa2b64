use crate::core::io::com::GaussianInput;
use crate::core::models::molecule::Molecule;
use crate::core::models::record::{StructureRecord, StructureTags};
use crate::core::models::substituents::{self, Substituent};
use crate::engine::config::ScreenConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stage::{self, Stage};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};

/// An aza-substitution position: the paired ring sites that become
/// nitrogen, and the hydrogen sites those nitrogens displace.
#[derive(Debug, Clone, Copy)]
struct AzaSite {
    position: u8,
    nitrogen_sites: [usize; 2],
    hydrogen_sites: [usize; 2],
}

const fn aza(position: u8, nitrogen_sites: [usize; 2], hydrogen_sites: [usize; 2]) -> AzaSite {
    AzaSite {
        position,
        nitrogen_sites,
        hydrogen_sites,
    }
}

/// One scaffold family: a template plus the site tables addressing it.
///
/// All site indices are zero-based positions into the template molecule.
/// Substituent sites come in symmetry-equivalent pairs, as do the aza
/// nitrogen and hydrogen sites.
struct Family {
    prefix: &'static str,
    /// Substituent hydrogen-site pairs for the x, y and z axes.
    sub_sites: [[usize; 2]; 3],
    nx_sites: &'static [AzaSite],
    /// Empty for scaffolds without the second aza axis.
    ny_sites: &'static [AzaSite],
}

const PYRIDINE_FAMILY: Family = Family {
    prefix: "ciba",
    sub_sites: [[48, 49], [50, 51], [52, 53]],
    nx_sites: &[
        aza(1, [21, 28], [43, 44]),
        aza(2, [22, 27], [52, 53]),
        aza(3, [23, 26], [50, 51]),
        aza(4, [24, 25], [45, 42]),
    ],
    ny_sites: &[
        aza(1, [19, 30], [36, 40]),
        aza(2, [18, 32], [41, 37]),
        aza(3, [17, 33], [48, 49]),
        aza(4, [16, 34], [46, 47]),
        aza(5, [15, 35], [38, 39]),
    ],
};

const THIOPHENE_FAMILY: Family = Family {
    prefix: "ciba_thiol",
    sub_sites: [[47, 49], [30, 31], [32, 33]],
    nx_sites: &[
        aza(1, [16, 23], [27, 28]),
        aza(2, [17, 22], [32, 33]),
        aza(3, [18, 21], [30, 31]),
        aza(4, [19, 20], [26, 29]),
    ],
    ny_sites: &[],
};

/// Enumerates every screened structure over both scaffold templates and
/// returns the records in index order, starting at index 1.
#[instrument(skip_all, name = "generate_workflow")]
pub fn run(
    config: &ScreenConfig,
    pyridine_template: &Path,
    thiophene_template: &Path,
    reporter: &ProgressReporter,
) -> Result<Vec<StructureRecord>, EngineError> {
    let mut records = Vec::new();

    for (family, template_path) in [
        (&PYRIDINE_FAMILY, pyridine_template),
        (&THIOPHENE_FAMILY, thiophene_template),
    ] {
        reporter.report(Progress::PhaseStart {
            name: family.prefix,
        });
        let template = GaussianInput::read_from_path(template_path).map_err(|source| {
            EngineError::Deck {
                path: template_path.to_path_buf(),
                source,
            }
        })?;

        let before = records.len();
        enumerate_family(config, family, &template.molecule, &mut records)?;
        info!(
            family = family.prefix,
            structures = records.len() - before,
            "generated substituted structures"
        );
        reporter.report(Progress::PhaseFinish);
    }

    Ok(records)
}

fn enumerate_family(
    config: &ScreenConfig,
    family: &Family,
    template: &Molecule,
    records: &mut Vec<StructureRecord>,
) -> Result<(), EngineError> {
    let substituent_options: Vec<Option<Substituent>> = Substituent::ALL
        .into_iter()
        .map(Some)
        .chain(std::iter::once(None))
        .collect();
    let nx_options = aza_options(family.nx_sites);
    let ny_options = aza_options(family.ny_sites);

    for &nx in &nx_options {
        for &ny in &ny_options {
            for &x_sub in &substituent_options {
                for &y_sub in &substituent_options {
                    for &z_sub in &substituent_options {
                        if x_sub.is_none() && y_sub.is_none() && z_sub.is_none() {
                            continue;
                        }
                        let Some(molecule) =
                            build_structure(family, template, nx, ny, [x_sub, y_sub, z_sub])?
                        else {
                            continue;
                        };

                        let tags = StructureTags::new(
                            family.prefix,
                            nx.map(|a| a.position),
                            ny.map(|a| a.position),
                            x_sub.map(|s| s.name().to_string()),
                            y_sub.map(|s| s.name().to_string()),
                            z_sub.map(|s| s.name().to_string()),
                        );
                        let index = records.len() as u32 + 1;
                        let input =
                            stage::build_input(config, Stage::Relax, &tags.title, molecule);
                        records.push(StructureRecord { index, input, tags });
                    }
                }
            }
        }
    }
    Ok(())
}

fn aza_options(sites: &[AzaSite]) -> Vec<Option<&AzaSite>> {
    sites
        .iter()
        .map(Some)
        .chain(std::iter::once(None))
        .collect()
}

/// Applies one substitution pattern to a copy of the template.
///
/// Returns `None` when the pattern is self-clashing: a substituent axis
/// whose hydrogen sites are already displaced by a chosen aza position
/// cannot be realized on this scaffold.
///
/// Sites are processed from the highest index downwards so that removals
/// never invalidate the indices of operations still to come.
fn build_structure(
    family: &Family,
    template: &Molecule,
    nx: Option<&AzaSite>,
    ny: Option<&AzaSite>,
    subs: [Option<Substituent>; 3],
) -> Result<Option<Molecule>, EngineError> {
    let mut molecule = template.clone();

    let mut displaced: HashSet<usize> = HashSet::new();
    let mut removals: Vec<usize> = Vec::new();
    for aza in [nx, ny].into_iter().flatten() {
        for &site in &aza.nitrogen_sites {
            molecule.relabel(site, "N");
        }
        displaced.extend(aza.hydrogen_sites);
        removals.extend(aza.hydrogen_sites);
    }

    let mut attachments: Vec<(usize, Substituent)> = Vec::new();
    for (pair, sub) in family.sub_sites.iter().zip(subs) {
        if let Some(group) = sub {
            if pair.iter().any(|site| displaced.contains(site)) {
                return Ok(None);
            }
            attachments.extend(pair.iter().map(|&site| (site, group)));
        }
    }

    let mut operations: Vec<(usize, Option<Substituent>)> = removals
        .into_iter()
        .map(|site| (site, None))
        .chain(attachments.into_iter().map(|(site, group)| (site, Some(group))))
        .collect();
    operations.sort_by(|a, b| b.0.cmp(&a.0));

    for (site, op) in operations {
        match op {
            Some(group) => substituents::substitute(&mut molecule, site, group)
                .map_err(|source| EngineError::Substitution { site, source })?,
            None => {
                molecule.remove(site);
            }
        }
    }
    Ok(Some(molecule))
}
