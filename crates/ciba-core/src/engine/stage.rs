use crate::core::io::com::GaussianInput;
use crate::core::io::log::NMR_TERMINATION_RELIABLE;
use crate::core::models::molecule::Molecule;
use crate::engine::config::ScreenConfig;
use std::collections::BTreeMap;

/// The fixed calculation pipeline of one job, in dependency order.
///
/// Relaxation must complete before anything else; the excited-state stages
/// are independent of each other; both shielding stages consume the relaxed
/// geometry with ring probes added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Relax,
    Td,
    Tda,
    NicsSinglet,
    NicsTriplet,
}

impl Stage {
    pub const PIPELINE: [Stage; 5] = [
        Stage::Relax,
        Stage::Td,
        Stage::Tda,
        Stage::NicsSinglet,
        Stage::NicsTriplet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Relax => "relax",
            Stage::Td => "td",
            Stage::Tda => "tda",
            Stage::NicsSinglet => "nics_singlet",
            Stage::NicsTriplet => "nics_triplet",
        }
    }

    pub fn input_file(self) -> String {
        format!("{}.com", self.name())
    }

    pub fn log_file(self) -> String {
        format!("{}.log", self.name())
    }

    /// Whether a pre-existing normally-terminated log lets the driver skip
    /// this stage on re-entry. Shielding logs cannot be classified reliably
    /// at job time, so those stages always execute.
    pub fn resume_checked(self) -> bool {
        match self {
            Stage::NicsSinglet | Stage::NicsTriplet => NMR_TERMINATION_RELIABLE,
            _ => true,
        }
    }

    pub fn spin_multiplicity(self) -> u8 {
        match self {
            Stage::NicsTriplet => 3,
            _ => 1,
        }
    }

    fn route(self, config: &ScreenConfig) -> BTreeMap<String, String> {
        let accuracy = integral_keyword(config.integral_accuracy);
        let mut route = BTreeMap::from([("integral".to_string(), accuracy)]);
        match self {
            Stage::Relax => {
                route.insert("opt".to_string(), String::new());
            }
            Stage::Td => {
                route.insert("td".to_string(), "(50-50)".to_string());
                route.insert("guess".to_string(), "read".to_string());
            }
            Stage::Tda => {
                route.insert("tda".to_string(), "(50-50)".to_string());
                route.insert("guess".to_string(), "read".to_string());
            }
            Stage::NicsSinglet | Stage::NicsTriplet => {
                route.insert("nmr".to_string(), String::new());
                route.insert("guess".to_string(), "read".to_string());
            }
        }
        route
    }

    fn link0(self, config: &ScreenConfig) -> BTreeMap<String, String> {
        // relaxation writes the checkpoint; every later stage reads it
        let checkpoint_key = match self {
            Stage::Relax => "chk",
            _ => "oldchk",
        };
        BTreeMap::from([
            (checkpoint_key.to_string(), config.checkpoint_file.clone()),
            ("mem".to_string(), config.memory.clone()),
            (
                "nprocshared".to_string(),
                config.shared_processors.to_string(),
            ),
        ])
    }
}

/// The `integral` route keyword for a given two-electron accuracy.
pub fn integral_keyword(accuracy: u8) -> String {
    format!("(acc2e={})", accuracy)
}

/// Builds the input deck for one stage over the given geometry.
pub fn build_input(
    config: &ScreenConfig,
    stage: Stage,
    title: &str,
    molecule: Molecule,
) -> GaussianInput {
    GaussianInput {
        link0: stage.link0(config),
        dieze_tag: config.dieze_tag.clone(),
        functional: config.functional.clone(),
        basis_set: config.basis_set.clone(),
        route: stage.route(config),
        title: title.to_string(),
        charge: 0,
        spin_multiplicity: stage.spin_multiplicity(),
        molecule,
    }
}
