use crate::core::io::com::GaussianInput;
use serde::{Deserialize, Serialize};

/// Substitution-pattern metadata for one screened structure.
///
/// `title` is the canonical identifier of the structure: it names the
/// working directory and keys both archives, so it must stay unique across
/// the campaign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureTags {
    pub title: String,
    pub nx: Option<u8>,
    pub ny: Option<u8>,
    pub x_sub: Option<String>,
    pub y_sub: Option<String>,
    pub z_sub: Option<String>,
}

impl StructureTags {
    /// Builds the tag set and its canonical title. Absent substitutions
    /// leave their title segment empty, e.g. `ciba_nx-1_ny-2_x-nitro_y-_z-`.
    pub fn new(
        prefix: &str,
        nx: Option<u8>,
        ny: Option<u8>,
        x_sub: Option<String>,
        y_sub: Option<String>,
        z_sub: Option<String>,
    ) -> Self {
        let seg = |o: &Option<String>| o.clone().unwrap_or_default();
        let num = |o: &Option<u8>| o.map(|v| v.to_string()).unwrap_or_default();
        let title = format!(
            "{}_nx-{}_ny-{}_x-{}_y-{}_z-{}",
            prefix,
            num(&nx),
            num(&ny),
            seg(&x_sub),
            seg(&y_sub),
            seg(&z_sub)
        );
        Self {
            title,
            nx,
            ny,
            x_sub,
            y_sub,
            z_sub,
        }
    }
}

/// One entry of the structure store: a unique index, the engine input deck
/// for the relaxation stage, and the substitution tags. Immutable once
/// generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    pub index: u32,
    pub input: GaussianInput,
    pub tags: StructureTags,
}

/// One entry of the result store: the structure tags joined with every
/// scalar the extractor derives from a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(flatten)]
    pub tags: StructureTags,

    /// First singlet/triplet excitation energies (eV), primary method.
    pub td_singlet: f64,
    pub td_triplet: f64,
    /// First singlet/triplet excitation energies (eV), Tamm-Dancoff.
    pub tda_singlet: f64,
    pub tda_triplet: f64,

    /// Ring-current indices: mean absolute isotropic shielding of the
    /// probe pair above/below each ring family, ground state.
    pub nicss_six_ring_above: f64,
    pub nicss_six_ring_below: f64,
    pub nicss_five_ring_above: f64,
    pub nicss_five_ring_below: f64,
    /// The same indices for the triplet state.
    pub nicst_six_ring_above: f64,
    pub nicst_six_ring_below: f64,
    pub nicst_five_ring_above: f64,
    pub nicst_five_ring_below: f64,
}
