use super::molecule::{Molecule, Site};
use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SubstitutionError {
    #[error("Site index {0} is out of range")]
    SiteOutOfRange(usize),

    #[error("Site {index} ('{label}') is not a hydrogen and cannot be substituted")]
    NotAHydrogen { index: usize, label: String },

    #[error("Site {0} has no heavy-atom anchor to attach to")]
    NoAnchor(usize),
}

/// The substituent families screened by the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Substituent {
    Nitro,
    Amine,
    Cyano,
    Hydroxyl,
    Fluoro,
    Chloro,
    Bromo,
}

impl Substituent {
    pub const ALL: [Substituent; 7] = [
        Substituent::Nitro,
        Substituent::Amine,
        Substituent::Cyano,
        Substituent::Hydroxyl,
        Substituent::Fluoro,
        Substituent::Chloro,
        Substituent::Bromo,
    ];

    /// Tag string used in structure titles and store records.
    pub fn name(&self) -> &'static str {
        match self {
            Substituent::Nitro => "nitro",
            Substituent::Amine => "amine",
            Substituent::Cyano => "cyano",
            Substituent::Hydroxyl => "hydroxyl",
            Substituent::Fluoro => "fluoro",
            Substituent::Chloro => "chloro",
            Substituent::Bromo => "bromo",
        }
    }

    /// Bond length from the anchor atom to the group's head atom, in
    /// Angstroms.
    fn anchor_bond_length(&self) -> f64 {
        match self {
            Substituent::Nitro => 1.47,
            Substituent::Amine => 1.40,
            Substituent::Cyano => 1.43,
            Substituent::Hydroxyl => 1.36,
            Substituent::Fluoro => 1.35,
            Substituent::Chloro => 1.74,
            Substituent::Bromo => 1.90,
        }
    }

    /// Group geometry in the local frame: the head atom sits at the origin
    /// and the outward direction (away from the anchor) is +z.
    fn local_sites(&self) -> Vec<(&'static str, Vector3<f64>)> {
        match self {
            Substituent::Nitro => vec![
                ("N", Vector3::zeros()),
                ("O", Vector3::new(1.063, 0.0, 0.577)),
                ("O", Vector3::new(-1.063, 0.0, 0.577)),
            ],
            Substituent::Amine => vec![
                ("N", Vector3::zeros()),
                ("H", Vector3::new(0.937, 0.200, 0.330)),
                ("H", Vector3::new(-0.937, 0.200, 0.330)),
            ],
            Substituent::Cyano => vec![
                ("C", Vector3::zeros()),
                ("N", Vector3::new(0.0, 0.0, 1.16)),
            ],
            Substituent::Hydroxyl => vec![
                ("O", Vector3::zeros()),
                ("H", Vector3::new(0.908, 0.0, 0.313)),
            ],
            Substituent::Fluoro => vec![("F", Vector3::zeros())],
            Substituent::Chloro => vec![("Cl", Vector3::zeros())],
            Substituent::Bromo => vec![("Br", Vector3::zeros())],
        }
    }
}

/// Replaces the hydrogen at `site` with the substituent group, oriented
/// along the former anchor-H bond.
///
/// The replaced site keeps its index (the group's head atom is written in
/// place), and any further group atoms are appended at the end of the site
/// list, so the indices of all other existing sites are unaffected.
pub fn substitute(
    molecule: &mut Molecule,
    site: usize,
    group: Substituent,
) -> Result<(), SubstitutionError> {
    let hydrogen = molecule
        .site(site)
        .ok_or(SubstitutionError::SiteOutOfRange(site))?;
    if !hydrogen.is_hydrogen() {
        return Err(SubstitutionError::NotAHydrogen {
            index: site,
            label: hydrogen.label.clone(),
        });
    }
    let hydrogen_pos = hydrogen.position;

    let anchor = molecule
        .nearest_heavy_site(site)
        .ok_or(SubstitutionError::NoAnchor(site))?;
    let anchor_pos = molecule.site(anchor).expect("anchor index is valid").position;

    let outward = Unit::new_normalize(hydrogen_pos - anchor_pos);
    let rotation = rotation_from_z(&outward);
    let head = anchor_pos + outward.into_inner() * group.anchor_bond_length();

    let mut local = group.local_sites().into_iter();
    let (head_label, _) = local.next().expect("groups have at least one site");
    let replaced = molecule.site_mut(site).expect("site index checked above");
    replaced.label = head_label.to_string();
    replaced.position = head;
    for (label, offset) in local {
        molecule.push(Site::new(label, head + rotation * offset));
    }
    Ok(())
}

/// Rotation carrying the local +z axis onto `target`.
fn rotation_from_z(target: &Unit<Vector3<f64>>) -> Rotation3<f64> {
    match Rotation3::rotation_between(&Vector3::z(), target) {
        Some(rot) => rot,
        // antiparallel case: a half turn about any perpendicular axis
        None => Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI),
    }
}
