use crate::core::io::com::{self, ComError, GaussianInput};
use crate::core::models::molecule::{Molecule, Site, element_symbol};
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Termination detection is not reliable for magnetic-shielding (`nmr`)
/// logs: the engine truncates the closing block under some queue
/// configurations, so a shielding run cannot be classified as complete from
/// its log alone at job time. The job driver therefore never gates on
/// shielding termination; the data extractor re-checks each shielding log
/// and discards the structure when the check cannot pass.
pub const NMR_TERMINATION_RELIABLE: bool = false;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Log has no readable route section")]
    UnreadableRoute(#[source] Option<ComError>),
    #[error("Log has no charge/multiplicity record")]
    MissingChargeRecord,
    #[error("Log contains no geometry block")]
    MissingGeometry,
}

/// One electronic excitation read from an excited-state log.
#[derive(Debug, Clone, PartialEq)]
pub struct Excitation {
    pub energy_ev: f64,
    pub wavelength_nm: f64,
    pub oscillator_strength: f64,
    /// State label as printed by the engine, e.g. `Singlet-A` or `Triplet-B2`.
    pub label: String,
}

impl Excitation {
    pub fn is_singlet(&self) -> bool {
        self.label.to_ascii_lowercase().contains("singlet")
    }

    pub fn is_triplet(&self) -> bool {
        self.label.to_ascii_lowercase().contains("triplet")
    }
}

/// Magnetic shielding summary for one center of a shielding log.
#[derive(Debug, Clone, PartialEq)]
pub struct ShieldingTensor {
    /// One-based center number as printed by the engine.
    pub center: usize,
    pub label: String,
    pub isotropic: f64,
    pub anisotropy: f64,
}

/// A parsed engine log.
///
/// Parsing is a single tolerant pass: every section the log happens to
/// contain is collected, and absent sections simply yield empty accessors.
/// Whether the collected pieces are sufficient is the caller's decision;
/// the job driver and the data extractor apply different policies.
#[derive(Debug, Clone, Default)]
pub struct GaussianLog {
    terminated_normally: bool,
    link0: BTreeMap<String, String>,
    route_text: Option<String>,
    charge: Option<i8>,
    spin_multiplicity: Option<u8>,
    geometries: Vec<Molecule>,
    excitations: Vec<Excitation>,
    shieldings: Vec<ShieldingTensor>,
}

impl GaussianLog {
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, LogError> {
        let mut log = GaussianLog::default();
        let mut in_geometry = false;
        let mut geometry_header_left = 0usize;
        let mut current_geometry: Vec<Site> = Vec::new();

        for line_res in reader.lines() {
            let line = line_res?;
            let trimmed = line.trim();

            if in_geometry {
                if geometry_header_left > 0 {
                    geometry_header_left -= 1;
                    continue;
                }
                match parse_orientation_row(trimmed) {
                    Some(site) => {
                        current_geometry.push(site);
                        continue;
                    }
                    None => {
                        in_geometry = false;
                        if !current_geometry.is_empty() {
                            log.geometries
                                .push(Molecule::new(std::mem::take(&mut current_geometry)));
                        }
                    }
                }
            }

            if trimmed.ends_with("orientation:") {
                in_geometry = true;
                // column header and rule lines between the banner and rows
                geometry_header_left = 4;
                current_geometry.clear();
            } else if trimmed.contains("Normal termination of") {
                log.terminated_normally = true;
            } else if let Some(directive) = trimmed.strip_prefix('%') {
                let (key, value) = directive.split_once('=').unwrap_or((directive, ""));
                log.link0
                    .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
            } else if trimmed.starts_with('#') && log.route_text.is_none() {
                log.route_text = Some(trimmed.to_string());
            } else if trimmed.starts_with("Charge =") {
                parse_charge_line(trimmed, &mut log);
            } else if trimmed.starts_with("Excited State") {
                if let Some(excitation) = parse_excitation_line(trimmed) {
                    log.excitations.push(excitation);
                }
            } else if trimmed.contains("Isotropic =") && trimmed.contains("Anisotropy =") {
                if let Some(tensor) = parse_shielding_line(trimmed) {
                    log.shieldings.push(tensor);
                }
            }
        }

        if !current_geometry.is_empty() {
            log.geometries.push(Molecule::new(current_geometry));
        }
        Ok(log)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Whether the log closes with the engine's normal-termination banner.
    pub fn terminated_normally(&self) -> bool {
        self.terminated_normally
    }

    /// The last geometry the engine printed; for a relaxation log this is
    /// the optimized geometry.
    pub fn final_geometry(&self) -> Option<&Molecule> {
        self.geometries.last()
    }

    /// The first geometry the engine printed, i.e. the starting point of
    /// the calculation.
    pub fn initial_geometry(&self) -> Option<&Molecule> {
        self.geometries.first()
    }

    pub fn excitation_energies(&self) -> &[Excitation] {
        &self.excitations
    }

    pub fn magnetic_shielding(&self) -> &[ShieldingTensor] {
        &self.shieldings
    }

    /// Whether the route echo is present and parses as a valid route
    /// section. A failing check signals the log was produced with a
    /// configuration this workflow could not have written.
    pub fn route_is_readable(&self) -> bool {
        match &self.route_text {
            Some(text) => com::parse_route(text, 0).is_ok(),
            None => false,
        }
    }

    /// Rebuilds an input deck equivalent to the one that produced this log,
    /// from the route echo, the charge record and the first geometry.
    pub fn recover_input(&self, title: &str) -> Result<GaussianInput, LogError> {
        let route_text = self
            .route_text
            .as_ref()
            .ok_or(LogError::UnreadableRoute(None))?;
        let (dieze_tag, functional, basis_set, route) =
            com::parse_route(route_text, 0).map_err(|e| LogError::UnreadableRoute(Some(e)))?;
        let charge = self.charge.ok_or(LogError::MissingChargeRecord)?;
        let spin_multiplicity = self.spin_multiplicity.ok_or(LogError::MissingChargeRecord)?;
        let molecule = self
            .initial_geometry()
            .cloned()
            .ok_or(LogError::MissingGeometry)?;

        Ok(GaussianInput {
            link0: self.link0.clone(),
            dieze_tag,
            functional,
            basis_set,
            route,
            title: title.to_string(),
            charge,
            spin_multiplicity,
            molecule,
        })
    }
}

/// Parses one row of an orientation table:
/// `center  atomic-number  atomic-type  x  y  z`.
/// Ghost centers are printed with a non-positive atomic number.
fn parse_orientation_row(line: &str) -> Option<Site> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 6 {
        return None;
    }
    tokens[0].parse::<usize>().ok()?;
    let atomic_number = tokens[1].parse::<i32>().ok()?;
    let label = element_symbol(atomic_number)?;
    let x = tokens[3].parse::<f64>().ok()?;
    let y = tokens[4].parse::<f64>().ok()?;
    let z = tokens[5].parse::<f64>().ok()?;
    Some(Site::new(label, Point3::new(x, y, z)))
}

/// Parses `Charge =  0 Multiplicity = 1`.
fn parse_charge_line(line: &str, log: &mut GaussianLog) {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    for pair in tokens.windows(2) {
        if let ["=", value] = pair {
            if log.charge.is_none() {
                log.charge = value.parse().ok();
            } else if log.spin_multiplicity.is_none() {
                log.spin_multiplicity = value.parse().ok();
            }
        }
    }
}

/// Parses `Excited State   1:   Singlet-A   3.1234 eV  397.12 nm  f=0.0123 ...`.
fn parse_excitation_line(line: &str) -> Option<Excitation> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let ev_pos = tokens.iter().position(|t| *t == "eV")?;
    let nm_pos = tokens.iter().position(|t| *t == "nm")?;
    if ev_pos < 1 || nm_pos < 1 || ev_pos < 4 {
        return None;
    }

    let energy_ev = tokens[ev_pos - 1].parse().ok()?;
    let wavelength_nm = tokens[nm_pos - 1].parse().ok()?;
    let oscillator_strength = tokens
        .iter()
        .find_map(|t| t.strip_prefix("f="))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0);
    Some(Excitation {
        energy_ev,
        wavelength_nm,
        oscillator_strength,
        label: tokens[3].to_string(),
    })
}

/// Parses `  12  Bq   Isotropic =   11.0732   Anisotropy =    4.2210`.
fn parse_shielding_line(line: &str) -> Option<ShieldingTensor> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 8 || tokens[2] != "Isotropic" || tokens[5] != "Anisotropy" {
        return None;
    }
    Some(ShieldingTensor {
        center: tokens[0].parse().ok()?,
        label: tokens[1].to_string(),
        isotropic: tokens[4].parse().ok()?,
        anisotropy: tokens[7].parse().ok()?,
    })
}
