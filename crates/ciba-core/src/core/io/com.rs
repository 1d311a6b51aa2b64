use crate::core::models::molecule::{Molecule, Site};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ComParseErrorKind },
    #[error("Missing required section: {0}")]
    MissingSection(&'static str),
}

#[derive(Debug, Error)]
pub enum ComParseErrorKind {
    #[error("Route section must start with a dieze tag ('#', '#n', '#p' or '#t')")]
    InvalidRouteTag,
    #[error("Route section has no functional/basis-set specification")]
    MissingModelChemistry,
    #[error("Invalid charge/multiplicity line (value: '{0}')")]
    InvalidChargeLine(String),
    #[error("Invalid coordinate line (value: '{0}')")]
    InvalidCoordinate(String),
}

/// An input deck for the external electronic-structure engine.
///
/// Covers the subset of the engine's free-format input grammar the campaign
/// uses: link0 resource directives, a single route section, a title line,
/// the charge/spin-multiplicity line and a Cartesian coordinate block.
///
/// Ghost probe centers are serialized with the bare `Bq` center label,
/// which the engine accepts directly; no post-processing of the written
/// file is required (or performed) for shielding-probe inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianInput {
    /// Link0 directives without the leading `%`, e.g. `chk -> chkpt.chk`.
    pub link0: BTreeMap<String, String>,
    /// Route prefix controlling output verbosity, normally `#p`.
    pub dieze_tag: String,
    pub functional: String,
    pub basis_set: String,
    /// Route keywords; an empty value serializes the bare keyword.
    pub route: BTreeMap<String, String>,
    pub title: String,
    pub charge: i8,
    pub spin_multiplicity: u8,
    pub molecule: Molecule,
}

impl GaussianInput {
    /// Sets or replaces a route keyword.
    pub fn set_route_param(&mut self, key: &str, value: impl Into<String>) {
        self.route.insert(key.to_ascii_lowercase(), value.into());
    }

    pub fn route_param(&self, key: &str) -> Option<&str> {
        self.route.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), ComError> {
        for (key, value) in &self.link0 {
            writeln!(writer, "%{}={}", key, value)?;
        }

        let mut route = format!("{} {}/{}", self.dieze_tag, self.functional, self.basis_set);
        for (key, value) in &self.route {
            if value.is_empty() {
                route.push_str(&format!(" {}", key));
            } else {
                route.push_str(&format!(" {}={}", key, value));
            }
        }
        writeln!(writer, "{}", route)?;
        writeln!(writer)?;

        writeln!(writer, "{}", self.title)?;
        writeln!(writer)?;

        writeln!(writer, "{} {}", self.charge, self.spin_multiplicity)?;
        for site in self.molecule.sites() {
            writeln!(
                writer,
                " {:<3} {:>13.6} {:>13.6} {:>13.6}",
                site.label, site.position.x, site.position.y, site.position.z
            )?;
        }
        // the engine requires a terminating blank line
        writeln!(writer)?;
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ComError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
    }

    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, ComError> {
        let mut link0 = BTreeMap::new();
        let mut route_text: Option<String> = None;
        let mut route_line = 0;
        let mut title_lines: Vec<String> = Vec::new();
        let mut charge_spin: Option<(i8, u8)> = None;
        let mut sites: Vec<Site> = Vec::new();

        enum Section {
            Header,
            Route,
            Title,
            ChargeSpin,
            Coords,
            Done,
        }
        let mut section = Section::Header;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();

            match section {
                Section::Header => {
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(directive) = trimmed.strip_prefix('%') {
                        let (key, value) = directive.split_once('=').unwrap_or((directive, ""));
                        link0.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
                    } else if trimmed.starts_with('#') {
                        route_text = Some(trimmed.to_string());
                        route_line = line_num;
                        section = Section::Route;
                    } else {
                        return Err(ComError::Parse {
                            line: line_num,
                            kind: ComParseErrorKind::InvalidRouteTag,
                        });
                    }
                }
                Section::Route => {
                    // route sections may continue over several lines,
                    // terminated by the first blank line
                    if trimmed.is_empty() {
                        section = Section::Title;
                    } else if let Some(text) = route_text.as_mut() {
                        text.push(' ');
                        text.push_str(trimmed);
                    }
                }
                Section::Title => {
                    if trimmed.is_empty() {
                        if !title_lines.is_empty() {
                            section = Section::ChargeSpin;
                        }
                    } else {
                        title_lines.push(trimmed.to_string());
                    }
                }
                Section::ChargeSpin => {
                    if trimmed.is_empty() {
                        continue;
                    }
                    let mut parts = trimmed.split_whitespace();
                    let parsed = match (parts.next(), parts.next()) {
                        (Some(c), Some(m)) => c.parse::<i8>().ok().zip(m.parse::<u8>().ok()),
                        _ => None,
                    };
                    charge_spin = Some(parsed.ok_or(ComError::Parse {
                        line: line_num,
                        kind: ComParseErrorKind::InvalidChargeLine(trimmed.to_string()),
                    })?);
                    section = Section::Coords;
                }
                Section::Coords => {
                    if trimmed.is_empty() {
                        section = Section::Done;
                        continue;
                    }
                    sites.push(parse_coordinate_line(trimmed, line_num)?);
                }
                Section::Done => break,
            }
        }

        let route_text = route_text.ok_or(ComError::MissingSection("route"))?;
        let (dieze_tag, functional, basis_set, route) = parse_route(&route_text, route_line)?;
        let (charge, spin_multiplicity) =
            charge_spin.ok_or(ComError::MissingSection("charge and multiplicity"))?;

        Ok(Self {
            link0,
            dieze_tag,
            functional,
            basis_set,
            route,
            title: title_lines.join(" "),
            charge,
            spin_multiplicity,
            molecule: Molecule::new(sites),
        })
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ComError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

fn parse_coordinate_line(line: &str, line_num: usize) -> Result<Site, ComError> {
    let mut parts = line.split_whitespace();
    let label = parts.next();
    let coords: Vec<f64> = parts.take(3).filter_map(|t| t.parse().ok()).collect();
    match (label, coords.len()) {
        (Some(label), 3) => Ok(Site::new(
            label,
            Point3::new(coords[0], coords[1], coords[2]),
        )),
        _ => Err(ComError::Parse {
            line: line_num,
            kind: ComParseErrorKind::InvalidCoordinate(line.to_string()),
        }),
    }
}

type ParsedRoute = (String, String, String, BTreeMap<String, String>);

/// Splits a route section into its dieze tag, model chemistry and keyword
/// map. Shared with the log parser, which recovers inputs from the route
/// echo in engine logs.
pub(crate) fn parse_route(text: &str, line_num: usize) -> Result<ParsedRoute, ComError> {
    let mut tokens = text.split_whitespace();
    let tag = tokens.next().unwrap_or("");
    if !matches!(tag, "#" | "#n" | "#p" | "#t") {
        return Err(ComError::Parse {
            line: line_num,
            kind: ComParseErrorKind::InvalidRouteTag,
        });
    }

    let mut functional = None;
    let mut basis_set = None;
    let mut route = BTreeMap::new();
    for token in tokens {
        match token.split_once('/') {
            Some((func, basis)) if functional.is_none() && !func.contains('=') => {
                functional = Some(func.to_string());
                basis_set = Some(basis.to_string());
            }
            _ => {
                let (key, value) = token.split_once('=').unwrap_or((token, ""));
                route.insert(key.to_ascii_lowercase(), value.to_string());
            }
        }
    }

    match (functional, basis_set) {
        (Some(functional), Some(basis_set)) => Ok((tag.to_string(), functional, basis_set, route)),
        _ => Err(ComError::Parse {
            line: line_num,
            kind: ComParseErrorKind::MissingModelChemistry,
        }),
    }
}
