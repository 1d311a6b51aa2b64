use nalgebra::Point3;
use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Label used for ghost probe centers in engine input and output files.
pub const GHOST_LABEL: &str = "Bq";

static ATOMIC_NUMBERS: phf::Map<&'static str, u8> = phf_map! {
    "H" => 1,
    "B" => 5,
    "C" => 6,
    "N" => 7,
    "O" => 8,
    "F" => 9,
    "Si" => 14,
    "P" => 15,
    "S" => 16,
    "Cl" => 17,
    "Br" => 35,
    "I" => 53,
};

/// Looks up the atomic number for an element symbol.
///
/// Ghost probe centers (`Bq`) have no atomic number and return `None`.
pub fn atomic_number(symbol: &str) -> Option<u8> {
    ATOMIC_NUMBERS.get(symbol).copied()
}

/// Looks up the element symbol for an atomic number.
///
/// Non-positive atomic numbers denote ghost or dummy centers and map to `Bq`.
pub fn element_symbol(atomic_number: i32) -> Option<&'static str> {
    if atomic_number <= 0 {
        return Some(GHOST_LABEL);
    }
    ATOMIC_NUMBERS
        .entries()
        .find(|(_, z)| i32::from(**z) == atomic_number)
        .map(|(symbol, _)| *symbol)
}

/// One site of a molecule: an element symbol (or the ghost label `Bq`)
/// together with Cartesian coordinates in Angstroms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub label: String,
    pub position: Point3<f64>,
}

impl Site {
    pub fn new(label: impl Into<String>, position: Point3<f64>) -> Self {
        Self {
            label: label.into(),
            position,
        }
    }

    /// Returns `true` for ghost probe centers.
    pub fn is_ghost(&self) -> bool {
        self.label == GHOST_LABEL
    }

    /// Returns `true` for hydrogen sites.
    pub fn is_hydrogen(&self) -> bool {
        self.label == "H"
    }
}

/// An ordered list of atomic sites.
///
/// Site order is significant throughout the workflow: substitution site
/// tables, ring definitions and shielding-tensor extraction all address
/// sites by their zero-based index, so every mutating operation documents
/// how it affects the indices of the remaining sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    sites: Vec<Site>,
}

impl Molecule {
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn site(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    pub fn site_mut(&mut self, index: usize) -> Option<&mut Site> {
        self.sites.get_mut(index)
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Appends a site, returning its index.
    pub fn push(&mut self, site: Site) -> usize {
        self.sites.push(site);
        self.sites.len() - 1
    }

    /// Appends a ghost probe center at the given position.
    pub fn push_ghost(&mut self, position: Point3<f64>) -> usize {
        self.push(Site::new(GHOST_LABEL, position))
    }

    /// Replaces the element label of a site, keeping its position.
    ///
    /// Used for in-place aza substitution (CH -> N). Site indices are
    /// unaffected.
    pub fn relabel(&mut self, index: usize, label: impl Into<String>) -> bool {
        match self.sites.get_mut(index) {
            Some(site) => {
                site.label = label.into();
                true
            }
            None => false,
        }
    }

    /// Removes a single site. All later site indices shift down by one.
    pub fn remove(&mut self, index: usize) -> Option<Site> {
        if index < self.sites.len() {
            Some(self.sites.remove(index))
        } else {
            None
        }
    }

    /// Returns the index of the nearest non-hydrogen, non-ghost site.
    ///
    /// This identifies the anchor atom a substituent attaches to when a
    /// hydrogen site is replaced by a functional group.
    pub fn nearest_heavy_site(&self, index: usize) -> Option<usize> {
        let origin = &self.sites.get(index)?.position;
        self.sites
            .iter()
            .enumerate()
            .filter(|(i, s)| *i != index && !s.is_hydrogen() && !s.is_ghost())
            .min_by(|(_, a), (_, b)| {
                let da = (a.position - origin).norm_squared();
                let db = (b.position - origin).norm_squared();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }
}

impl FromIterator<Site> for Molecule {
    fn from_iter<T: IntoIterator<Item = Site>>(iter: T) -> Self {
        Self {
            sites: iter.into_iter().collect(),
        }
    }
}
