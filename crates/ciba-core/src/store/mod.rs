//! JSON-document record stores.
//!
//! Two flat document files back the campaign: the structure store written
//! once by generation and read by every job process, and the result store
//! written by the extraction sweep. Both are plain JSON arrays so they stay
//! greppable and diffable across campaign runs.

use crate::core::models::record::{PropertyRecord, StructureRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed store document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Store already exists at '{}'; refusing to overwrite", .0.display())]
    AlreadyExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, StoreError>;

fn read_documents<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_documents<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// The read side of the structure store. Records are immutable once
/// generated; job processes only ever look structures up by index.
#[derive(Debug)]
pub struct StructureStore {
    records: Vec<StructureRecord>,
}

impl StructureStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            records: read_documents(path.as_ref())?,
        })
    }

    /// Writes a freshly generated store. Refuses to clobber an existing
    /// one: regenerating mid-campaign would silently re-key every archive.
    pub fn create<P: AsRef<Path>>(path: P, records: &[StructureRecord]) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.to_path_buf()));
        }
        write_documents(path, records)
    }

    pub fn get(&self, index: u32) -> Option<&StructureRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    pub fn all(&self) -> &[StructureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The write side of the extracted dataset. An extraction sweep always
/// rebuilds the whole document, so writing replaces any previous one.
#[derive(Debug)]
pub struct ResultStore;

impl ResultStore {
    pub fn write<P: AsRef<Path>>(path: P, records: &[PropertyRecord]) -> Result<()> {
        write_documents(path.as_ref(), records)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<PropertyRecord>> {
        read_documents(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::com::GaussianInput;
    use crate::core::models::molecule::{Molecule, Site};
    use crate::core::models::record::StructureTags;
    use nalgebra::Point3;
    use std::collections::BTreeMap;

    fn sample_record(index: u32) -> StructureRecord {
        StructureRecord {
            index,
            input: GaussianInput {
                link0: BTreeMap::new(),
                dieze_tag: "#p".into(),
                functional: "b3lyp".into(),
                basis_set: "6-311++G(d,p)".into(),
                route: BTreeMap::from([("opt".to_string(), String::new())]),
                title: format!("t{}", index),
                charge: 0,
                spin_multiplicity: 1,
                molecule: Molecule::new(vec![Site::new("C", Point3::new(0.0, 0.0, 0.0))]),
            },
            tags: StructureTags::new("ciba", Some(1), None, Some("nitro".into()), None, None),
        }
    }

    #[test]
    fn structures_round_trip_and_resolve_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structures.json");

        let records = vec![sample_record(1), sample_record(2)];
        StructureStore::create(&path, &records).unwrap();

        let store = StructureStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).unwrap().input.title, "t2");
        assert!(store.get(99).is_none());
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structures.json");

        StructureStore::create(&path, &[sample_record(1)]).unwrap();
        let err = StructureStore::create(&path, &[sample_record(2)]).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn missing_store_is_an_io_error() {
        let err = StructureStore::open("/nonexistent/structures.json").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn result_rows_round_trip_with_their_tags_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calculated-data.json");

        let row = crate::core::models::record::PropertyRecord {
            tags: StructureTags::new("ciba", Some(1), None, Some("cyano".into()), None, None),
            td_singlet: 3.32,
            td_triplet: 2.10,
            tda_singlet: 3.51,
            tda_triplet: 2.33,
            nicss_six_ring_above: 20.0,
            nicss_six_ring_below: 30.0,
            nicss_five_ring_above: 60.0,
            nicss_five_ring_below: 70.0,
            nicst_six_ring_above: 21.0,
            nicst_six_ring_below: 31.0,
            nicst_five_ring_above: 61.0,
            nicst_five_ring_below: 71.0,
        };
        ResultStore::write(&path, std::slice::from_ref(&row)).unwrap();

        // tags are flattened into the row document, matching the dataset's
        // one-row-per-structure shape
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"title\": \"ciba_nx-1_ny-_x-cyano_y-_z-\""));
        assert!(text.contains("\"td_singlet\": 3.32"));

        let rows = ResultStore::read(&path).unwrap();
        assert_eq!(rows, vec![row]);
    }
}
