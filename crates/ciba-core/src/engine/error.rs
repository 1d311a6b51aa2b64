use thiserror::Error;

use crate::core::io::com::ComError;
use crate::core::io::log::LogError;
use crate::core::models::substituents::SubstitutionError;
use crate::engine::archive::ArchiveError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to launch engine command '{command}': {source}")]
    EngineLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read or write input deck '{path}': {source}", path = path.display())]
    Deck {
        path: PathBuf,
        #[source]
        source: ComError,
    },

    #[error("Failed to read log '{path}': {source}", path = path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: LogError,
    },

    #[error("Relaxation log for '{title}' terminated normally but contains no geometry")]
    MissingRelaxedGeometry { title: String },

    #[error("Cannot place shielding probes on ring {ring:?}: {reason}")]
    ProbePlacement { ring: Vec<usize>, reason: &'static str },

    #[error("Substitution failed at site {site}: {source}")]
    Substitution {
        site: usize,
        #[source]
        source: SubstitutionError,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
