use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to unpack archive '{path}': {source}", path = path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write archive '{path}': {source}", path = path.display())]
    Pack {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a job's working directory came into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    /// A success archive already exists; the job must not run at all.
    AlreadyDone,
    /// A prior error archive was unpacked into the working directory.
    Resumed,
    /// No prior state; an empty working directory was created.
    Clean,
}

/// The two terminal outcomes of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Bridges working directories and the two-state archive outcome.
///
/// Each title owns at most one archive at any time: `{title}.tar.gz` after
/// a success, `{title}_error.tar.gz` after a failure. The success archive
/// is terminal; an error archive is the seed for the next attempt.
#[derive(Debug, Clone)]
pub struct ArchiveManager {
    calculations_dir: PathBuf,
}

impl ArchiveManager {
    pub fn new(calculations_dir: impl Into<PathBuf>) -> Self {
        Self {
            calculations_dir: calculations_dir.into(),
        }
    }

    pub fn workdir(&self, title: &str) -> PathBuf {
        self.calculations_dir.join(title)
    }

    pub fn success_archive(&self, title: &str) -> PathBuf {
        self.calculations_dir.join(format!("{}.tar.gz", title))
    }

    pub fn error_archive(&self, title: &str) -> PathBuf {
        self.calculations_dir.join(format!("{}_error.tar.gz", title))
    }

    /// Sets up the working directory for one attempt.
    ///
    /// A leftover working directory (from an attempt that died before
    /// archiving) is discarded first: archives are the only durable state,
    /// and a half-written tree must not shadow the archived one.
    pub fn prepare(&self, title: &str) -> Result<Prepared, ArchiveError> {
        if self.success_archive(title).exists() {
            debug!(title, "success archive already present, skipping job");
            return Ok(Prepared::AlreadyDone);
        }

        fs::create_dir_all(&self.calculations_dir)?;
        let workdir = self.workdir(title);
        if workdir.exists() {
            warn!(title, "discarding leftover working directory");
            fs::remove_dir_all(&workdir)?;
        }

        let error_archive = self.error_archive(title);
        if error_archive.exists() {
            info!(title, "resuming from error archive");
            self.unpack(&error_archive, &self.calculations_dir)?;
            return Ok(Prepared::Resumed);
        }

        fs::create_dir(&workdir)?;
        Ok(Prepared::Clean)
    }

    /// Records the attempt's outcome and tears down the working directory.
    ///
    /// The new archive is always written under a temporary name and moved
    /// into place before the superseded error archive is deleted, so a
    /// crash mid-finalize can never leave a previously-errored title with
    /// no archive at all.
    pub fn finalize(
        &self,
        title: &str,
        outcome: Outcome,
        was_resumed: bool,
    ) -> Result<(), ArchiveError> {
        let workdir = self.workdir(title);
        match outcome {
            Outcome::Success => {
                self.pack(title, &self.success_archive(title))?;
                if was_resumed {
                    let error_archive = self.error_archive(title);
                    if error_archive.exists() {
                        fs::remove_file(&error_archive)?;
                    }
                }
                info!(title, "job archived as success");
            }
            Outcome::Failure => {
                self.pack(title, &self.error_archive(title))?;
                info!(title, "job archived as error");
            }
        }
        fs::remove_dir_all(&workdir)?;
        Ok(())
    }

    fn pack(&self, title: &str, archive_path: &Path) -> Result<(), ArchiveError> {
        let staging = self
            .calculations_dir
            .join(format!(".{}.tar.gz.partial", title));
        let result = (|| {
            let encoder = GzEncoder::new(File::create(&staging)?, Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all(title, self.workdir(title))?;
            builder.into_inner()?.finish()?;
            fs::rename(&staging, archive_path)
        })();

        result.map_err(|source| {
            // never leave the partial file behind on failure
            let _ = fs::remove_file(&staging);
            ArchiveError::Pack {
                path: archive_path.to_path_buf(),
                source,
            }
        })
    }

    /// Unpacks the success archive for `title` into `dest`, which receives
    /// the archived `{title}/` tree. The extractor uses this to read
    /// completed jobs in a scratch directory without touching the shared
    /// archive area.
    pub fn unpack_success_into(&self, title: &str, dest: &Path) -> Result<(), ArchiveError> {
        self.unpack(&self.success_archive(title), dest)
    }

    fn unpack(&self, archive_path: &Path, dest: &Path) -> Result<(), ArchiveError> {
        let unpack = || -> io::Result<()> {
            let decoder = GzDecoder::new(File::open(archive_path)?);
            tar::Archive::new(decoder).unpack(dest)
        };
        unpack().map_err(|source| ArchiveError::Unpack {
            path: archive_path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(dir: &Path) -> ArchiveManager {
        ArchiveManager::new(dir.join("calculations"))
    }

    fn write_stage_log(manager: &ArchiveManager, title: &str, name: &str, content: &str) {
        fs::write(manager.workdir(title).join(name), content).unwrap();
    }

    #[test]
    fn fresh_title_gets_a_clean_working_directory() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        assert_eq!(archives.prepare("job").unwrap(), Prepared::Clean);
        assert!(archives.workdir("job").is_dir());
    }

    #[test]
    fn success_archive_is_a_terminal_skip_signal() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        archives.prepare("job").unwrap();
        write_stage_log(&archives, "job", "relax.log", "done");
        archives.finalize("job", Outcome::Success, false).unwrap();

        assert_eq!(archives.prepare("job").unwrap(), Prepared::AlreadyDone);
        // the no-op preparation must not recreate a working directory
        assert!(!archives.workdir("job").exists());
    }

    #[test]
    fn finalize_always_removes_the_working_directory() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        archives.prepare("job").unwrap();
        write_stage_log(&archives, "job", "relax.log", "boom");
        archives.finalize("job", Outcome::Failure, false).unwrap();

        assert!(!archives.workdir("job").exists());
        assert!(archives.error_archive("job").exists());
    }

    #[test]
    fn error_archive_round_trips_partial_state() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        archives.prepare("job").unwrap();
        write_stage_log(&archives, "job", "relax.log", "partial attempt");
        archives.finalize("job", Outcome::Failure, false).unwrap();

        assert_eq!(archives.prepare("job").unwrap(), Prepared::Resumed);
        let restored = fs::read_to_string(archives.workdir("job").join("relax.log")).unwrap();
        assert_eq!(restored, "partial attempt");
    }

    #[test]
    fn exactly_one_archive_survives_every_finalize() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        // attempt 1 fails
        archives.prepare("job").unwrap();
        write_stage_log(&archives, "job", "relax.log", "first");
        archives.finalize("job", Outcome::Failure, false).unwrap();
        assert!(archives.error_archive("job").exists());
        assert!(!archives.success_archive("job").exists());

        // attempt 2 resumes and fails again: error archive is replaced
        assert_eq!(archives.prepare("job").unwrap(), Prepared::Resumed);
        write_stage_log(&archives, "job", "td.log", "second");
        archives.finalize("job", Outcome::Failure, true).unwrap();
        assert!(archives.error_archive("job").exists());
        assert!(!archives.success_archive("job").exists());

        // attempt 3 resumes and succeeds: only the success archive remains
        assert_eq!(archives.prepare("job").unwrap(), Prepared::Resumed);
        archives.finalize("job", Outcome::Success, true).unwrap();
        assert!(archives.success_archive("job").exists());
        assert!(!archives.error_archive("job").exists());
    }

    #[test]
    fn archives_are_standard_gzipped_tars_rooted_at_the_title() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        archives.prepare("job").unwrap();
        write_stage_log(&archives, "job", "relax.log", "contents");
        archives.finalize("job", Outcome::Success, false).unwrap();

        let decoder = GzDecoder::new(File::open(archives.success_archive("job")).unwrap());
        let mut tar = tar::Archive::new(decoder);
        let names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"job/relax.log".to_string()));
        assert!(names.iter().all(|n| n.starts_with("job")));
    }

    #[test]
    fn leftover_working_directories_are_discarded_on_prepare() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        archives.prepare("job").unwrap();
        write_stage_log(&archives, "job", "stale.log", "stale");

        // a crashed attempt never archived; the next prepare starts clean
        assert_eq!(archives.prepare("job").unwrap(), Prepared::Clean);
        assert!(!archives.workdir("job").join("stale.log").exists());
    }

    #[test]
    fn no_partial_archive_survives_a_failed_pack() {
        let tmp = tempdir().unwrap();
        let archives = manager(tmp.path());

        // no working directory at all: pack must fail and clean up
        fs::create_dir_all(archives.workdir("ghost").parent().unwrap()).unwrap();
        let err = archives
            .pack("ghost", &archives.success_archive("ghost"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Pack { .. }));
        assert!(!archives.success_archive("ghost").exists());
        let leftovers: Vec<_> = fs::read_dir(&archives.calculations_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty());
    }
}
