//! Destination path planning for downloads.
//!
//! Callers name destinations relative to the configured downloads directory.
//! Planning rejects anything that would land outside it.

use std::path::{Component, Path, PathBuf};

use dltrack_core::download::{TrackerError, TrackerResult};

/// A planned download destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDestination {
    /// The downloads directory the file lands in.
    pub base_dir: PathBuf,
    /// The destination relative to `base_dir`, normalised.
    pub relative: PathBuf,
}

impl DownloadDestination {
    /// Plan a destination under `downloads_directory`.
    ///
    /// `.` components are dropped. Absolute paths, prefixes and `..` are
    /// rejected with `InvalidArgument`.
    pub fn plan(downloads_directory: &Path, destination: &str) -> TrackerResult<Self> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(TrackerError::invalid_argument("missing destination"));
        }

        let mut relative = PathBuf::new();
        for component in Path::new(destination).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(TrackerError::invalid_argument(format!(
                        "destination '{destination}' escapes the downloads directory"
                    )));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(TrackerError::invalid_argument(format!(
                        "destination '{destination}' must be relative"
                    )));
                }
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(TrackerError::invalid_argument(format!(
                "destination '{destination}' names no file"
            )));
        }

        Ok(Self {
            base_dir: downloads_directory.to_path_buf(),
            relative,
        })
    }

    /// Full path handed to the engine.
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(&self.relative)
    }
}
