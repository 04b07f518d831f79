//! Output file writer implementation

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{GifCropError, GifCropResult};
use crate::output::OverwritePolicy;

/// Writes finished artifacts atomically: a temporary file in the target
/// directory is filled, then renamed into place.
pub struct ArtifactWriter {
    directory: PathBuf,
    overwrite: OverwritePolicy,
}

impl ArtifactWriter {
    pub fn new(directory: impl Into<PathBuf>, overwrite: OverwritePolicy) -> Self {
        Self {
            directory: directory.into(),
            overwrite,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write `bytes` as `file_name` inside the output directory
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> GifCropResult<PathBuf> {
        if bytes.is_empty() {
            return Err(GifCropError::OutputError {
                message: "refusing to write an empty artifact".to_string(),
            });
        }

        std::fs::create_dir_all(&self.directory).map_err(|e| GifCropError::OutputError {
            message: format!("cannot create {}: {}", self.directory.display(), e),
        })?;

        let target = self.directory.join(file_name);
        let mut temp = NamedTempFile::new_in(&self.directory)?;
        debug!("Writing to temporary file: {}", temp.path().display());
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        let persisted = match self.overwrite {
            OverwritePolicy::Always => temp.persist(&target),
            OverwritePolicy::Never => temp.persist_noclobber(&target),
        };
        persisted.map_err(|e| GifCropError::OutputError {
            message: format!("{}: {}", target.display(), e.error),
        })?;

        info!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }
}
