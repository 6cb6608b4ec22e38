//! Temporary artifacts with scoped lifetime.
//!
//! A [`ScratchFile`] reserves a uniquely named file in the system temporary
//! directory on construction and removes it on [`ScratchFile::release`] or on
//! drop, whichever comes first. Release is idempotent.
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use tempfile::TempPath;

use crate::tuner_errors::TunerError;

#[derive(Debug)]
pub struct ScratchFile {
    path: Utf8PathBuf,
    handle: Option<TempPath>,
}

impl ScratchFile {
    /// Create an empty, closed temporary file whose name ends with `suffix`.
    pub fn create(suffix: &str) -> Result<Self, TunerError> {
        let handle = tempfile::Builder::new()
            .prefix("regtuner")
            .suffix(suffix)
            .tempfile()?
            .into_temp_path();
        let path = Utf8PathBuf::from_path_buf(handle.to_path_buf()).map_err(|p| {
            TunerError::Config(format!(
                "temporary directory is not valid UTF-8: {}",
                p.display()
            ))
        })?;
        debug!("Created scratch file {path}");
        Ok(ScratchFile {
            path,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Remove the file now. Calling it again is a no-op.
    ///
    /// A file already removed by someone else is not an error.
    pub fn release(&mut self) -> Result<(), TunerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.close() {
            Ok(()) => {
                debug!("Removed scratch file {}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Scratch file {} was already removed", self.path);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
