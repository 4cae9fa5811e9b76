//! Results manifest consumed by the evaluation platform
//!
//! The manifest lives in memory and is written whole after every case, through
//! a temporary file in the same directory that is then renamed over the target.

use crate::io::configuration::{DWI_SLUG, SEGMENTATION_SLUG, THUMBNAIL_FILENAME, THUMBNAIL_SLUG};
use crate::io::error::{FileSystemContext, ProcessorError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[cfg(unix)]
const RESULTS_FILE_MODE: u32 = 0o644;

/// Kind of artifact a descriptor points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Medical image
    Image,
    /// Preview picture
    Thumbnail,
}

/// One input or output of a processed case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Artifact kind
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Interface slug
    pub slug: String,
    /// Filename of the artifact
    pub filename: String,
}

impl ArtifactDescriptor {
    /// Create a descriptor
    pub fn new(kind: ArtifactKind, slug: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
            filename: filename.into(),
        }
    }
}

/// Manifest entry for one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Produced artifacts
    pub outputs: Vec<ArtifactDescriptor>,
    /// Consumed artifacts
    pub inputs: Vec<ArtifactDescriptor>,
}

impl CaseResult {
    /// Entry for a segmented case: mask and thumbnail out, DWI in
    pub fn segmentation(mask_filename: &str, dwi_filename: &str) -> Self {
        Self {
            outputs: vec![
                ArtifactDescriptor::new(ArtifactKind::Image, SEGMENTATION_SLUG, mask_filename),
                ArtifactDescriptor::new(
                    ArtifactKind::Thumbnail,
                    THUMBNAIL_SLUG,
                    THUMBNAIL_FILENAME,
                ),
            ],
            inputs: vec![ArtifactDescriptor::new(
                ArtifactKind::Image,
                DWI_SLUG,
                dwi_filename,
            )],
        }
    }
}

/// Accumulated case results and the file they are flushed to
#[derive(Debug)]
pub struct ResultsManifest {
    path: PathBuf,
    cases: Vec<CaseResult>,
}

impl ResultsManifest {
    /// Start an empty manifest; nothing is read from `path`
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            cases: Vec::new(),
        }
    }

    /// Location of the results file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries recorded so far
    pub fn cases(&self) -> &[CaseResult] {
        &self.cases
    }

    /// Append an entry and flush the whole manifest
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails; the entry stays recorded in memory
    pub fn push(&mut self, case: CaseResult) -> Result<()> {
        self.cases.push(case);
        self.flush()
    }

    /// Atomically replace the results file with the current entries
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written
    pub fn flush(&self) -> Result<()> {
        let directory = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory).fs_context(directory, "create directory")?;

        let mut file = NamedTempFile::new_in(directory).fs_context(directory, "create temp file")?;
        serde_json::to_writer(&mut file, &self.cases).map_err(|source| {
            ProcessorError::Manifest {
                path: self.path.clone(),
                source,
            }
        })?;
        file.flush().fs_context(&self.path, "write results")?;
        // Temp files start owner-only; results must be world-readable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(RESULTS_FILE_MODE))
                .fs_context(&self.path, "set permissions")?;
        }
        file.persist(&self.path)
            .map_err(|e| e.error)
            .fs_context(&self.path, "replace results")?;
        Ok(())
    }
}
