//! Seam to the external DeepISLES segmentation ensemble
//!
//! The ensemble is a Python library. [`PythonEnsemble`] drives it through a
//! short inline script, passing every argument as one JSON document so that no
//! path needs shell quoting.

use crate::io::configuration::{ENSEMBLE_MASK_FILENAME, ENSEMBLE_PREVIEW_FILENAME};
use crate::io::error::{ProcessorError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Everything one ensemble call needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleRequest<'a> {
    /// Diffusion-weighted image
    pub dwi: &'a Path,
    /// Apparent diffusion coefficient map
    pub adc: &'a Path,
    /// FLAIR image
    pub flair: &'a Path,
    /// Directory the ensemble writes its artifacts into
    pub output_dir: &'a Path,
    /// Directory of the trained model weights
    pub weights_dir: &'a Path,
    /// Skull-strip the inputs before segmentation
    pub skull_strip: bool,
}

impl EnsembleRequest<'_> {
    /// Fast mode (fewer ensemble members) is never used
    pub const FAST: bool = false;
    /// Per-model outputs are never kept
    pub const SAVE_TEAM_OUTPUTS: bool = false;
    /// Results are never additionally written in MNI space
    pub const RESULTS_MNI: bool = false;
}

/// Artifacts the ensemble leaves in its output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsembleOutput {
    /// Consensus lesion mask (NIfTI)
    pub mask: PathBuf,
    /// Preview screenshot (PNG)
    pub preview: PathBuf,
}

impl EnsembleOutput {
    /// Fixed artifact locations inside an ensemble output directory
    pub fn in_directory(output_dir: &Path) -> Self {
        Self {
            mask: output_dir.join(ENSEMBLE_MASK_FILENAME),
            preview: output_dir.join(ENSEMBLE_PREVIEW_FILENAME),
        }
    }

    /// Fail unless both artifacts exist
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::MissingArtifact`] for the first absent file
    pub fn verify(&self) -> Result<()> {
        for path in [&self.mask, &self.preview] {
            if !path.is_file() {
                return Err(ProcessorError::MissingArtifact { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// A segmentation backend producing a mask and a preview for one case
pub trait SegmentationEnsemble {
    /// Segment one case, blocking until the artifacts are written
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot run or reports failure
    fn segment(&self, request: &EnsembleRequest<'_>) -> Result<EnsembleOutput>;
}

impl<T: SegmentationEnsemble + ?Sized> SegmentationEnsemble for &T {
    fn segment(&self, request: &EnsembleRequest<'_>) -> Result<EnsembleOutput> {
        (**self).segment(request)
    }
}

const DRIVER: &str = "\
import json
import sys
args = json.loads(sys.argv[1])
sys.path.insert(0, args['ensemble_path'])
from src.isles22_ensemble import IslesEnsemble
IslesEnsemble().predict_ensemble(**args)
";

/// Keyword arguments of `IslesEnsemble.predict_ensemble`
#[derive(Debug, Serialize)]
struct PredictEnsembleArgs<'a> {
    ensemble_path: &'a Path,
    input_dwi_path: &'a Path,
    input_adc_path: &'a Path,
    input_flair_path: &'a Path,
    output_path: &'a Path,
    fast: bool,
    save_team_outputs: bool,
    skull_strip: bool,
    results_mni: bool,
    weights_dir: &'a Path,
}

/// Runs the DeepISLES ensemble in a Python subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonEnsemble {
    python: String,
    ensemble_path: PathBuf,
}

impl PythonEnsemble {
    /// Create a driver for the ensemble sources at `ensemble_path`
    pub fn new(python: impl Into<String>, ensemble_path: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            ensemble_path: ensemble_path.into(),
        }
    }

    /// Directory holding the ensemble sources
    pub fn ensemble_path(&self) -> &Path {
        &self.ensemble_path
    }

    /// JSON argument document passed to the driver script
    ///
    /// # Errors
    ///
    /// Returns an error if a path is not valid UTF-8
    pub fn arguments(&self, request: &EnsembleRequest<'_>) -> Result<String> {
        let args = PredictEnsembleArgs {
            ensemble_path: &self.ensemble_path,
            input_dwi_path: request.dwi,
            input_adc_path: request.adc,
            input_flair_path: request.flair,
            output_path: request.output_dir,
            fast: EnsembleRequest::FAST,
            save_team_outputs: EnsembleRequest::SAVE_TEAM_OUTPUTS,
            skull_strip: request.skull_strip,
            results_mni: EnsembleRequest::RESULTS_MNI,
            weights_dir: request.weights_dir,
        };
        serde_json::to_string(&args).map_err(|e| ProcessorError::InvalidParameter {
            parameter: "ensemble arguments",
            value: format!("{request:?}"),
            reason: e.to_string(),
        })
    }
}

impl SegmentationEnsemble for PythonEnsemble {
    fn segment(&self, request: &EnsembleRequest<'_>) -> Result<EnsembleOutput> {
        let arguments = self.arguments(request)?;
        debug!(python = %self.python, %arguments, "launching ensemble");

        let status = Command::new(&self.python)
            .arg("-c")
            .arg(DRIVER)
            .arg(&arguments)
            .status()
            .map_err(|source| ProcessorError::EnsembleLaunch {
                program: self.python.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ProcessorError::EnsembleFailed {
                code: status.code(),
            });
        }

        info!(output_dir = %request.output_dir.display(), "ensemble finished");
        Ok(EnsembleOutput::in_directory(request.output_dir))
    }
}
