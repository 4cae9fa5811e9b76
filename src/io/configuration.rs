//! Platform slugs, fixed filenames and the runtime configuration record

use crate::io::error::{Result, invalid_parameter};
use std::path::{Path, PathBuf};

// Input interface slugs defined by the evaluation platform
/// Slug of the diffusion-weighted image input
pub const DWI_SLUG: &str = "dwi-brain-mri";
/// Slug of the apparent diffusion coefficient image input
pub const ADC_SLUG: &str = "adc-brain-mri";
/// Slug of the FLAIR image input
pub const FLAIR_SLUG: &str = "flair-brain-mri";
/// Slug of the run settings file, matched as a filename suffix
pub const SETTINGS_SLUG: &str = "deepisles_settings";

/// Subdirectory of the input root holding one directory per image slug
pub const INPUT_IMAGES_DIR: &str = "images";
/// Extension of the run settings file
pub const SETTINGS_EXTENSION: &str = "json";

// Output interface slugs
/// Slug of the lesion mask output
pub const SEGMENTATION_SLUG: &str = "stroke-lesion-segmentation";
/// Slug of the thumbnail output
pub const THUMBNAIL_SLUG: &str = "stroke-lesion-segmentation-thumbnail";

/// Subdirectory of the output root holding image outputs
pub const OUTPUT_IMAGES_DIR: &str = "images";
/// Name of the results manifest in the output root
pub const RESULTS_FILENAME: &str = "results.json";
/// Suffix appended to the case identifier for the mask filename
pub const MASK_SUFFIX: &str = "-msk";
/// Extension of the mask written for the platform
pub const OUTPUT_IMAGE_EXTENSION: &str = "mha";
/// Fixed filename of the thumbnail, overwritten by every run
pub const THUMBNAIL_FILENAME: &str = "stroke-lesion-segmentation-thumbnail.png";

// Fixed names the ensemble writes into its output directory
/// Mask produced by the ensemble
pub const ENSEMBLE_MASK_FILENAME: &str = "lesion_msk.nii.gz";
/// Preview screenshot produced by the ensemble
pub const ENSEMBLE_PREVIEW_FILENAME: &str = "output_screenshot.png";
/// Prefix of the per-case scratch directory
pub const SCRATCH_PREFIX: &str = "tmp";

// Container defaults
/// Default input root mounted by the platform
pub const DEFAULT_INPUT_ROOT: &str = "/input";
/// Default output root mounted by the platform
pub const DEFAULT_OUTPUT_ROOT: &str = "/output";
/// Default directory of the trained model weights
pub const DEFAULT_WEIGHTS_DIR: &str = "/opt/ml/model/weights";
/// Default location of the ensemble sources, relative to the working directory
pub const DEFAULT_ENSEMBLE_PATH: &str = "DeepIsles";
/// Default Python interpreter used to run the ensemble
pub const DEFAULT_PYTHON: &str = "python3";
/// Default parent of the scratch directories
pub const DEFAULT_SCRATCH_ROOT: &str = "/tmp";
/// Default accepted extension for modality images
pub const DEFAULT_IMAGE_EXTENSION: &str = "mha";

/// Spinner refresh interval while the ensemble runs
pub const SPINNER_TICK_MS: u64 = 120;

/// Paths and switches resolved once at process startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Root of the input layout
    pub input_root: PathBuf,
    /// Root of the output layout
    pub output_root: PathBuf,
    /// Directory of the trained model weights
    pub weights_dir: PathBuf,
    /// Parent directory for per-case scratch directories
    pub scratch_root: PathBuf,
    /// Accepted modality image extensions, without the leading dot
    pub image_extensions: Vec<String>,
    /// Keep scratch directories and log verbosely
    pub debug: bool,
    /// Suppress the progress spinner
    pub quiet: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from(DEFAULT_INPUT_ROOT),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            weights_dir: PathBuf::from(DEFAULT_WEIGHTS_DIR),
            scratch_root: PathBuf::from(DEFAULT_SCRATCH_ROOT),
            image_extensions: vec![DEFAULT_IMAGE_EXTENSION.to_string()],
            debug: false,
            quiet: false,
        }
    }
}

impl ProcessorConfig {
    /// Configuration rooted at the given input and output directories
    pub fn with_roots(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Check the configuration before any case work starts
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No image extension is configured, or one is empty or starts with a dot
    /// - The input root is not an existing directory
    pub fn validate(&self) -> Result<()> {
        if self.image_extensions.is_empty() {
            return Err(invalid_parameter(
                "image_extensions",
                &"[]",
                &"at least one image extension is required",
            ));
        }
        if let Some(bad) = self
            .image_extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(invalid_parameter(
                "image_extensions",
                bad,
                &"extensions are given without the leading dot",
            ));
        }
        if !self.input_root.is_dir() {
            return Err(invalid_parameter(
                "input_root",
                &self.input_root.display(),
                &"input root must be an existing directory",
            ));
        }
        Ok(())
    }

    /// Directory receiving the converted lesion mask
    pub fn segmentation_dir(&self) -> PathBuf {
        self.output_images_dir().join(SEGMENTATION_SLUG)
    }

    /// Directory receiving the thumbnail
    pub fn thumbnail_dir(&self) -> PathBuf {
        self.output_images_dir().join(THUMBNAIL_SLUG)
    }

    /// Fixed thumbnail location shared by every run
    pub fn thumbnail_path(&self) -> PathBuf {
        self.thumbnail_dir().join(THUMBNAIL_FILENAME)
    }

    /// Location of the results manifest
    pub fn results_path(&self) -> PathBuf {
        self.output_root.join(RESULTS_FILENAME)
    }

    /// Input root the case inputs are resolved against
    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    fn output_images_dir(&self) -> PathBuf {
        self.output_root.join(OUTPUT_IMAGES_DIR)
    }
}

/// Filename of the converted mask for a case
pub fn mask_filename(case_id: &str) -> String {
    format!("{case_id}{MASK_SUFFIX}.{OUTPUT_IMAGE_EXTENSION}")
}
