//! The case processor: resolve inputs, run the ensemble, materialize outputs

use crate::case::inputs::{CaseInputs, resolve_case_inputs};
use crate::inference::ensemble::{EnsembleRequest, SegmentationEnsemble};
use crate::inference::settings::RunSettings;
use crate::io::configuration::{ProcessorConfig, SCRATCH_PREFIX, mask_filename};
use crate::io::error::{FileSystemContext, ProcessorError, Result};
use crate::io::image::{convert_volume, export_thumbnail};
use crate::io::manifest::{CaseResult, ResultsManifest};
use crate::io::progress::InferenceProgress;
use crate::volume::LesionSummary;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info};

/// Ensemble artifacts and the scratch directory that holds them
///
/// Dropping this value deletes the scratch directory unless it was created in
/// debug mode.
#[derive(Debug)]
pub struct InferenceArtifacts {
    /// Lesion mask written by the ensemble
    pub mask: PathBuf,
    /// Preview screenshot written by the ensemble
    pub preview: PathBuf,
    scratch: TempDir,
}

impl InferenceArtifacts {
    /// Scratch directory the ensemble wrote into
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

/// Processes exactly one case per instance lifetime
pub struct CaseProcessor<E> {
    config: ProcessorConfig,
    ensemble: E,
    manifest: ResultsManifest,
    progress: Option<InferenceProgress>,
}

impl<E: SegmentationEnsemble> CaseProcessor<E> {
    /// Create a processor with an empty manifest
    pub fn new(config: ProcessorConfig, ensemble: E) -> Self {
        let manifest = ResultsManifest::new(config.results_path());
        let progress = (!config.quiet).then(InferenceProgress::new);

        Self {
            config,
            ensemble,
            manifest,
            progress,
        }
    }

    /// Configuration the processor was created with
    pub const fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Manifest entries recorded so far
    pub const fn manifest(&self) -> &ResultsManifest {
        &self.manifest
    }

    /// Resolve the four inputs of the case under the input root
    ///
    /// # Errors
    ///
    /// Returns an error if any slug has zero or several candidates
    pub fn resolve_inputs(&self) -> Result<CaseInputs> {
        let inputs = resolve_case_inputs(self.config.input_root(), &self.config.image_extensions)?;
        for (role, path) in inputs.iter() {
            debug!(?role, path = %path.display(), "resolved input");
        }
        Ok(inputs)
    }

    /// Run the ensemble on the case in a fresh scratch directory
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The settings file is missing, malformed or lacks `skull_strip`
    /// - The scratch directory cannot be created
    /// - The ensemble fails or does not produce both artifacts
    pub fn run_inference(&self, inputs: &CaseInputs) -> Result<InferenceArtifacts> {
        let settings = RunSettings::load(&inputs.settings)?;

        let scratch_root = &self.config.scratch_root;
        std::fs::create_dir_all(scratch_root).fs_context(scratch_root, "create directory")?;
        // Debug runs keep the raw ensemble outputs, whether or not the case succeeds
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .disable_cleanup(self.config.debug)
            .tempdir_in(scratch_root)
            .fs_context(scratch_root, "create scratch directory")?;
        if self.config.debug {
            debug!(scratch = %scratch.path().display(), "keeping scratch directory");
        }

        let request = EnsembleRequest {
            dwi: &inputs.dwi,
            adc: &inputs.adc,
            flair: &inputs.flair,
            output_dir: scratch.path(),
            weights_dir: &self.config.weights_dir,
            skull_strip: settings.skull_strip,
        };
        info!(
            case_id = %inputs.case_id,
            skull_strip = settings.skull_strip,
            scratch = %scratch.path().display(),
            "running ensemble"
        );

        let start_time = Instant::now();
        if let Some(ref progress) = self.progress {
            progress.start(&inputs.case_id);
        }
        let outcome = self.ensemble.segment(&request);
        if let Some(ref progress) = self.progress {
            progress.finish();
        }
        let output = outcome?;
        info!(elapsed = ?start_time.elapsed(), "inference complete");

        output.verify()?;
        Ok(InferenceArtifacts {
            mask: output.mask,
            preview: output.preview,
            scratch,
        })
    }

    /// Write the mask, thumbnail and manifest entry for the case
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An output directory cannot be created
    /// - The mask cannot be converted
    /// - The preview is not a readable image or cannot be copied
    /// - The manifest cannot be written
    pub fn materialize_outputs(
        &mut self,
        artifacts: &InferenceArtifacts,
        inputs: &CaseInputs,
    ) -> Result<CaseResult> {
        for directory in [self.config.segmentation_dir(), self.config.thumbnail_dir()] {
            std::fs::create_dir_all(&directory).fs_context(&directory, "create directory")?;
        }

        let mask_name = mask_filename(&inputs.case_id);
        let mask_path = self.config.segmentation_dir().join(&mask_name);
        let volume = convert_volume(&artifacts.mask, &mask_path)?;
        if !mask_path.is_file() {
            return Err(ProcessorError::MissingArtifact { path: mask_path });
        }

        let summary = LesionSummary::from_volume(&volume);
        info!(
            mask = %mask_path.display(),
            dims = ?volume.dims(),
            lesion_voxels = summary.voxel_count,
            lesion_ml = summary.volume_ml,
            "mask written"
        );

        let thumbnail_path = self.config.thumbnail_path();
        let (width, height) = export_thumbnail(&artifacts.preview, &thumbnail_path)?;
        debug!(thumbnail = %thumbnail_path.display(), width, height, "thumbnail written");

        let case = CaseResult::segmentation(&mask_name, &inputs.dwi_filename());
        self.manifest.push(case.clone())?;
        info!(results = %self.manifest.path().display(), "results written");

        Ok(case)
    }

    /// Process the single case found under the input root
    ///
    /// # Errors
    ///
    /// Returns the first error from validation, resolution, inference or
    /// materialization; nothing is retried
    pub fn process(&mut self) -> Result<CaseResult> {
        self.config.validate()?;

        let inputs = self.resolve_inputs()?;
        info!(case_id = %inputs.case_id, "processing case");

        let artifacts = self.run_inference(&inputs)?;
        self.materialize_outputs(&artifacts, &inputs)
    }
}
