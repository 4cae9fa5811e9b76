//! Command-line interface with the container's default layout

use crate::io::configuration::{
    DEFAULT_ENSEMBLE_PATH, DEFAULT_IMAGE_EXTENSION, DEFAULT_INPUT_ROOT, DEFAULT_OUTPUT_ROOT,
    DEFAULT_PYTHON, DEFAULT_SCRATCH_ROOT, DEFAULT_WEIGHTS_DIR, ProcessorConfig,
};
use crate::inference::ensemble::PythonEnsemble;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deepisles-runner")]
#[command(
    author,
    version,
    about = "Segment one stroke case with the DeepISLES ensemble"
)]
/// Command-line arguments; every path has a container default
pub struct Cli {
    /// Input root holding `images/<slug>/` and the settings file
    #[arg(long, default_value = DEFAULT_INPUT_ROOT)]
    pub input_root: PathBuf,

    /// Output root receiving `images/` and `results.json`
    #[arg(long, default_value = DEFAULT_OUTPUT_ROOT)]
    pub output_root: PathBuf,

    /// Directory of the trained model weights
    #[arg(long, default_value = DEFAULT_WEIGHTS_DIR)]
    pub weights_dir: PathBuf,

    /// Directory holding the DeepISLES sources
    #[arg(long, default_value = DEFAULT_ENSEMBLE_PATH)]
    pub ensemble_path: PathBuf,

    /// Python interpreter able to import the ensemble
    #[arg(long, default_value = DEFAULT_PYTHON)]
    pub python: String,

    /// Parent directory for per-case scratch directories
    #[arg(long, default_value = DEFAULT_SCRATCH_ROOT)]
    pub scratch_root: PathBuf,

    /// Accepted modality image extension, without the dot (repeatable)
    #[arg(long = "image-extension", default_value = DEFAULT_IMAGE_EXTENSION)]
    pub image_extensions: Vec<String>,

    /// Keep the scratch directory and log at debug level
    #[arg(short, long)]
    pub debug: bool,

    /// Suppress the progress spinner
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Startup configuration described by the arguments
    pub fn to_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            input_root: self.input_root.clone(),
            output_root: self.output_root.clone(),
            weights_dir: self.weights_dir.clone(),
            scratch_root: self.scratch_root.clone(),
            image_extensions: self.image_extensions.clone(),
            debug: self.debug,
            quiet: self.quiet,
        }
    }

    /// Ensemble driver described by the arguments
    pub fn ensemble(&self) -> PythonEnsemble {
        PythonEnsemble::new(self.python.clone(), self.ensemble_path.clone())
    }
}
