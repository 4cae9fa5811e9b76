/// Slug-based discovery of the case inputs
pub mod inputs;
/// Orchestration of one case from inputs to manifest
pub mod processor;

pub use inputs::{CaseInputs, FileLookup, InputRole, resolve_case_inputs};
pub use processor::{CaseProcessor, InferenceArtifacts};
