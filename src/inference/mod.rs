/// Ensemble request, artifacts and the Python driver
pub mod ensemble;
/// Per-case run settings
pub mod settings;

pub use ensemble::{EnsembleOutput, EnsembleRequest, PythonEnsemble, SegmentationEnsemble};
pub use settings::RunSettings;
