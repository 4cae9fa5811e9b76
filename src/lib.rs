//! Single-case runner for the DeepISLES stroke lesion segmentation ensemble
//!
//! Resolves the DWI, ADC and FLAIR images and the run settings of one case,
//! hands them to the ensemble, and writes the lesion mask, a thumbnail and the
//! results manifest in the layout the evaluation platform expects.

#![forbid(unsafe_code)]

/// Case input resolution and the case processor
pub mod case;
/// Run settings and the ensemble seam
pub mod inference;
/// Input/output operations, configuration and error handling
pub mod io;
/// Volume representation and the NIfTI and MetaImage codecs
pub mod volume;

pub use io::error::{ProcessorError, Result};
