/// Extension based dispatch between the codecs
pub mod format;
/// MetaImage reader and writer
pub mod metaimage;
/// Single-file NIfTI-1 reader and writer
pub mod nifti;
/// Lesion burden of a segmentation mask
pub mod statistics;
/// In-memory volume and pixel types
pub mod voxels;

pub use format::{VolumeFormat, read_volume, write_volume};
pub use statistics::LesionSummary;
pub use voxels::{PixelType, Volume};
