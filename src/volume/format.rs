//! File-name based dispatch between the volume codecs

use crate::io::error::{Result, unsupported_image};
use crate::volume::metaimage::{read_metaimage, write_metaimage};
use crate::volume::nifti::{read_nifti, write_nifti};
use crate::volume::voxels::Volume;
use std::path::Path;

/// On-disk volume formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    /// NIfTI-1, `.nii` or `.nii.gz`
    Nifti,
    /// MetaImage, `.mha` or `.mhd`
    MetaImage,
}

impl VolumeFormat {
    /// Detect the format from the file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(Self::Nifti)
        } else if name.ends_with(".mha") || name.ends_with(".mhd") {
            Some(Self::MetaImage)
        } else {
            None
        }
    }

    fn detect(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| {
            unsupported_image(path, &"extension is not one of .nii, .nii.gz, .mha, .mhd")
        })
    }
}

/// Read a volume in whichever format its name indicates
///
/// # Errors
///
/// Returns an error if the format is unknown or the codec fails
pub fn read_volume(path: &Path) -> Result<Volume> {
    match VolumeFormat::detect(path)? {
        VolumeFormat::Nifti => read_nifti(path),
        VolumeFormat::MetaImage => read_metaimage(path),
    }
}

/// Write a volume in whichever format its name indicates
///
/// # Errors
///
/// Returns an error if the format is unknown or the codec fails
pub fn write_volume(volume: &Volume, path: &Path) -> Result<()> {
    match VolumeFormat::detect(path)? {
        VolumeFormat::Nifti => write_nifti(volume, path),
        VolumeFormat::MetaImage => write_metaimage(volume, path),
    }
}
