//! Mask format conversion and thumbnail export

use crate::io::error::{FileSystemContext, ProcessorError, Result};
use crate::volume::{Volume, read_volume, write_volume};
use std::path::Path;

/// Convert a volume between formats by reading and rewriting it
///
/// The target format follows the target's extension. Voxels, pixel type,
/// origin, spacing and direction are carried over unchanged.
///
/// # Errors
///
/// Returns an error if:
/// - Either extension is not a supported volume format
/// - The source cannot be decoded
/// - The parent directory cannot be created
/// - The target cannot be written
pub fn convert_volume(source: &Path, target: &Path) -> Result<Volume> {
    let volume = read_volume(source)?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).fs_context(parent, "create directory")?;
    }
    write_volume(&volume, target)?;

    Ok(volume)
}

/// Copy a preview picture byte-for-byte after checking it decodes
///
/// Returns the picture's width and height.
///
/// # Errors
///
/// Returns an error if:
/// - The preview is not a readable image
/// - The parent directory cannot be created
/// - The copy fails
pub fn export_thumbnail(preview: &Path, target: &Path) -> Result<(u32, u32)> {
    let dimensions =
        image::image_dimensions(preview).map_err(|source| ProcessorError::Thumbnail {
            path: preview.to_path_buf(),
            source,
        })?;

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).fs_context(parent, "create directory")?;
    }
    std::fs::copy(preview, target).fs_context(target, "copy thumbnail")?;

    Ok(dimensions)
}
