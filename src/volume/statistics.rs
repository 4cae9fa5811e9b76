//! Lesion burden measured on a binary segmentation mask

use crate::volume::voxels::Volume;

const MM3_PER_ML: f64 = 1000.0;

/// Foreground size of a segmentation mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LesionSummary {
    /// Number of voxels with a value above zero
    pub voxel_count: usize,
    /// Physical volume of those voxels in millilitres
    pub volume_ml: f64,
}

impl LesionSummary {
    /// Measure the foreground of a mask
    pub fn from_volume(volume: &Volume) -> Self {
        let voxel_count = volume.count_voxels(|value| value > 0.0);
        Self {
            voxel_count,
            volume_ml: voxel_count as f64 * volume.voxel_volume_mm3() / MM3_PER_ML,
        }
    }

    /// Whether the mask contains any lesion voxel
    pub const fn is_empty(&self) -> bool {
        self.voxel_count == 0
    }
}
