//! Tests for the in-memory volume and pixel type tables

#[cfg(test)]
mod tests {
    use crate::common::sample_mask;
    use deepisles_runner::volume::voxels::{IDENTITY_DIRECTION, swap_byte_order, transpose};
    use deepisles_runner::volume::{PixelType, Volume};

    const ALL_TYPES: [PixelType; 10] = [
        PixelType::U8,
        PixelType::I8,
        PixelType::U16,
        PixelType::I16,
        PixelType::U32,
        PixelType::I32,
        PixelType::U64,
        PixelType::I64,
        PixelType::F32,
        PixelType::F64,
    ];

    // Tests construction checks the byte count against the dimensions
    // Verified by accepting any data length
    #[test]
    fn test_new_checks_length() {
        assert!(Volume::new([2, 2, 2], PixelType::I16, vec![0; 16]).is_some());
        assert!(Volume::new([2, 2, 2], PixelType::I16, vec![0; 15]).is_none());
        assert!(Volume::new([usize::MAX, 2, 1], PixelType::U8, Vec::new()).is_none());
    }

    // Tests default geometry of a new volume
    // Verified by defaulting spacing to zero
    #[test]
    fn test_default_geometry() {
        let volume = Volume::new([1, 1, 1], PixelType::U8, vec![7]).unwrap();

        assert_eq!(volume.spacing(), [1.0; 3]);
        assert_eq!(volume.origin(), [0.0; 3]);
        assert_eq!(volume.direction(), IDENTITY_DIRECTION);
    }

    // Tests the array view is indexed z, y, x
    // Verified by building the array in x, y, z order
    #[test]
    fn test_to_array_indexing() {
        let array = sample_mask().to_array();

        assert_eq!(array.shape(), &[2, 3, 4]);
        assert_eq!(array[[0, 0, 0]], 1.0);
        assert_eq!(array[[0, 1, 1]], 1.0);
        assert_eq!(array[[1, 2, 3]], 1.0);
        assert_eq!(array[[1, 0, 0]], 0.0);
    }

    // Tests signed and float voxels decode to their values
    // Verified by decoding every type as unsigned bytes
    #[test]
    fn test_to_array_values() {
        let data = [-1.5_f64, 4.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let volume = Volume::new([2, 1, 1], PixelType::F64, data).unwrap();
        assert_eq!(volume.to_array()[[0, 0, 0]], -1.5);

        let volume = Volume::new([1, 1, 1], PixelType::I8, vec![0xff]).unwrap();
        assert_eq!(volume.to_array()[[0, 0, 0]], -1.0);
    }

    // Tests voxel counts and physical voxel size
    // Verified by summing spacing instead of multiplying
    #[test]
    fn test_voxel_measures() {
        let mask = sample_mask();
        assert_eq!(mask.voxel_count(), 24);
        assert!((mask.voxel_volume_mm3() - 1.0).abs() < f64::EPSILON);
    }

    // Tests type codes map back to their pixel types
    // Verified by swapping two NIfTI codes
    #[test]
    fn test_type_tables() {
        for pixel_type in ALL_TYPES {
            assert_eq!(
                PixelType::from_nifti_code(pixel_type.nifti_code()),
                Some(pixel_type)
            );
            assert_eq!(
                PixelType::from_meta_name(pixel_type.meta_name()),
                Some(pixel_type)
            );
        }
        assert_eq!(PixelType::from_meta_name("MET_ULONG"), Some(PixelType::U32));
        assert_eq!(PixelType::from_nifti_code(128), None);
        assert_eq!(PixelType::F64.size(), 8);
    }

    // Tests byte swapping per element
    // Verified by reversing the whole buffer
    #[test]
    fn test_swap_byte_order() {
        let mut data = vec![1, 2, 3, 4];
        swap_byte_order(&mut data, 2);
        assert_eq!(data, [2, 1, 4, 3]);

        swap_byte_order(&mut data, 1);
        assert_eq!(data, [2, 1, 4, 3]);
    }

    // Tests transposition swaps rows and columns
    // Verified by returning the matrix unchanged
    #[test]
    fn test_transpose() {
        let matrix = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        assert_eq!(
            transpose(matrix),
            [[1.0, 4.0, 7.0], [2.0, 5.0, 8.0], [3.0, 6.0, 9.0]]
        );
        assert_eq!(transpose(transpose(matrix)), matrix);
    }

    // Tests counting decodes each pixel type without building an array
    // Verified by counting raw non-zero bytes
    #[test]
    fn test_count_voxels() {
        assert_eq!(sample_mask().count_voxels(|v| v > 0.0), 3);

        let data = [256_u16, 0, 1].iter().flat_map(|v| v.to_le_bytes()).collect();
        let volume = Volume::new([3, 1, 1], PixelType::U16, data).unwrap();
        assert_eq!(volume.count_voxels(|v| v > 0.0), 2);
        assert_eq!(volume.count_voxels(|v| v > 255.0), 1);
    }
}
