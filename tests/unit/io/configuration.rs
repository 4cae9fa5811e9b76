//! Tests for platform constants and configuration validation

#[cfg(test)]
mod tests {
    use deepisles_runner::ProcessorError;
    use deepisles_runner::io::configuration::{
        ENSEMBLE_MASK_FILENAME, ENSEMBLE_PREVIEW_FILENAME, ProcessorConfig, RESULTS_FILENAME,
        SEGMENTATION_SLUG, THUMBNAIL_FILENAME, THUMBNAIL_SLUG, mask_filename,
    };
    use std::path::PathBuf;
    use tempfile::TempDir;

    // Tests the mask filename pattern
    // Verified by changing the suffix
    #[test]
    fn test_mask_filename() {
        assert_eq!(mask_filename("case1"), "case1-msk.mha");
    }

    // Tests output slugs and fixed filenames
    // Verified by changing constant values
    #[test]
    fn test_fixed_names() {
        assert_eq!(SEGMENTATION_SLUG, "stroke-lesion-segmentation");
        assert_eq!(THUMBNAIL_SLUG, "stroke-lesion-segmentation-thumbnail");
        assert_eq!(THUMBNAIL_FILENAME, "stroke-lesion-segmentation-thumbnail.png");
        assert_eq!(RESULTS_FILENAME, "results.json");
        assert_eq!(ENSEMBLE_MASK_FILENAME, "lesion_msk.nii.gz");
        assert_eq!(ENSEMBLE_PREVIEW_FILENAME, "output_screenshot.png");
    }

    // Tests the output layout derived from the output root
    // Verified by placing results under images/
    #[test]
    fn test_output_layout() {
        let config = ProcessorConfig::with_roots("/in", "/out");

        assert_eq!(
            config.segmentation_dir(),
            PathBuf::from("/out/images/stroke-lesion-segmentation")
        );
        assert_eq!(
            config.thumbnail_path(),
            PathBuf::from(
                "/out/images/stroke-lesion-segmentation-thumbnail/stroke-lesion-segmentation-thumbnail.png"
            )
        );
        assert_eq!(config.results_path(), PathBuf::from("/out/results.json"));
    }

    // Tests validation of the input root and extensions
    // Verified by skipping the input root check
    #[test]
    fn test_validate() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = ProcessorConfig::with_roots(temp_dir.path(), temp_dir.path());
        assert!(config.validate().is_ok());

        config.image_extensions = vec![".mha".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ProcessorError::InvalidParameter {
                parameter: "image_extensions",
                ..
            })
        ));

        config.image_extensions.clear();
        assert!(config.validate().is_err());

        let missing = ProcessorConfig::with_roots(temp_dir.path().join("nope"), temp_dir.path());
        assert!(matches!(
            missing.validate(),
            Err(ProcessorError::InvalidParameter {
                parameter: "input_root",
                ..
            })
        ));
    }
}
