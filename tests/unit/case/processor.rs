//! Tests for inference invocation and output materialization

#[cfg(test)]
mod tests {
    use crate::common::{FakeEnsemble, sample_mask, test_config, write_case};
    use deepisles_runner::ProcessorError;
    use deepisles_runner::case::CaseProcessor;
    use deepisles_runner::io::manifest::{ArtifactKind, CaseResult};
    use deepisles_runner::volume::read_volume;
    use std::fs;
    use tempfile::TempDir;

    fn setup(settings: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        write_case(&temp_dir.path().join("input"), "case1.mha", settings);
        temp_dir
    }

    // Tests the ensemble receives the modality paths and skull-strip flag
    // Verified by hardcoding skull_strip to false
    #[test]
    fn test_run_inference_passes_settings() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let processor = CaseProcessor::new(test_config(temp_dir.path()), FakeEnsemble::default());

        let inputs = processor.resolve_inputs().unwrap();
        let artifacts = processor.run_inference(&inputs).unwrap();

        assert!(artifacts.mask.is_file());
        assert!(artifacts.preview.is_file());
        assert!(artifacts.mask.ends_with("lesion_msk.nii.gz"));
        assert!(artifacts.preview.ends_with("output_screenshot.png"));

        let scratch = artifacts.scratch_dir();
        assert!(scratch.starts_with(temp_dir.path().join("scratch")));
        assert!(
            scratch
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("tmp")
        );
    }

    // Tests the skull-strip flag is read rather than assumed
    // Verified by ignoring the settings file
    #[test]
    fn test_run_inference_without_skull_strip() {
        let temp_dir = setup(r#"{"skull_strip": false}"#);
        let ensemble = FakeEnsemble::default();
        let processor = CaseProcessor::new(test_config(temp_dir.path()), &ensemble);

        let inputs = processor.resolve_inputs().unwrap();
        let _artifacts = processor.run_inference(&inputs).unwrap();

        let calls = ensemble.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].skull_strip);
        assert_eq!(calls[0].dwi, inputs.dwi);
    }

    // Tests each run gets its own scratch directory, removed on drop
    // Verified by reusing a fixed scratch path
    #[test]
    fn test_scratch_directory_is_unique_and_cleaned() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let processor = CaseProcessor::new(test_config(temp_dir.path()), FakeEnsemble::default());
        let inputs = processor.resolve_inputs().unwrap();

        let first = processor.run_inference(&inputs).unwrap();
        let second = processor.run_inference(&inputs).unwrap();
        assert_ne!(first.scratch_dir(), second.scratch_dir());

        let first_dir = first.scratch_dir().to_path_buf();
        drop(first);
        assert!(!first_dir.exists());
        assert!(second.scratch_dir().join("lesion_msk.nii.gz").is_file());
    }

    // Tests debug mode keeps scratch when the ensemble output is incomplete
    // Verified by creating the scratch directory with cleanup enabled
    #[test]
    fn test_debug_keeps_scratch_when_verification_fails() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let mut config = test_config(temp_dir.path());
        config.debug = true;
        let ensemble = FakeEnsemble::without_preview();
        let mut processor = CaseProcessor::new(config, &ensemble);

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::MissingArtifact { .. }));

        let calls = ensemble.calls.borrow();
        assert!(calls[0].output_dir.join("lesion_msk.nii.gz").is_file());
    }

    // Tests debug mode keeps scratch when writing the outputs fails
    // Verified by keeping scratch only after materialization succeeds
    #[test]
    fn test_debug_keeps_scratch_when_materialization_fails() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let mut config = test_config(temp_dir.path());
        config.debug = true;
        fs::write(&config.output_root, "not a directory").unwrap();
        let ensemble = FakeEnsemble::default();
        let mut processor = CaseProcessor::new(config, &ensemble);

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::FileSystem { .. }));

        let calls = ensemble.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].output_dir.exists());
        assert!(calls[0].output_dir.join("output_screenshot.png").is_file());
    }

    // Tests scratch is removed after a failure outside debug mode
    // Verified by disabling cleanup unconditionally
    #[test]
    fn test_scratch_removed_on_failure_without_debug() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let config = test_config(temp_dir.path());
        fs::write(&config.output_root, "not a directory").unwrap();
        let ensemble = FakeEnsemble::default();
        let mut processor = CaseProcessor::new(config, &ensemble);

        assert!(processor.process().is_err());
        assert!(!ensemble.calls.borrow()[0].output_dir.exists());
    }

    // Tests malformed settings abort before the ensemble runs
    // Verified by defaulting skull_strip when missing
    #[test]
    fn test_malformed_settings_are_fatal() {
        for settings in ["{}", "not json", r#"{"skull_strip": "yes"}"#] {
            let temp_dir = setup(settings);
            let ensemble = FakeEnsemble::default();
            let processor = CaseProcessor::new(test_config(temp_dir.path()), &ensemble);
            let inputs = processor.resolve_inputs().unwrap();

            let err = processor.run_inference(&inputs).unwrap_err();
            assert!(
                matches!(err, ProcessorError::Settings { .. }),
                "{settings}: {err}"
            );
            assert!(ensemble.calls.borrow().is_empty());
        }
    }

    // Tests ensemble failures propagate without retry
    // Verified by retrying the ensemble once
    #[test]
    fn test_ensemble_failure_is_fatal() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let ensemble = FakeEnsemble::failing();
        let processor = CaseProcessor::new(test_config(temp_dir.path()), &ensemble);
        let inputs = processor.resolve_inputs().unwrap();

        let err = processor.run_inference(&inputs).unwrap_err();
        assert!(matches!(err, ProcessorError::EnsembleFailed { code: Some(1) }));
        assert_eq!(ensemble.calls.borrow().len(), 1);
    }

    // Tests a missing preview is reported as a missing artifact
    // Verified by skipping artifact verification
    #[test]
    fn test_missing_preview_is_reported() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let processor =
            CaseProcessor::new(test_config(temp_dir.path()), FakeEnsemble::without_preview());
        let inputs = processor.resolve_inputs().unwrap();

        let err = processor.run_inference(&inputs).unwrap_err();
        match err {
            ProcessorError::MissingArtifact { path } => {
                assert!(path.ends_with("output_screenshot.png"));
            }
            other => unreachable!("Expected MissingArtifact, got {other:?}"),
        }
    }

    // Tests materialization writes mask, thumbnail and one manifest entry
    // Verified by skipping the manifest flush
    #[test]
    fn test_materialize_outputs() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let config = test_config(temp_dir.path());
        let mut processor = CaseProcessor::new(config.clone(), FakeEnsemble::default());
        let inputs = processor.resolve_inputs().unwrap();
        let artifacts = processor.run_inference(&inputs).unwrap();

        let case = processor.materialize_outputs(&artifacts, &inputs).unwrap();

        let mask_path = config.segmentation_dir().join("case1-msk.mha");
        assert!(mask_path.is_file());
        let written = read_volume(&mask_path).unwrap();
        assert_eq!(written, sample_mask());

        let thumbnail = config.thumbnail_path();
        assert_eq!(
            fs::read(&thumbnail).unwrap(),
            fs::read(&artifacts.preview).unwrap()
        );

        assert_eq!(case, CaseResult::segmentation("case1-msk.mha", "case1.mha"));
        assert_eq!(case.outputs[0].kind, ArtifactKind::Image);
        assert_eq!(case.outputs[1].kind, ArtifactKind::Thumbnail);
        assert_eq!(processor.manifest().cases().len(), 1);

        let on_disk: Vec<CaseResult> =
            serde_json::from_str(&fs::read_to_string(config.results_path()).unwrap()).unwrap();
        assert_eq!(on_disk, vec![case]);
    }

    // Tests the full process call and debug scratch retention
    // Verified by dropping artifacts before the debug check
    #[test]
    fn test_process_in_debug_mode_keeps_scratch() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let mut config = test_config(temp_dir.path());
        config.debug = true;
        let ensemble = FakeEnsemble::default();
        let mut processor = CaseProcessor::new(config, &ensemble);

        processor.process().unwrap();

        let calls = ensemble.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].output_dir.join("lesion_msk.nii.gz").is_file());
    }

    // Tests a failed case never writes a results file
    // Verified by flushing the manifest before inference
    #[test]
    fn test_failed_process_writes_no_results() {
        let temp_dir = setup(r#"{"skull_strip": true}"#);
        let config = test_config(temp_dir.path());
        let mut processor = CaseProcessor::new(config.clone(), FakeEnsemble::failing());

        assert!(processor.process().is_err());
        assert!(!config.results_path().exists());
        assert!(processor.manifest().cases().is_empty());
    }

    // Tests configuration is validated before anything else
    // Verified by removing the validate call
    #[test]
    fn test_process_rejects_missing_input_root() {
        let temp_dir = TempDir::new().unwrap();
        let ensemble = FakeEnsemble::default();
        let mut processor = CaseProcessor::new(test_config(temp_dir.path()), &ensemble);

        let err = processor.process().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidParameter { .. }));
        assert!(ensemble.calls.borrow().is_empty());
    }
}
