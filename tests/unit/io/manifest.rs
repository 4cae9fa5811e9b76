//! Tests for the results manifest shape and atomic flushing

#[cfg(test)]
mod tests {
    use deepisles_runner::io::manifest::{
        ArtifactDescriptor, ArtifactKind, CaseResult, ResultsManifest,
    };
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    fn read_json(path: &std::path::Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    // Tests the exact JSON shape consumed by the platform
    // Verified by renaming the type field
    #[test]
    fn test_case_result_shape() {
        let case = CaseResult::segmentation("case1-msk.mha", "case1.mha");

        assert_eq!(
            serde_json::to_value(&case).unwrap(),
            json!({
                "outputs": [
                    {
                        "type": "Image",
                        "slug": "stroke-lesion-segmentation",
                        "filename": "case1-msk.mha"
                    },
                    {
                        "type": "Thumbnail",
                        "slug": "stroke-lesion-segmentation-thumbnail",
                        "filename": "stroke-lesion-segmentation-thumbnail.png"
                    }
                ],
                "inputs": [
                    {
                        "type": "Image",
                        "slug": "dwi-brain-mri",
                        "filename": "case1.mha"
                    }
                ]
            })
        );
    }

    // Tests descriptors parse back from platform JSON
    // Verified by removing the serde rename
    #[test]
    fn test_descriptor_deserialize() {
        let descriptor: ArtifactDescriptor = serde_json::from_value(json!({
            "type": "Thumbnail",
            "slug": "stroke-lesion-segmentation-thumbnail",
            "filename": "thumb.png"
        }))
        .unwrap();

        assert_eq!(descriptor.kind, ArtifactKind::Thumbnail);
        assert_eq!(descriptor.filename, "thumb.png");
    }

    // Tests every push rewrites the whole array
    // Verified by appending only the newest entry
    #[test]
    fn test_push_flushes_all_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        let mut manifest = ResultsManifest::new(path.clone());

        manifest
            .push(CaseResult::segmentation("a-msk.mha", "a.mha"))
            .unwrap();
        assert_eq!(read_json(&path).as_array().unwrap().len(), 1);

        manifest
            .push(CaseResult::segmentation("b-msk.mha", "b.mha"))
            .unwrap();
        let written = read_json(&path);
        assert_eq!(written.as_array().unwrap().len(), 2);
        assert_eq!(written[1]["outputs"][0]["filename"], "b-msk.mha");
        assert_eq!(manifest.cases().len(), 2);
    }

    // Tests an existing results file is replaced, not merged
    // Verified by loading the file at construction
    #[test]
    fn test_existing_results_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        fs::write(&path, r#"[{"outputs": [], "inputs": []}]"#).unwrap();

        let mut manifest = ResultsManifest::new(path.clone());
        manifest
            .push(CaseResult::segmentation("c-msk.mha", "c.mha"))
            .unwrap();

        let written = read_json(&path);
        assert_eq!(written.as_array().unwrap().len(), 1);
        assert_eq!(written[0]["inputs"][0]["filename"], "c.mha");
    }

    // Tests flushing creates the directory and leaves no temporary files
    // Verified by writing through a temp file in another directory
    #[test]
    fn test_flush_leaves_only_results() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("output/results.json");
        let manifest = ResultsManifest::new(path.clone());

        manifest.flush().unwrap();

        assert_eq!(read_json(&path), json!([]));
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, ["results.json"]);
    }

    // Tests the results file is world-readable
    // Verified by removing the permission change
    #[cfg(unix)]
    #[test]
    fn test_results_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.json");
        ResultsManifest::new(path.clone()).flush().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
