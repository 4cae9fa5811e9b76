//! Run settings supplied alongside each case

use crate::io::error::{ProcessorError, Result};
use serde::Deserialize;
use std::path::Path;

/// Options read from the `*deepisles_settings.json` input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RunSettings {
    /// Skull-strip the inputs before segmentation
    pub skull_strip: bool,
}

impl RunSettings {
    /// Load and validate the settings file
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Settings`] if the file cannot be read, is not
    /// JSON, or lacks a boolean `skull_strip`
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ProcessorError::Settings {
            path: path.to_path_buf(),
            reason: format!("cannot read file: {e}"),
        })?;
        Self::parse(&text).map_err(|e| ProcessorError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse settings from JSON text
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is malformed or `skull_strip` is
    /// missing or not a boolean
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
