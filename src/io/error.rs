//! Error types and context management for case processing

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all case processing operations
#[derive(Debug)]
pub enum ProcessorError {
    /// No file matched a required input slug
    MissingInput {
        /// Slug that was searched for
        slug: &'static str,
        /// Directory that was searched
        directory: PathBuf,
    },

    /// More than one file matched a required input slug
    AmbiguousInput {
        /// Slug that was searched for
        slug: &'static str,
        /// Directory that was searched
        directory: PathBuf,
        /// Number of matching files
        candidates: usize,
    },

    /// Run settings file is unreadable or malformed
    Settings {
        /// Path to the settings file
        path: PathBuf,
        /// Description of what's wrong with the settings
        reason: String,
    },

    /// Ensemble process could not be started
    EnsembleLaunch {
        /// Program that was executed
        program: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Ensemble process ran but reported failure
    EnsembleFailed {
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },

    /// An artifact the ensemble should have produced is absent
    MissingArtifact {
        /// Expected location of the artifact
        path: PathBuf,
    },

    /// Image file could not be decoded or encoded
    InvalidImage {
        /// Path to the image file
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// Image file format or content is outside what the codecs support
    UnsupportedImage {
        /// Path to the image file
        path: PathBuf,
        /// Description of the unsupported feature
        reason: String,
    },

    /// Preview image could not be decoded
    Thumbnail {
        /// Path to the preview image
        path: PathBuf,
        /// Underlying image decoding error
        source: image::ImageError,
    },

    /// Results manifest could not be serialized
    Manifest {
        /// Path of the results file
        path: PathBuf,
        /// Underlying serialization error
        source: serde_json::Error,
    },

    /// Configuration parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { slug, directory } => {
                write!(
                    f,
                    "No input found for slug '{slug}' in '{}' (0 candidates)",
                    directory.display()
                )
            }
            Self::AmbiguousInput {
                slug,
                directory,
                candidates,
            } => {
                write!(
                    f,
                    "Ambiguous input for slug '{slug}' in '{}' ({candidates} candidates, expected 1)",
                    directory.display()
                )
            }
            Self::Settings { path, reason } => {
                write!(f, "Invalid run settings '{}': {reason}", path.display())
            }
            Self::EnsembleLaunch { program, source } => {
                write!(f, "Failed to launch ensemble with '{program}': {source}")
            }
            Self::EnsembleFailed { code } => match code {
                Some(code) => write!(f, "Ensemble inference failed with exit code {code}"),
                None => write!(f, "Ensemble inference was terminated by a signal"),
            },
            Self::MissingArtifact { path } => {
                write!(f, "Expected artifact '{}' was not produced", path.display())
            }
            Self::InvalidImage { path, reason } => {
                write!(f, "Invalid image '{}': {reason}", path.display())
            }
            Self::UnsupportedImage { path, reason } => {
                write!(f, "Unsupported image '{}': {reason}", path.display())
            }
            Self::Thumbnail { path, source } => {
                write!(f, "Failed to decode preview '{}': {source}", path.display())
            }
            Self::Manifest { path, source } => {
                write!(
                    f,
                    "Failed to serialize results to '{}': {source}",
                    path.display()
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ProcessorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EnsembleLaunch { source, .. } | Self::FileSystem { source, .. } => Some(source),
            Self::Thumbnail { source, .. } => Some(source),
            Self::Manifest { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for case processing results
pub type Result<T> = std::result::Result<T, ProcessorError>;

impl From<std::io::Error> for ProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Attaches the path and operation to raw I/O failures
pub trait FileSystemContext<T> {
    /// Convert an I/O error into [`ProcessorError::FileSystem`]
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path and operation applied
    fn fs_context(self, path: &Path, operation: &'static str) -> Result<T>;
}

impl<T> FileSystemContext<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, path: &Path, operation: &'static str) -> Result<T> {
        self.map_err(|source| ProcessorError::FileSystem {
            path: path.to_path_buf(),
            operation,
            source,
        })
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> ProcessorError {
    ProcessorError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an invalid image error
pub fn invalid_image(path: &Path, reason: &impl ToString) -> ProcessorError {
    ProcessorError::InvalidImage {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Create an unsupported image error
pub fn unsupported_image(path: &Path, reason: &impl ToString) -> ProcessorError {
    ProcessorError::UnsupportedImage {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
