/// Command-line interface
pub mod cli;
/// Platform constants and the runtime configuration
pub mod configuration;
/// Error types
pub mod error;
/// Mask conversion and thumbnail export
pub mod image;
/// Tracing subscriber setup
pub mod logging;
/// Results manifest
pub mod manifest;
/// Inference spinner
pub mod progress;
