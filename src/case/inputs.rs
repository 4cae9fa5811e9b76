//! Slug-based discovery of the files that make up one case

use crate::io::configuration::{
    ADC_SLUG, DWI_SLUG, FLAIR_SLUG, INPUT_IMAGES_DIR, SETTINGS_EXTENSION, SETTINGS_SLUG,
};
use crate::io::error::{FileSystemContext, ProcessorError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Role a resolved file plays in the case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputRole {
    /// Diffusion-weighted image, also the source of the case identifier
    Dwi,
    /// Apparent diffusion coefficient map
    Adc,
    /// FLAIR image
    Flair,
    /// Run settings JSON
    Settings,
}

impl InputRole {
    /// Every role, in resolution order
    pub const ALL: [Self; 4] = [Self::Dwi, Self::Adc, Self::Flair, Self::Settings];

    /// Platform slug identifying this role
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dwi => DWI_SLUG,
            Self::Adc => ADC_SLUG,
            Self::Flair => FLAIR_SLUG,
            Self::Settings => SETTINGS_SLUG,
        }
    }

    /// Whether the role is an image modality
    pub const fn is_image(self) -> bool {
        !matches!(self, Self::Settings)
    }
}

/// Outcome of searching for a single slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLookup {
    /// Exactly one candidate
    Found(PathBuf),
    /// No candidate
    NotFound {
        /// Slug that was searched for
        slug: &'static str,
        /// Directory that was searched
        directory: PathBuf,
    },
    /// More than one candidate
    Ambiguous {
        /// Slug that was searched for
        slug: &'static str,
        /// Directory that was searched
        directory: PathBuf,
        /// All candidates, sorted
        candidates: Vec<PathBuf>,
    },
}

impl FileLookup {
    fn from_candidates(slug: &'static str, directory: &Path, mut candidates: Vec<PathBuf>) -> Self {
        match candidates.len() {
            0 => Self::NotFound {
                slug,
                directory: directory.to_path_buf(),
            },
            1 => Self::Found(candidates.remove(0)),
            _ => {
                candidates.sort();
                Self::Ambiguous {
                    slug,
                    directory: directory.to_path_buf(),
                    candidates,
                }
            }
        }
    }

    /// Number of matching files
    pub fn candidate_count(&self) -> usize {
        match self {
            Self::Found(_) => 1,
            Self::NotFound { .. } => 0,
            Self::Ambiguous { candidates, .. } => candidates.len(),
        }
    }

    /// The single match, or an error naming the slug and candidate count
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::MissingInput`] or [`ProcessorError::AmbiguousInput`]
    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            Self::Found(path) => Ok(path),
            Self::NotFound { slug, directory } => {
                Err(ProcessorError::MissingInput { slug, directory })
            }
            Self::Ambiguous {
                slug,
                directory,
                candidates,
            } => Err(ProcessorError::AmbiguousInput {
                slug,
                directory,
                candidates: candidates.len(),
            }),
        }
    }
}

/// The resolved files of one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseInputs {
    /// DWI filename up to its first dot
    pub case_id: String,
    /// Diffusion-weighted image
    pub dwi: PathBuf,
    /// Apparent diffusion coefficient map
    pub adc: PathBuf,
    /// FLAIR image
    pub flair: PathBuf,
    /// Run settings
    pub settings: PathBuf,
}

impl CaseInputs {
    /// Path resolved for a role
    pub fn path(&self, role: InputRole) -> &Path {
        match role {
            InputRole::Dwi => &self.dwi,
            InputRole::Adc => &self.adc,
            InputRole::Flair => &self.flair,
            InputRole::Settings => &self.settings,
        }
    }

    /// Every role paired with its path
    pub fn iter(&self) -> impl Iterator<Item = (InputRole, &Path)> {
        InputRole::ALL
            .into_iter()
            .map(move |role| (role, self.path(role)))
    }

    /// Original filename of the primary modality
    pub fn dwi_filename(&self) -> String {
        file_name(&self.dwi)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// Case identifier: the filename up to its first dot
pub fn case_id_from_path(path: &Path) -> String {
    let name = file_name(path);
    name.split('.').next().unwrap_or_default().to_string()
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| {
        name.len() > ext.len() + 1
            && name
                .strip_suffix(ext.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

fn matching_files(directory: &Path, matches: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).fs_context(directory, "list directory")? {
        let path = entry.fs_context(directory, "list directory")?.path();
        let name = file_name(&path);
        if path.is_file() && matches(&name) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Search for the file of one role
///
/// Modalities are searched in `images/<slug>/` by extension; the settings file
/// is searched in the input root by the `<slug>.json` suffix.
///
/// # Errors
///
/// Returns an error only if a directory exists but cannot be listed
pub fn lookup_role(
    input_root: &Path,
    role: InputRole,
    image_extensions: &[String],
) -> Result<FileLookup> {
    let slug = role.slug();
    let (directory, candidates) = if role.is_image() {
        let directory = input_root.join(INPUT_IMAGES_DIR).join(slug);
        let candidates = matching_files(&directory, |name| has_extension(name, image_extensions))?;
        (directory, candidates)
    } else {
        let suffix = format!("{slug}.{SETTINGS_EXTENSION}");
        let candidates = matching_files(input_root, |name| name.ends_with(&suffix))?;
        (input_root.to_path_buf(), candidates)
    };
    debug!(slug, candidates = candidates.len(), "input lookup");
    Ok(FileLookup::from_candidates(slug, &directory, candidates))
}

/// Resolve all four inputs of a case
///
/// # Errors
///
/// Returns an error if any role has zero or several candidates, or a directory
/// cannot be listed
pub fn resolve_case_inputs(input_root: &Path, image_extensions: &[String]) -> Result<CaseInputs> {
    let resolve = |role: InputRole| -> Result<PathBuf> {
        lookup_role(input_root, role, image_extensions)?.into_result()
    };

    let dwi = resolve(InputRole::Dwi)?;
    let adc = resolve(InputRole::Adc)?;
    let flair = resolve(InputRole::Flair)?;
    let settings = resolve(InputRole::Settings)?;

    Ok(CaseInputs {
        case_id: case_id_from_path(&dwi),
        dwi,
        adc,
        flair,
        settings,
    })
}
