//! Core domain types for the lesson catalog.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LessonForgeError, Result};

// ---------------------------------------------------------------------------
// CatalogEntry
// ---------------------------------------------------------------------------

/// One subject record from the catalog file.
///
/// The catalog is a JSON array; field names are fixed by the interchange
/// format and must not be renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Subject display name, e.g. "Lớp 10".
    pub name: String,
    /// Subject index page URL; lesson links are discovered from it.
    pub url: String,
    /// Directory (relative or absolute) where this subject's artifacts land.
    pub folder_save: String,
}

/// Load a catalog from a JSON file containing an array of [`CatalogEntry`].
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| LessonForgeError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        LessonForgeError::catalog(format!("failed to parse {}: {e}", path.display()))
    })
}

// ---------------------------------------------------------------------------
// LessonLink
// ---------------------------------------------------------------------------

/// One lesson page to crawl, discovered from a subject index page.
///
/// Identity is the `url`; two links with the same URL are the same lesson.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonLink {
    /// Name of the subject this lesson belongs to.
    pub subject_name: String,
    /// Output directory for this lesson's artifact.
    pub folder_path: String,
    /// The lesson page URL (identity).
    pub url: String,
    /// Anchor text; becomes the artifact file name after sanitation.
    pub display_text: String,
}
