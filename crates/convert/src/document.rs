//! Rich-document model produced by conversion, and the document writer.
//!
//! The model is deliberately flat: a document is an ordered sequence of
//! paragraphs, a paragraph an ordered sequence of runs. Nested block
//! structure inside a single top-level element collapses into one paragraph.

use std::path::Path;

use serde::{Deserialize, Serialize};

use lessonforge_shared::{LessonForgeError, Result};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Inline formatting flags for a text run. At most one flag is set by the
/// converter; nested inline formatting is flattened, not composed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleFlags {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub superscript: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub subscript: bool,
}

impl StyleFlags {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }

    pub fn superscript() -> Self {
        Self {
            superscript: true,
            ..Self::default()
        }
    }

    pub fn subscript() -> Self {
        Self {
            subscript: true,
            ..Self::default()
        }
    }
}

/// One inline run within a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Run {
    /// Styled text.
    Text {
        content: String,
        #[serde(default)]
        style: StyleFlags,
    },
    /// An embedded image with its physical print size in inches.
    Image {
        data: Vec<u8>,
        width_in: f64,
        height_in: f64,
    },
    /// Transcribed mathematical notation.
    Math { notation: String },
}

impl Run {
    /// Plain unstyled text run.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
            style: StyleFlags::default(),
        }
    }

    /// Styled text run.
    pub fn styled(content: impl Into<String>, style: StyleFlags) -> Self {
        Self::Text {
            content: content.into(),
            style,
        }
    }
}

/// Ordered sequence of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

/// The converted lesson document: a title heading plus flat paragraphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Serializes a document model to durable storage.
pub trait DocumentWriter: Send + Sync {
    fn write(&self, doc: &Document, path: &Path) -> Result<()>;
}

/// Writes the document model as pretty-printed JSON.
///
/// The artifact goes through a `.part` temp file and a rename, so an abrupt
/// termination never leaves a partial document under the final name.
pub struct JsonDocumentWriter;

impl DocumentWriter for JsonDocumentWriter {
    fn write(&self, doc: &Document, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LessonForgeError::io(parent, e))?;
            }
        }

        let json = serde_json::to_vec_pretty(doc)
            .map_err(|e| LessonForgeError::Conversion(format!("serialize document: {e}")))?;

        let tmp = path.with_extension("part");
        std::fs::write(&tmp, &json).map_err(|e| LessonForgeError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| LessonForgeError::io(path, e))?;
        Ok(())
    }
}
