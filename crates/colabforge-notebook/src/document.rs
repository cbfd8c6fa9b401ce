//! Notebook document schema
//!
//! Field order is part of the contract: serialized documents must stay
//! byte-stable across releases.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Notebook format major version
pub const NBFORMAT: u32 = 4;
/// Notebook format minor version
pub const NBFORMAT_MINOR: u32 = 0;
/// Every compiled unit is a markdown cell
pub const MARKDOWN: &str = "markdown";

/// Root of a compiled notebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookDocument {
    pub nbformat: u32,
    pub nbformat_minor: u32,
    pub metadata: Map<String, Value>,
    pub cells: Vec<NotebookCell>,
}

impl NotebookDocument {
    /// Empty document with the standard header
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
            metadata: Map::new(),
            cells: Vec::new(),
        }
    }

    /// Serialize as two-space indented JSON
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a serialized document
    ///
    /// # Errors
    /// Fails if `json` does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for NotebookDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// One markdown unit of a notebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookCell {
    pub cell_type: String,
    pub metadata: CellMetadata,
    pub source: Vec<String>,
}

impl NotebookCell {
    /// Markdown cell with the given metadata and source lines
    #[must_use]
    pub fn markdown(metadata: CellMetadata, source: Vec<String>) -> Self {
        Self {
            cell_type: MARKDOWN.to_string(),
            metadata,
            source,
        }
    }

    /// Source lines joined back into one string
    #[must_use]
    pub fn text(&self) -> String {
        self.source.concat()
    }
}

/// Per-cell metadata; empty (`{}`) for the placeholder cell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMetadata {
    /// Original transcript cell kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colab_cell_type: Option<String>,
}

impl CellMetadata {
    /// Metadata tagged with the original cell kind
    #[inline]
    #[must_use]
    pub fn tagged(kind: impl Into<String>) -> Self {
        Self {
            colab_cell_type: Some(kind.into()),
        }
    }
}
