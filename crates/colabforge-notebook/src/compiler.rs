//! Document compiler
//!
//! `compile(title, cells)` is a pure function: identical inputs always yield
//! byte-identical serialized output.

use crate::cell::CellInput;
use crate::document::{CellMetadata, NotebookCell, NotebookDocument};
use crate::error::NotebookError;
use crate::format::CellFormatter;

/// Assembles formatted cells into a notebook document
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCompiler {
    formatter: CellFormatter,
}

impl DocumentCompiler {
    /// Create new compiler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile cells into a document
    ///
    /// With no cells the document holds a single placeholder unit whose
    /// text is `# Task ID: <title>`. Otherwise there is one unit per cell,
    /// in input order, tagged with the original kind.
    ///
    /// # Errors
    /// `NotebookError::MalformedContent` if any `tool_definition` cell does
    /// not parse. The whole compilation is aborted.
    pub fn compile(&self, title: &str, cells: &[CellInput]) -> Result<NotebookDocument, NotebookError> {
        let mut document = NotebookDocument::new();

        if cells.is_empty() {
            document.cells.push(placeholder(title));
            return Ok(document);
        }

        for (cell_index, cell) in cells.iter().enumerate() {
            let source = self
                .formatter
                .render_lines(cell)
                .map_err(|source| NotebookError::MalformedContent {
                    cell_index,
                    cell_type: cell.cell_type.to_string(),
                    source,
                })?;
            document.cells.push(NotebookCell::markdown(
                CellMetadata::tagged(cell.cell_type.as_str()),
                source,
            ));
        }

        tracing::debug!(cells = document.cells.len(), "Compiled notebook document");
        Ok(document)
    }

    /// Compile and serialize in one step
    ///
    /// # Errors
    /// See [`DocumentCompiler::compile`]; serialization failures surface as
    /// `NotebookError::Serialization`.
    pub fn compile_to_string(&self, title: &str, cells: &[CellInput]) -> Result<String, NotebookError> {
        let json = self
            .compile(title, cells)?
            .to_json()
            .map_err(NotebookError::Serialization)?;
        tracing::debug!(bytes = json.len(), "Serialized notebook document");
        Ok(json)
    }
}

fn placeholder(title: &str) -> NotebookCell {
    NotebookCell::markdown(CellMetadata::default(), vec![format!("# Task ID: {title}")])
}

/// Compile with a default [`DocumentCompiler`]
///
/// # Errors
/// See [`DocumentCompiler::compile_to_string`].
pub fn compile(title: &str, cells: &[CellInput]) -> Result<String, NotebookError> {
    DocumentCompiler::new().compile_to_string(title, cells)
}
