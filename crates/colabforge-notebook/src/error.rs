//! Error types for notebook compilation

/// Notebook compilation errors
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    /// A strictly-parsed payload (tool definitions) is not valid JSON of the expected shape
    #[error("malformed {cell_type} content in cell {cell_index}: {source}")]
    MalformedContent {
        /// Zero-based position of the offending cell
        cell_index: usize,
        /// Wire name of the cell kind
        cell_type: String,
        /// Underlying parse failure
        #[source]
        source: serde_json::Error,
    },

    /// The compiled document could not be serialized
    #[error("document serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl NotebookError {
    /// Index of the cell that failed, if any
    #[inline]
    #[must_use]
    pub fn cell_index(&self) -> Option<usize> {
        match self {
            Self::MalformedContent { cell_index, .. } => Some(*cell_index),
            Self::Serialization(_) => None,
        }
    }
}
