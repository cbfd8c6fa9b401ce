//! Colabforge Notebook - transcript cells to notebook documents
//!
//! Turns an ordered list of typed conversational cells (system prompt, tool
//! definitions, user and assistant turns, tool output, reasoning traces) into
//! a notebook document:
//! - [`CellFormatter`] renders one cell into header + body text
//! - [`DocumentCompiler`] assembles rendered cells into a [`NotebookDocument`]
//!
//! # Example
//!
//! ```rust
//! use colabforge_notebook::{CellInput, DocumentCompiler};
//!
//! let cells = vec![CellInput::new("user", "Hello")];
//! let doc = DocumentCompiler::new().compile("Greeting", &cells).unwrap();
//! assert_eq!(doc.cells[0].source, vec!["[USER]\n", "Hello"]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cell;
pub mod compiler;
pub mod document;
pub mod error;
pub mod format;

pub use cell::{CellInput, CellKind};
pub use compiler::{compile, DocumentCompiler};
pub use document::{CellMetadata, NotebookCell, NotebookDocument};
pub use error::NotebookError;
pub use format::{split_lines_keep_ends, CellFormatter, ParsedCell};
