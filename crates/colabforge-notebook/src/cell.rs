//! Typed transcript cells
//!
//! A cell is one conversational unit authored by a trainer. Its `content`
//! is opaque text whose shape depends on the [`CellKind`]:
//! - `system_prompt`, `user`, `thinking`, `thought` and unknown kinds carry plain text
//! - `tool_definition` carries a JSON array of tool schemas
//! - `assistant` carries a JSON object `{text, tool_calls}`
//! - `tool_output` carries JSON or free text

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a transcript cell
///
/// Serialized as the lowercase wire name (`"system_prompt"`, `"user"`, ...).
/// Unknown names are preserved verbatim in [`CellKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CellKind {
    /// System prompt framing the conversation
    SystemPrompt,
    /// JSON array of tool schemas offered to the assistant
    ToolDefinition,
    /// Human turn
    User,
    /// Assistant turn, optionally with tool calls
    Assistant,
    /// Result returned by a tool
    ToolOutput,
    /// Reasoning trace (`thinking`)
    Thinking,
    /// Reasoning trace (`thought`)
    Thought,
    /// Any other kind, rendered generically
    Other(String),
}

impl CellKind {
    /// Wire name of this kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            CellKind::SystemPrompt => "system_prompt",
            CellKind::ToolDefinition => "tool_definition",
            CellKind::User => "user",
            CellKind::Assistant => "assistant",
            CellKind::ToolOutput => "tool_output",
            CellKind::Thinking => "thinking",
            CellKind::Thought => "thought",
            CellKind::Other(name) => name,
        }
    }

    /// Whether this kind is a reasoning trace
    #[inline]
    #[must_use]
    pub fn is_reasoning(&self) -> bool {
        matches!(self, CellKind::Thinking | CellKind::Thought)
    }
}

impl From<&str> for CellKind {
    fn from(value: &str) -> Self {
        match value {
            "system_prompt" => CellKind::SystemPrompt,
            "tool_definition" => CellKind::ToolDefinition,
            "user" => CellKind::User,
            "assistant" => CellKind::Assistant,
            "tool_output" => CellKind::ToolOutput,
            "thinking" => CellKind::Thinking,
            "thought" => CellKind::Thought,
            other => CellKind::Other(other.to_string()),
        }
    }
}

impl From<String> for CellKind {
    fn from(value: String) -> Self {
        match CellKind::from(value.as_str()) {
            CellKind::Other(_) => CellKind::Other(value),
            known => known,
        }
    }
}

impl From<CellKind> for String {
    fn from(value: CellKind) -> Self {
        match value {
            CellKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of transcript content as submitted by an editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellInput {
    /// Cell kind
    #[serde(alias = "type")]
    pub cell_type: CellKind,
    /// Raw payload; shape depends on `cell_type`
    pub content: String,
}

impl CellInput {
    /// Create new cell input
    #[inline]
    #[must_use]
    pub fn new(cell_type: impl Into<CellKind>, content: impl Into<String>) -> Self {
        Self {
            cell_type: cell_type.into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_known_names() {
        for name in [
            "system_prompt",
            "tool_definition",
            "user",
            "assistant",
            "tool_output",
            "thinking",
            "thought",
        ] {
            let kind = CellKind::from(name);
            assert!(!matches!(kind, CellKind::Other(_)), "{name} should be known");
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn kind_keeps_unknown_name() {
        let kind = CellKind::from("image_caption".to_string());
        assert_eq!(kind, CellKind::Other("image_caption".to_string()));
        assert_eq!(String::from(kind), "image_caption");
    }

    #[test]
    fn cell_input_accepts_type_alias() {
        let cell: CellInput = serde_json::from_str(r#"{"type":"user","content":"Hello"}"#).unwrap();
        assert_eq!(cell.cell_type, CellKind::User);

        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"cell_type":"user","content":"Hello"}"#);
    }
}
