//! Cell formatter
//!
//! Renders one [`CellInput`] into displayable markdown text: a kind-specific
//! header followed by a body. Parsing of structured payloads happens in an
//! explicit step ([`ParsedCell::parse`]) with a per-kind leniency policy:
//!
//! | Kind | Payload | On malformed JSON |
//! |---|---|---|
//! | `tool_definition` | JSON array of tool schemas | error |
//! | `assistant` | `{text, tool_calls}` | empty text, no tool calls |
//! | `tool_output` | any JSON | raw text |
//! | everything else | plain text | n/a |

use crate::cell::{CellInput, CellKind};
use serde::Deserialize;
use serde_json::{json, Value};

/// Header for system prompt cells
pub const SYSTEM_HEADER: &str = "[SYSTEM]\n----\n";
/// Header for tool definition cells
pub const TOOLS_HEADER: &str = "[TOOLS]\n----\n";
/// Separator placed between assistant text and its tool calls
pub const TOOL_USE_SEPARATOR: &str = "\n\n[tool_use]\n";

/// Assistant payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistantTurn {
    /// Visible reply text
    #[serde(default)]
    pub text: Option<String>,
    /// Tool invocations, passed through untouched
    #[serde(default)]
    pub tool_calls: Option<Vec<Value>>,
}

impl AssistantTurn {
    /// Parse leniently; anything that is not the expected object yields an empty turn
    #[must_use]
    pub fn parse_lenient(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_default()
    }

    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    fn tool_calls(&self) -> &[Value] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// Cell payload after the parse step
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCell<'a> {
    /// Plain text body
    Text(&'a str),
    /// Tool schemas (strict)
    Tools(Vec<Value>),
    /// Assistant reply (lenient)
    Assistant(AssistantTurn),
    /// Tool output that parsed as JSON
    JsonOutput(Value),
    /// Tool output kept as raw text
    RawOutput(&'a str),
}

impl<'a> ParsedCell<'a> {
    /// Parse a cell's payload according to its kind
    ///
    /// # Errors
    /// Returns the JSON error only for `tool_definition` cells whose content
    /// is not a JSON array.
    pub fn parse(cell: &'a CellInput) -> Result<Self, serde_json::Error> {
        let content = cell.content.as_str();
        let parsed = match cell.cell_type {
            CellKind::ToolDefinition => ParsedCell::Tools(serde_json::from_str(content)?),
            CellKind::Assistant => ParsedCell::Assistant(AssistantTurn::parse_lenient(content)),
            CellKind::ToolOutput => match serde_json::from_str::<Value>(content) {
                Ok(value) => ParsedCell::JsonOutput(value),
                Err(_) => ParsedCell::RawOutput(content),
            },
            _ => ParsedCell::Text(content),
        };
        Ok(parsed)
    }

    /// Render the body (without header)
    ///
    /// # Errors
    /// Propagates JSON serialization failures.
    pub fn body(&self) -> Result<String, serde_json::Error> {
        match self {
            ParsedCell::Text(text) | ParsedCell::RawOutput(text) => Ok((*text).to_string()),
            ParsedCell::Tools(tools) => {
                let wrapped: Vec<Value> = tools
                    .iter()
                    .map(|tool| json!({ "type": "function", "function": tool }))
                    .collect();
                json_block(&Value::Array(wrapped))
            }
            ParsedCell::Assistant(turn) => {
                let mut body = turn.text().to_string();
                if !turn.tool_calls().is_empty() {
                    body.push_str(TOOL_USE_SEPARATOR);
                    body.push_str(&json_block(&json!({ "tool_use": turn.tool_calls() }))?);
                }
                Ok(body)
            }
            ParsedCell::JsonOutput(value) => json_block(value),
        }
    }
}

/// Header text for a cell kind
#[must_use]
pub fn header(kind: &CellKind) -> String {
    match kind {
        CellKind::SystemPrompt => SYSTEM_HEADER.to_string(),
        CellKind::ToolDefinition => TOOLS_HEADER.to_string(),
        reasoning if reasoning.is_reasoning() => {
            format!("**[{}]**\n\n", reasoning.as_str().to_uppercase())
        }
        other => format!("[{}]\n", other.as_str().to_uppercase()),
    }
}

/// Pretty-printed JSON fenced as a markdown code block
fn json_block(value: &Value) -> Result<String, serde_json::Error> {
    Ok(format!("```json\n{}\n```", serde_json::to_string_pretty(value)?))
}

/// Stateless cell renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct CellFormatter;

impl CellFormatter {
    /// Create new formatter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render a cell as `header + body`
    ///
    /// # Errors
    /// Fails only for `tool_definition` cells with unparseable content.
    pub fn render(&self, cell: &CellInput) -> Result<String, serde_json::Error> {
        let parsed = ParsedCell::parse(cell)?;
        let mut text = header(&cell.cell_type);
        text.push_str(&parsed.body()?);
        Ok(text)
    }

    /// Render a cell and split it into source lines
    ///
    /// # Errors
    /// See [`CellFormatter::render`].
    pub fn render_lines(&self, cell: &CellInput) -> Result<Vec<String>, serde_json::Error> {
        self.render(cell).map(|text| split_lines_keep_ends(&text))
    }
}

/// Split text into lines, keeping each line's terminator
///
/// Line boundaries: `\n`, `\r`, `\r\n`, vertical tab, form feed, the
/// file/group/record separators, NEL and the Unicode line/paragraph
/// separators. Empty input yields no lines.
#[must_use]
pub fn split_lines_keep_ends(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let end = match ch {
            '\r' => match chars.peek() {
                Some(&(next, '\n')) => {
                    chars.next();
                    next + 1
                }
                _ => idx + 1,
            },
            '\n' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}'
            | '\u{2029}' => idx + ch.len_utf8(),
            _ => continue,
        };
        lines.push(text[start..end].to_string());
        start = end;
    }

    if start < text.len() {
        lines.push(text[start..].to_string());
    }
    lines
}
