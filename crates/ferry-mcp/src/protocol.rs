//! JSON-RPC envelope and tool payload types.
//!
//! Requests carry string ids. Tool hosts in the wild answer with either the
//! string they were given or a number, so inbound ids are kept as raw JSON and
//! normalized with [`JsonRpcResponse::id_key`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method that enumerates the host's tools.
pub const METHOD_LIST_TOOLS: &str = "list_tools";

/// Method that invokes one tool.
pub const METHOD_CALL_TOOL: &str = "call_tool";

/// Category given to sources that arrive without one.
pub const DEFAULT_SOURCE_CATEGORY: &str = "general";

/// Title given to sources that arrive without one.
pub const UNTITLED_SOURCE: &str = "Untitled Source";

// ─────────────────────────────────────────────────────────────────────────────
// JSON-RPC Base Types
// ─────────────────────────────────────────────────────────────────────────────

/// An outbound request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Method name to call.
    pub method: String,
    /// Method parameters. Always an object on the wire, `{}` when empty.
    pub params: Value,
    /// Correlation id.
    pub id: String,
}

impl JsonRpcRequest {
    /// Create a new request. `Null` params are sent as `{}`.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        let params = if params.is_null() {
            Value::Object(Map::new())
        } else {
            params
        };
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// An inbound response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Id of the request this answers. Absent on notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Correlation key for this response, if it carries a usable id.
    pub fn id_key(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get the result, or the error object if this is an error response.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code. Optional because simple hosts only send a message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Primitive type tag of a tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ParamKind {
    /// `{"type": "string"}`
    String,
    /// `{"type": "number"}` (also `"integer"`).
    Number,
    /// `{"type": "boolean"}`
    Boolean,
    /// Anything else, kept as sent.
    Other(Value),
}

impl From<Value> for ParamKind {
    fn from(schema: Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("string") => Self::String,
            Some("number") | Some("integer") => Self::Number,
            Some("boolean") => Self::Boolean,
            _ => Self::Other(schema),
        }
    }
}

impl From<ParamKind> for Value {
    fn from(kind: ParamKind) -> Self {
        match kind {
            ParamKind::String => serde_json::json!({ "type": "string" }),
            ParamKind::Number => serde_json::json!({ "type": "number" }),
            ParamKind::Boolean => serde_json::json!({ "type": "boolean" }),
            ParamKind::Other(raw) => raw,
        }
    }
}

impl ParamKind {
    /// Short name for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Other(_) => "any",
        }
    }

    /// Whether `value` fits this kind. `Other` accepts everything.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Other(_) => true,
        }
    }

    /// Turn raw user input into a JSON value of this kind.
    pub fn coerce(&self, raw: &str) -> Result<Value, String> {
        match self {
            Self::String => Ok(Value::String(raw.to_string())),
            Self::Number => {
                let trimmed = raw.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    return Ok(Value::from(n));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("'{}' is not a number", raw))
            }
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", raw)),
            },
            Self::Other(_) => {
                Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
        }
    }
}

/// A tool the host exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawToolDescriptor")]
pub struct ToolDescriptor {
    /// Tool name, unique within one host.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter name to type tag.
    pub parameters: BTreeMap<String, ParamKind>,
}

impl ToolDescriptor {
    /// Create a descriptor with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.parameters.insert(name.into(), kind);
        self
    }

    /// Type tag of a parameter.
    pub fn param(&self, name: &str) -> Option<&ParamKind> {
        self.parameters.get(name)
    }
}

/// Wire form of a descriptor. `parameters` may be a flat `{name: {type}}`
/// map or a JSON-Schema object with `properties`.
#[derive(Deserialize)]
struct RawToolDescriptor {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "inputSchema", alias = "input_schema")]
    parameters: Option<Value>,
}

impl From<RawToolDescriptor> for ToolDescriptor {
    fn from(raw: RawToolDescriptor) -> Self {
        let mut parameters = BTreeMap::new();
        if let Some(Value::Object(mut map)) = raw.parameters {
            if let Some(Value::Object(props)) = map.remove("properties") {
                map = props;
            }
            for (name, schema) in map {
                parameters.insert(name, ParamKind::from(schema));
            }
        }
        Self {
            name: raw.name,
            description: raw.description.unwrap_or_default(),
            parameters,
        }
    }
}

/// Result of the `list_tools` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Tools in host order.
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

/// Parameters for the `call_tool` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments to pass to the tool.
    pub arguments: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution Results
// ─────────────────────────────────────────────────────────────────────────────

/// One item of a tool's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ContentItem {
    /// `{"type": "text", "text": ...}`
    Text {
        /// The text content.
        text: String,
    },
    /// Any other item, kept as sent.
    Other(Value),
}

impl From<Value> for ContentItem {
    fn from(item: Value) -> Self {
        if item.get("type").and_then(Value::as_str) == Some("text")
            && let Some(text) = item.get("text").and_then(Value::as_str)
        {
            return Self::Text {
                text: text.to_string(),
            };
        }
        Self::Other(item)
    }
}

impl From<ContentItem> for Value {
    fn from(item: ContentItem) -> Self {
        match item {
            ContentItem::Text { text } => serde_json::json!({ "type": "text", "text": text }),
            ContentItem::Other(raw) => raw,
        }
    }
}

/// A citation attached to a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSource")]
pub struct Source {
    /// Title of the cited item.
    pub title: String,
    /// Excerpt body.
    pub content: String,
    /// Category, `"general"` when the host omits it.
    pub category: String,
    /// Relevance as reported by the host, `0` when omitted. Not range-checked.
    pub relevance_score: f64,
}

#[derive(Deserialize)]
struct RawSource {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    relevance_score: Option<f64>,
}

impl From<RawSource> for Source {
    fn from(raw: RawSource) -> Self {
        Self {
            title: raw
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED_SOURCE.to_string()),
            content: raw.content.unwrap_or_default(),
            category: raw
                .category
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE_CATEGORY.to_string()),
            relevance_score: raw.relevance_score.unwrap_or(0.0),
        }
    }
}

/// Result of the `call_tool` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Output items in order.
    #[serde(default)]
    pub content: Vec<ContentItem>,
    /// Citations, empty when the host sent none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<Source>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Source>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Source>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExecutionResult {
    /// Create a result holding a single text item.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text { text: text.into() }],
            sources: Vec::new(),
        }
    }

    /// All text items joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ContentItem::Text { text } => Some(text.as_str()),
                ContentItem::Other(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
