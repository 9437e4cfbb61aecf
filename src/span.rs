use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

const ERROR_TAG: &str = "error";
const HTTP_STATUS_TAG: &str = "http.status_code";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    Client,
    Server,
    Producer,
    Consumer,
    #[default]
    Unknown,
}

impl SpanKind {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "CLIENT" => Self::Client,
            "SERVER" => Self::Server,
            "PRODUCER" => Self::Producer,
            "CONSUMER" => Self::Consumer,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Server => "SERVER",
            Self::Producer => "PRODUCER",
            Self::Consumer => "CONSUMER",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl Serialize for SpanKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SpanKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::from_token).unwrap_or_default())
    }
}

/// What kind of workload emitted a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentType {
    Component,
    System,
    Micro,
    Other(String),
}

impl ComponentType {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "component" => Self::Component,
            "system" => Self::System,
            "micro" => Self::Micro,
            _ => Self::Other(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Component => "Component",
            Self::System => "System",
            Self::Micro => "Micro",
            Self::Other(value) => value,
        }
    }
}

impl Serialize for ComponentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_token(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default)]
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub service_name: String,
    #[serde(default)]
    pub operation_name: String,
    #[serde(default)]
    pub kind: SpanKind,
    /// Microseconds since the epoch.
    #[serde(default)]
    pub start_time: u64,
    /// Microseconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<Cell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    #[serde(default, deserialize_with = "nullable_tags")]
    pub tags: BTreeMap<String, Value>,
}

impl Span {
    pub fn new(span_id: &str, service_name: &str, kind: SpanKind) -> Self {
        Self {
            trace_id: String::new(),
            span_id: span_id.to_string(),
            parent_id: None,
            service_name: service_name.to_string(),
            operation_name: String::new(),
            kind,
            start_time: 0,
            duration: 0,
            cell: None,
            component_type: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn cell_name(&self) -> Option<&str> {
        self.cell
            .as_ref()
            .map(|cell| cell.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn is_system_component(&self) -> bool {
        matches!(self.component_type, Some(ComponentType::System))
    }

    pub fn has_error(&self) -> bool {
        let flagged = match self.tags.get(ERROR_TAG) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
            _ => false,
        };
        if flagged {
            return true;
        }
        let status = match self.tags.get(HTTP_STATUS_TAG) {
            Some(Value::Number(num)) => num.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        status.is_some_and(|code| code >= 500.0)
    }
}

fn nullable_tags<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpanDocument {
    List(Vec<Span>),
    Wrapped { spans: Vec<Span> },
}

/// Accepts either a bare JSON array of spans or `{ "spans": [...] }`.
pub fn parse_spans(input: &str) -> Result<Vec<Span>> {
    let doc: SpanDocument = serde_json::from_str(input)?;
    Ok(match doc {
        SpanDocument::List(spans) => spans,
        SpanDocument::Wrapped { spans } => spans,
    })
}
