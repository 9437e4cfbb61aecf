use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagramError>;

/// Problems found while turning a flat span list into a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("invalid trace: expected 1 root span, found {count}")]
    MultipleRoots { count: usize },

    #[error("invalid trace: span {span_id} is its own ancestor")]
    Cycle { span_id: String },
}

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("invalid span data: {0}")]
    Spans(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(#[from] json5::Error),

    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
