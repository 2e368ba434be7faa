use std::path::PathBuf;

use thiserror::Error;

use crate::host::LinkId;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("host graph has no link table")]
    MissingLinkTable,

    #[error("link {0} references a missing node or slot")]
    DanglingLink(LinkId),

    #[error("route endpoints must have finite coordinates")]
    NonFiniteCoordinate,

    #[error("predecessor chain broken at ({x}, {y})")]
    BrokenPredecessorChain { x: f64, y: f64 },

    #[error("failed to serialize routing trace")]
    TraceSerialize(#[from] serde_json::Error),

    #[error("failed to write routing trace to {path}")]
    TraceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
}
