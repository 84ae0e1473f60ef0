use html::DomError;
use thiserror::Error;

use crate::snapshot::NodeKind;

/// A record that cannot be applied. Target-not-found is not an error; such
/// records are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("mutation has no target")]
    MissingTarget,
    #[error("mutation target has no path")]
    MissingTargetPath,
    #[error("attribute mutation on {path} has no attribute name")]
    MissingAttributeName { path: String },
    #[error("attribute mutation on {path} carries no attribute map")]
    MissingAttributes { path: String },
    #[error("added element {path} has no tag name")]
    MissingTagName { path: String },
    #[error("added node {path} has unsupported kind {kind:?}")]
    UnsupportedNodeKind { path: String, kind: NodeKind },
    #[error("unknown mutation kind")]
    UnknownMutationKind,
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// First failing record of a batch. Records before `index` stay applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mutation #{index} failed: {source}")]
pub struct BatchError {
    pub index: usize,
    #[source]
    pub source: ReplayError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
