//! Recording changes to one document tree as transport-safe records and
//! replaying them onto another tree.
//!
//! Source side: [`Recorder`] (or [`serialize_mutation`] for callers that
//! observe changes themselves). Destination side: [`ReplayEngine`].

mod capture;
mod config;
mod error;
mod recorder;
mod registry;
mod replay;
mod snapshot;

pub use capture::{
    Capture, InlineStyleSheets, NoStyleSheets, RawMutation, StyleSheetSource, serialize_mutation,
    snapshot_node, split_rules,
};
pub use html::{compute_path, resolve_path};

pub use config::{CaptureConfig, MirrorConfig, ReplayConfig};
pub use error::{BatchError, ConfigError, ReplayError};
pub use recorder::Recorder;
pub use registry::StyleSheetRegistry;
pub use replay::{Outcome, ReplayEngine, ReplayStats, SVG_TAGS};
pub use snapshot::{
    MutationKind, MutationRecord, NodeKind, NodeSnapshot, StyleRule, StyleSheetSnapshot,
};
