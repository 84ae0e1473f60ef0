//! Knobs for capture and replay, loadable from TOML:
//!
//! ```toml
//! [replay]
//! reconcile_duplicates = true
//! body_replaces_existing = true
//! relative_removal_prefix = "/html"
//!
//! [capture]
//! capture_style_sheets = true
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    /// After inserting an added node, drop a node that already sat at the
    /// added node's path when it is equal to the new one.
    pub reconcile_duplicates: bool,
    /// An added `body` always replaces the node previously at its path.
    pub body_replaces_existing: bool,
    /// Removed-node paths starting with this prefix are never retried
    /// relative to the target.
    pub relative_removal_prefix: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            reconcile_duplicates: true,
            body_replaces_existing: true,
            relative_removal_prefix: "/html".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub capture_style_sheets: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_style_sheets: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    pub replay: ReplayConfig,
    pub capture: CaptureConfig,
}

impl MirrorConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}
