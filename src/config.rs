//! Naming conventions and tuning knobs for graph builds.
//!
//! Every field has a default matching the conventions documents are authored against, so an
//! empty TOML table (or [`GraphConfig::default`]) is a complete configuration:
//!
//! ```toml
//! id_attribute = "Guid"
//! ref_suffix = "Ref"
//! ref_id_attribute = "RefId"
//! ref_direction_attribute = "RefDirection"
//! in_direction = "in"
//! out_direction = "out"
//! extensions = ["xml"]
//! include_hidden = false
//! debounce_ms = 500
//! # parallel_threshold = 8
//! ```

use crate::error::GraphCacheError;
use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::Path,
    time::Duration,
};

pub const DEFAULT_ID_ATTRIBUTE: &str = "Guid";
pub const DEFAULT_REF_SUFFIX: &str = "Ref";
pub const DEFAULT_REF_ID_ATTRIBUTE: &str = "RefId";
pub const DEFAULT_REF_DIRECTION_ATTRIBUTE: &str = "RefDirection";
pub const DEFAULT_IN_DIRECTION: &str = "in";
pub const DEFAULT_OUT_DIRECTION: &str = "out";
pub const DEFAULT_EXTENSION: &str = "xml";
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Attribute marking an element as a graph entity. Its value is the entity id.
    pub id_attribute: String,
    /// Child elements whose local name ends with this suffix declare references.
    pub ref_suffix: String,
    /// Attribute on a reference element holding the target id.
    pub ref_id_attribute: String,
    /// Attribute on a reference element holding the direction literal.
    pub ref_direction_attribute: String,
    pub in_direction: String,
    pub out_direction: String,
    /// File extensions (without the dot) that are traversed and watched.
    pub extensions: Vec<String>,
    /// Descend into dot-prefixed files and directories.
    pub include_hidden: bool,
    /// Work lists shorter than this run sequentially. `None` uses the rayon pool size.
    pub parallel_threshold: Option<usize>,
    pub debounce_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            ref_suffix: DEFAULT_REF_SUFFIX.to_string(),
            ref_id_attribute: DEFAULT_REF_ID_ATTRIBUTE.to_string(),
            ref_direction_attribute: DEFAULT_REF_DIRECTION_ATTRIBUTE.to_string(),
            in_direction: DEFAULT_IN_DIRECTION.to_string(),
            out_direction: DEFAULT_OUT_DIRECTION.to_string(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            include_hidden: false,
            parallel_threshold: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl GraphConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GraphCacheError> {
        let config: GraphConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphCacheError> {
        tracing::debug!("Reading graph config from {:?}", path.as_ref());
        let content = read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Rejects conventions that would make extraction ambiguous.
    pub fn validate(&self) -> Result<(), GraphCacheError> {
        let required = [
            ("id_attribute", &self.id_attribute),
            ("ref_suffix", &self.ref_suffix),
            ("ref_id_attribute", &self.ref_id_attribute),
            ("ref_direction_attribute", &self.ref_direction_attribute),
            ("in_direction", &self.in_direction),
            ("out_direction", &self.out_direction),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(GraphCacheError::InvalidInput(format!(
                "config field '{name}' must not be empty"
            )));
        }
        if self.in_direction == self.out_direction {
            return Err(GraphCacheError::InvalidInput(format!(
                "in_direction and out_direction must differ, both are '{}'",
                self.in_direction
            )));
        }
        if self.extensions.is_empty() {
            return Err(GraphCacheError::InvalidInput(
                "at least one file extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of work items at which extraction and resolution switch to the worker pool.
    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
            .unwrap_or_else(rayon::current_num_threads)
            .max(1)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.iter().any(|ce| ce.as_str() == ext))
            .unwrap_or(false)
    }
}
