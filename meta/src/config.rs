//! Resolver configuration.
//!
//! Controls how metadata directories are read and which types are treated
//! as unsupported. Every field has a default, so an empty YAML document is a
//! valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! header_marker: "[ccpp-arg-table]"
//! extension: meta
//! ignored_types:
//!   - GFS_interstitial_type
//!   - character
//! allow_routine_override: false
//! ```

use std::collections::BTreeSet;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ccpp_schema_core::IgnoreFilter;
use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};

/// Block delimiter used by CCPP argument tables.
pub const DEFAULT_HEADER_MARKER: &str = "[ccpp-arg-table]";
/// Extension of metadata files, without the dot.
pub const DEFAULT_EXTENSION: &str = "meta";

/// Settings for [`MetadataLoader`](crate::MetadataLoader).
///
/// # Examples
///
/// ```
/// use ccpp_schema_meta::ResolverConfig;
///
/// let config: ResolverConfig = serde_yaml::from_str("ignored_types: [GFS_data_type]").unwrap();
/// assert_eq!(config.header_marker, "[ccpp-arg-table]");
/// assert!(config.ignore_filter().is_ignored("GFS_data_type"));
/// assert!(!config.allow_routine_override);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Literal marker that starts every block.
    pub header_marker: String,
    /// Extension of the files to read from a directory.
    pub extension: String,
    /// Type names whose users are excluded from the resolved schema.
    pub ignored_types: BTreeSet<String>,
    /// Let a later file replace an earlier definition of the same scheme
    /// routine instead of failing the load.
    pub allow_routine_override: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            header_marker: DEFAULT_HEADER_MARKER.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            ignored_types: BTreeSet::new(),
            allow_routine_override: false,
        }
    }
}

impl ResolverConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Io`] if the file cannot be read, or
    /// [`MetaError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| MetaError::io(path, err))?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|err| MetaError::io(path, err))?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Adds a type name to the ignore list.
    pub fn ignore(mut self, type_name: impl Into<String>) -> Self {
        self.ignored_types.insert(type_name.into());
        self
    }

    pub fn ignore_filter(&self) -> IgnoreFilter {
        IgnoreFilter::new(self.ignored_types.iter().cloned())
    }

    /// Returns `true` if `path` has the configured extension.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }
}
