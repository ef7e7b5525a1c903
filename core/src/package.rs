use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{CcppMetadata, StandardNameIndex};

/// A resolved schema together with its standard-name index.
///
/// This is what a metadata load produces and what the runtime dispatcher
/// consumes. Both halves are immutable after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSchema {
    pub metadata: CcppMetadata,
    pub names: StandardNameIndex,
}

impl ResolvedSchema {
    /// Indexes `metadata` and wraps both.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NameConflict`](crate::SchemaError::NameConflict)
    /// if a standard name is bound to two local names.
    pub fn new(metadata: CcppMetadata) -> Result<Self> {
        let names = StandardNameIndex::build(&metadata)?;
        Ok(Self { metadata, names })
    }
}

/// Serializable bundle handed to the code generator.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::*;
///
/// let artifact = SchemaArtifact::new(CcppMetadata::default(), "2024-01-15T10:30:00Z");
/// assert_eq!(artifact.schema_version.as_deref(), Some(SCHEMA_CONTRACT_VERSION));
/// assert_eq!(artifact.scheme_count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaArtifact {
    /// Contract version (populated from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// ISO-8601 creation timestamp.
    pub generated_at: String,
    /// SHA-256 of the canonical metadata JSON, if computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub metadata: CcppMetadata,
}

impl SchemaArtifact {
    pub fn new(metadata: CcppMetadata, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::SCHEMA_CONTRACT_VERSION.to_string()),
            generated_at: generated_at.into(),
            fingerprint: None,
            metadata,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn scheme_count(&self) -> usize {
        self.metadata.schemes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgType, Argument, Intent, Routine, Scheme, SchemaError};

    fn scheme(name: &str, arg: &str, standard_name: &str) -> Scheme {
        let run = Routine::new(
            &format!("{name}_run"),
            vec![Argument::new(arg, standard_name, ArgType::from("real"), Intent::In)],
        );
        Scheme::with_placeholders(name, run)
    }

    #[test]
    fn test_resolved_schema_indexes_names() {
        let metadata = CcppMetadata::new(vec![], vec![scheme("foo", "t", "air_temperature")], vec![]);
        let resolved = ResolvedSchema::new(metadata).unwrap();
        assert_eq!(resolved.names.resolve("air_temperature"), Some("t"));
    }

    #[test]
    fn test_resolved_schema_rejects_conflicts() {
        let metadata = CcppMetadata::new(
            vec![],
            vec![
                scheme("foo", "t", "air_temperature"),
                scheme("bar", "temp", "air_temperature"),
            ],
            vec![],
        );
        assert!(matches!(
            ResolvedSchema::new(metadata),
            Err(SchemaError::NameConflict { .. })
        ));
    }

    #[test]
    fn test_artifact_json_roundtrip() {
        let metadata = CcppMetadata::new(vec![], vec![scheme("foo", "t", "air_temperature")], vec![]);
        let artifact = SchemaArtifact::new(metadata, "2024-01-15T10:30:00Z").with_fingerprint("abc123");

        let json = serde_json::to_string(&artifact).unwrap();
        let back: SchemaArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
        assert_eq!(back.scheme_count(), 1);
        assert_eq!(back.fingerprint.as_deref(), Some("abc123"));
    }
}
