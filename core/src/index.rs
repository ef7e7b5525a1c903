//! Standard-name index.
//!
//! Dimension lists refer to other arguments by standard name. At a call site
//! the dispatcher needs the local name that carries that quantity, so the
//! index maps every standard name to the single local name it is bound to
//! across the resolved schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::CcppMetadata;

/// Standard name → local binding name.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::{SchemaError, StandardNameIndex};
///
/// let mut index = StandardNameIndex::default();
/// index.insert("horizontal_loop_extent", "im").unwrap();
/// index.insert("horizontal_loop_extent", "im").unwrap();
/// assert_eq!(index.resolve("horizontal_loop_extent"), Some("im"));
///
/// let err = index.insert("horizontal_loop_extent", "ix").unwrap_err();
/// assert!(matches!(err, SchemaError::NameConflict { .. }));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StandardNameIndex {
    names: BTreeMap<String, String>,
}

impl StandardNameIndex {
    /// Builds the index from every scheme-routine argument and every module
    /// attribute of `metadata`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NameConflict`] on the first standard name seen
    /// with two different local names.
    pub fn build(metadata: &CcppMetadata) -> Result<Self> {
        let mut index = Self::default();
        for routine in metadata.iterate_routines() {
            for arg in &routine.args {
                index.insert(&arg.standard_name, &arg.name)?;
            }
        }
        for module in metadata.modules() {
            for attr in module.attributes() {
                index.insert(&attr.standard_name, &attr.name)?;
            }
        }
        Ok(index)
    }

    /// Records `standard_name → name`, keeping the first binding.
    pub fn insert(&mut self, standard_name: &str, name: &str) -> Result<()> {
        match self.names.get(standard_name) {
            Some(existing) if existing != name => Err(SchemaError::NameConflict {
                standard_name: standard_name.to_string(),
                first: existing.clone(),
                second: name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.names
                    .insert(standard_name.to_string(), name.to_string());
                Ok(())
            }
        }
    }

    /// Returns the local name bound to `standard_name`.
    pub fn resolve(&self, standard_name: &str) -> Option<&str> {
        self.names.get(standard_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates in standard-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgType, Argument, Intent, Module, ModuleMember, Routine, Scheme};

    fn arg(name: &str, standard_name: &str) -> Argument {
        Argument::new(name, standard_name, ArgType::from("integer"), Intent::In)
    }

    #[test]
    fn test_build_collects_scheme_and_module_names() {
        let scheme = Scheme::with_placeholders(
            "foo",
            Routine::new("foo_run", vec![arg("im", "horizontal_loop_extent")]),
        );
        let module = Module::new(
            "physcons",
            vec![ModuleMember::Attribute(arg("con_g", "gravity").to_attribute())],
        );
        let metadata = CcppMetadata::new(vec![module], vec![scheme], vec![]);

        let index = StandardNameIndex::build(&metadata).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve("horizontal_loop_extent"), Some("im"));
        assert_eq!(index.resolve("gravity"), Some("con_g"));
        assert_eq!(index.resolve("missing"), None);
    }

    #[test]
    fn test_conflict_across_schemes() {
        let a = Scheme::with_placeholders("a", Routine::new("a_run", vec![arg("im", "extent")]));
        let b = Scheme::with_placeholders("b", Routine::new("b_run", vec![arg("ix", "extent")]));
        let metadata = CcppMetadata::new(vec![], vec![a, b], vec![]);

        let err = StandardNameIndex::build(&metadata).unwrap_err();
        assert_eq!(
            err,
            SchemaError::NameConflict {
                standard_name: "extent".to_string(),
                first: "im".to_string(),
                second: "ix".to_string(),
            }
        );
    }

    #[test]
    fn test_serializes_as_map() {
        let mut index = StandardNameIndex::default();
        index.insert("b", "y").unwrap();
        index.insert("a", "x").unwrap();
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"{"a":"x","b":"y"}"#);
    }
}
