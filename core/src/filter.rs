//! Exclusion of entities that reference unsupported types.
//!
//! Some derived types in the physics codebase have field shapes the code
//! generator cannot express, and some intrinsic leaf kinds (fixed-width text,
//! for instance) cannot cross the foreign call boundary. Any scheme, module
//! member or derived type touching one of these is dropped as a whole.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::{Argument, DerivedDataType, Module, ModuleMember, Routine, Scheme};

/// Set of type names whose users are excluded from the resolved schema.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::*;
///
/// let filter = IgnoreFilter::new(["GFS_interstitial_type"]);
/// let run = Routine::new("foo_run", vec![
///     Argument::new("ip", "interstitial", ArgType::from("GFS_interstitial_type"), Intent::InOut),
/// ]);
/// let scheme = Scheme::with_placeholders("foo", run);
///
/// assert!(filter.check_scheme(&scheme).is_err());
/// assert!(filter.filter_schemes(vec![scheme]).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    ignored: BTreeSet<String>,
}

impl IgnoreFilter {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_ignored(&self, type_name: &str) -> bool {
        self.ignored.contains(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.ignored.is_empty()
    }

    /// Checks a routine's declared arguments and the types its expansion traversed.
    ///
    /// The trailing error-reporting arguments are exempt.
    pub fn check_routine(&self, routine: &Routine) -> Result<()> {
        let entity = || format!("routine '{}'", routine.name);
        for arg in routine.declared_internal_args() {
            self.check_arg(arg, entity)?;
        }
        for ddt in &routine.types {
            self.check_name(&ddt.name, entity)?;
        }
        Ok(())
    }

    pub fn check_scheme(&self, scheme: &Scheme) -> Result<()> {
        for routine in scheme.routines() {
            self.check_routine(routine)
                .map_err(|err| match err {
                    SchemaError::UnsupportedType { entity, type_name } => {
                        SchemaError::UnsupportedType {
                            entity: format!("scheme '{}' ({entity})", scheme.name),
                            type_name,
                        }
                    }
                    other => other,
                })?;
        }
        Ok(())
    }

    pub fn check_member(&self, member: &ModuleMember) -> Result<()> {
        match member {
            ModuleMember::Routine(routine) => self.check_routine(routine),
            ModuleMember::Attribute(attr) => {
                self.check_name(attr.arg_type.name(), || format!("attribute '{}'", attr.name))
            }
        }
    }

    pub fn check_type(&self, ddt: &DerivedDataType) -> Result<()> {
        self.check_name(&ddt.name, || format!("derived type '{}'", ddt.name))
    }

    /// Keeps the schemes that pass [`check_scheme`](Self::check_scheme).
    pub fn filter_schemes(&self, schemes: Vec<Scheme>) -> Vec<Scheme> {
        schemes
            .into_iter()
            .filter(|scheme| self.keep(self.check_scheme(scheme)))
            .collect()
    }

    /// Removes the members that fail [`check_member`](Self::check_member).
    pub fn filter_members(&self, members: Vec<ModuleMember>) -> Vec<ModuleMember> {
        members
            .into_iter()
            .filter(|member| self.keep(self.check_member(member)))
            .collect()
    }

    pub fn filter_module(&self, module: Module) -> Module {
        Module {
            members: self.filter_members(module.members),
            name: module.name,
        }
    }

    pub fn filter_types(&self, types: Vec<DerivedDataType>) -> Vec<DerivedDataType> {
        types
            .into_iter()
            .filter(|ddt| self.keep(self.check_type(ddt)))
            .collect()
    }

    fn keep(&self, check: Result<()>) -> bool {
        match check {
            Ok(()) => true,
            Err(err) => {
                debug!(reason = %err, "Excluding entity from resolved schema");
                false
            }
        }
    }

    fn check_arg(&self, arg: &Argument, entity: impl Fn() -> String) -> Result<()> {
        self.check_name(arg.arg_type.name(), entity)
    }

    fn check_name(&self, type_name: &str, entity: impl Fn() -> String) -> Result<()> {
        if self.is_ignored(type_name) {
            return Err(SchemaError::UnsupportedType {
                entity: entity(),
                type_name: type_name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArgType, Intent};

    fn arg(name: &str, type_name: &str) -> Argument {
        Argument::new(name, name, ArgType::from(type_name), Intent::In)
    }

    #[test]
    fn test_error_pair_is_exempt() {
        let filter = IgnoreFilter::new(["character"]);
        let routine = Routine::new(
            "foo_run",
            vec![
                arg("x", "real"),
                Argument::new("errmsg", "ccpp_error_message", ArgType::from("character"), Intent::Out),
                Argument::new("errflg", "ccpp_error_flag", ArgType::from("integer"), Intent::Out),
            ],
        );
        assert!(filter.check_routine(&routine).is_ok());
    }

    #[test]
    fn test_scheme_excluded_when_any_routine_matches() {
        let filter = IgnoreFilter::new(["bad_type"]);
        let mut scheme = Scheme::with_placeholders("foo", Routine::new("foo_run", vec![arg("x", "real")]));
        scheme.finalize = Routine::new("foo_finalize", vec![arg("b", "bad_type")]);

        let err = filter.check_scheme(&scheme).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedType {
                entity: "scheme 'foo' (routine 'foo_finalize')".to_string(),
                type_name: "bad_type".to_string(),
            }
        );
    }

    #[test]
    fn test_traversed_types_are_checked() {
        let filter = IgnoreFilter::new(["inner_type"]);
        let mut routine = Routine::new("foo_run", vec![arg("x", "outer_type")]);
        routine.types.push(DerivedDataType::new("inner_type", vec![]));
        assert!(filter.check_routine(&routine).is_err());
    }

    #[test]
    fn test_module_members_filtered_individually() {
        let filter = IgnoreFilter::new(["bad_type"]);
        let module = Module::new(
            "physcons",
            vec![
                ModuleMember::Attribute(arg("con_g", "real").to_attribute()),
                ModuleMember::Attribute(arg("blob", "bad_type").to_attribute()),
            ],
        );
        let filtered = filter.filter_module(module);
        assert_eq!(filtered.members.len(), 1);
        assert_eq!(filtered.members[0].name(), "con_g");
    }

    #[test]
    fn test_types_filtered_by_own_name() {
        let filter = IgnoreFilter::new(["bad_type"]);
        let types = vec![
            DerivedDataType::new("bad_type", vec![]),
            DerivedDataType::new("good_type", vec![]),
        ];
        let kept = filter.filter_types(types);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "good_type");
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = IgnoreFilter::default();
        assert!(filter.is_empty());
        let scheme = Scheme::with_placeholders("foo", Routine::new("foo_run", vec![arg("x", "anything")]));
        assert_eq!(filter.filter_schemes(vec![scheme]).len(), 1);
    }
}
