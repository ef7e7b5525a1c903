//! Grouping of parsed entries into schemes, modules and derived types.

use std::collections::BTreeMap;

use ccpp_schema_core::{
    DerivedDataType, Module, ModuleMember, Routine, RoutineKind, Scheme, SchemaError,
};
use tracing::warn;

use crate::parser::{EntryBody, MetaEntry};

/// Schema entries gathered from every file, before expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltSchema {
    /// Sorted by name.
    pub schemes: Vec<Scheme>,
    /// Module blocks in arrival order; scheme modules are registered later.
    pub modules: Vec<Module>,
    /// Sorted by name, identical duplicates collapsed.
    pub types: Vec<DerivedDataType>,
}

#[derive(Debug, Default)]
struct PartialScheme {
    routines: BTreeMap<RoutineKind, Routine>,
}

/// Accumulates entries across the files of one metadata directory.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ccpp_schema_meta::{MetadataParser, SchemaBuilder};
///
/// let text = "[ccpp-arg-table]\n name = foo_run\n type = scheme\n";
/// let entries = MetadataParser::default().parse_str(text, Path::new("foo.meta")).unwrap();
///
/// let mut builder = SchemaBuilder::new(false);
/// builder.add_entries(entries, "foo.meta").unwrap();
/// let built = builder.finish().unwrap();
///
/// assert_eq!(built.schemes[0].name, "foo");
/// assert_eq!(built.schemes[0].init.name, "foo_init");
/// assert_eq!(built.schemes[0].finalize.name, "foo_finalize");
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    allow_override: bool,
    schemes: BTreeMap<String, PartialScheme>,
    modules: Vec<Module>,
    types: Vec<DerivedDataType>,
}

impl SchemaBuilder {
    /// With `allow_override`, a later definition of a scheme routine replaces
    /// an earlier one instead of failing.
    pub fn new(allow_override: bool) -> Self {
        Self {
            allow_override,
            ..Self::default()
        }
    }

    /// Adds the entries parsed from `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownRoutineKind`] for a scheme routine whose
    /// name has no init/run/finalize suffix, [`SchemaError::DuplicateRoutine`]
    /// for a repeated routine (unless overriding is allowed), and
    /// [`SchemaError::ConflictingType`] for two different types of one name.
    pub fn add_entries(
        &mut self,
        entries: impl IntoIterator<Item = MetaEntry>,
        filename: &str,
    ) -> Result<(), SchemaError> {
        for entry in entries {
            match entry.body {
                EntryBody::Scheme(args) => {
                    let routine = Routine::new(&entry.name, args).with_filename(filename);
                    self.add_routine(routine)?;
                }
                EntryBody::Module(attrs) => {
                    let members = attrs.into_iter().map(ModuleMember::Attribute).collect();
                    self.modules.push(Module::new(&entry.name, members));
                }
                EntryBody::Ddt(attrs) => {
                    self.add_type(DerivedDataType::new(&entry.name, attrs))?;
                }
            }
        }
        Ok(())
    }

    fn add_routine(&mut self, routine: Routine) -> Result<(), SchemaError> {
        let (scheme_name, kind) =
            RoutineKind::split(&routine.name).ok_or_else(|| SchemaError::UnknownRoutineKind {
                routine: routine.name.clone(),
            })?;
        let scheme_name = scheme_name.to_string();
        let partial = self.schemes.entry(scheme_name.clone()).or_default();

        if let Some(existing) = partial.routines.get(&kind) {
            let first = existing.filename.clone().unwrap_or_default();
            let second = routine.filename.clone().unwrap_or_default();
            if !self.allow_override {
                return Err(SchemaError::DuplicateRoutine {
                    scheme: scheme_name,
                    kind,
                    first,
                    second,
                });
            }
            warn!(
                scheme = %scheme_name,
                %kind,
                replaced = %first,
                by = %second,
                "Overriding earlier routine definition"
            );
        }
        partial.routines.insert(kind, routine);
        Ok(())
    }

    fn add_type(&mut self, ddt: DerivedDataType) -> Result<(), SchemaError> {
        match self.types.iter().find(|known| known.name == ddt.name) {
            Some(known) if *known == ddt => Ok(()),
            Some(_) => Err(SchemaError::ConflictingType { name: ddt.name }),
            None => {
                self.types.push(ddt);
                Ok(())
            }
        }
    }

    /// Completes every scheme, synthesizing missing init/finalize routines.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingRun`] for a scheme without a run routine.
    pub fn finish(self) -> Result<BuiltSchema, SchemaError> {
        let mut schemes = Vec::with_capacity(self.schemes.len());
        for (name, mut partial) in self.schemes {
            let run = partial
                .routines
                .remove(&RoutineKind::Run)
                .ok_or_else(|| SchemaError::MissingRun {
                    scheme: name.clone(),
                })?;
            let mut complete = |kind: RoutineKind| {
                partial.routines.remove(&kind).unwrap_or_else(|| {
                    let placeholder = Routine::placeholder(&name, kind);
                    match &run.filename {
                        Some(filename) => placeholder.with_filename(filename.clone()),
                        None => placeholder,
                    }
                })
            };
            let init = complete(RoutineKind::Init);
            let finalize = complete(RoutineKind::Finalize);
            schemes.push(Scheme {
                name,
                init,
                run,
                finalize,
            });
        }

        let mut types = self.types;
        types.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(BuiltSchema {
            schemes,
            modules: self.modules,
            types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccpp_schema_core::{ArgType, Argument, Attribute, Intent};

    fn scheme_entry(name: &str, args: Vec<Argument>) -> MetaEntry {
        MetaEntry {
            name: name.to_string(),
            line: 1,
            body: EntryBody::Scheme(args),
        }
    }

    fn attr(name: &str) -> Attribute {
        Argument::new(name, name, ArgType::from("real"), Intent::In).to_attribute()
    }

    #[test]
    fn test_routines_group_across_files() {
        let mut builder = SchemaBuilder::new(false);
        builder
            .add_entries(vec![scheme_entry("foo_init", vec![])], "a.meta")
            .unwrap();
        builder
            .add_entries(vec![scheme_entry("foo_run", vec![])], "b.meta")
            .unwrap();
        let built = builder.finish().unwrap();

        assert_eq!(built.schemes.len(), 1);
        let scheme = &built.schemes[0];
        assert_eq!(scheme.init.filename.as_deref(), Some("a.meta"));
        assert_eq!(scheme.run.filename.as_deref(), Some("b.meta"));
        assert_eq!(scheme.finalize.name, "foo_finalize");
        assert_eq!(scheme.finalize.filename.as_deref(), Some("b.meta"));
    }

    #[test]
    fn test_missing_run_is_an_error() {
        let mut builder = SchemaBuilder::new(false);
        builder
            .add_entries(vec![scheme_entry("foo_init", vec![])], "a.meta")
            .unwrap();
        assert_eq!(
            builder.finish().unwrap_err(),
            SchemaError::MissingRun {
                scheme: "foo".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_routine_kind() {
        let mut builder = SchemaBuilder::new(false);
        let err = builder
            .add_entries(vec![scheme_entry("foo_step", vec![])], "a.meta")
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRoutineKind { .. }));
    }

    #[test]
    fn test_duplicate_run_rejected_by_default() {
        let mut builder = SchemaBuilder::new(false);
        builder
            .add_entries(vec![scheme_entry("foo_run", vec![])], "a.meta")
            .unwrap();
        let err = builder
            .add_entries(vec![scheme_entry("foo_run", vec![])], "b.meta")
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateRoutine {
                scheme: "foo".to_string(),
                kind: RoutineKind::Run,
                first: "a.meta".to_string(),
                second: "b.meta".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_run_overrides_when_allowed() {
        let x = Argument::new("x", "bar", ArgType::from("integer"), Intent::In);
        let mut builder = SchemaBuilder::new(true);
        builder
            .add_entries(vec![scheme_entry("foo_run", vec![])], "a.meta")
            .unwrap();
        builder
            .add_entries(vec![scheme_entry("foo_run", vec![x])], "b.meta")
            .unwrap();
        let built = builder.finish().unwrap();
        assert_eq!(built.schemes[0].run.args.len(), 1);
        assert_eq!(built.schemes[0].run.filename.as_deref(), Some("b.meta"));
    }

    #[test]
    fn test_modules_and_types() {
        let mut builder = SchemaBuilder::new(false);
        let entries = vec![
            MetaEntry {
                name: "physcons".to_string(),
                line: 1,
                body: EntryBody::Module(vec![attr("con_g")]),
            },
            MetaEntry {
                name: "z_type".to_string(),
                line: 10,
                body: EntryBody::Ddt(vec![attr("f")]),
            },
            MetaEntry {
                name: "a_type".to_string(),
                line: 20,
                body: EntryBody::Ddt(vec![]),
            },
        ];
        builder.add_entries(entries, "x.meta").unwrap();
        let built = builder.finish().unwrap();

        assert_eq!(built.modules.len(), 1);
        assert_eq!(built.modules[0].members[0].name(), "con_g");
        let type_names: Vec<_> = built.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(type_names, vec!["a_type", "z_type"]);
    }

    #[test]
    fn test_conflicting_types_rejected() {
        let mut builder = SchemaBuilder::new(false);
        let ddt = |attrs| MetaEntry {
            name: "t".to_string(),
            line: 1,
            body: EntryBody::Ddt(attrs),
        };
        builder.add_entries(vec![ddt(vec![attr("a")])], "a.meta").unwrap();
        builder.add_entries(vec![ddt(vec![attr("a")])], "b.meta").unwrap();
        let err = builder
            .add_entries(vec![ddt(vec![attr("b")])], "c.meta")
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::ConflictingType {
                name: "t".to_string()
            }
        );
    }
}
