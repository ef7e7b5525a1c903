//! Derived-type expansion.
//!
//! Routines may take whole derived data types as arguments. The code
//! generator and the dispatcher only deal in leaf arguments, so each
//! derived-type argument is replaced in place by the type's fields, each
//! inheriting the replaced argument's intent and optional flag. Fields that
//! are themselves derived types are expanded depth first.
//!
//! # Example
//!
//! ```
//! use ccpp_schema_core::*;
//!
//! let grid = DerivedDataType::new("grid_type", vec![
//!     Argument::new("xlon", "longitude", ArgType::from("real"), Intent::In).to_attribute(),
//!     Argument::new("xlat", "latitude", ArgType::from("real"), Intent::In).to_attribute(),
//! ]);
//! let types = [grid];
//! let index = TypeIndex::new(&types);
//!
//! let routine = Routine::new("foo_run", vec![
//!     Argument::new("grid", "grid_data", ArgType::from("grid_type"), Intent::InOut),
//! ]);
//! let expanded = expand_routine(&routine, &index).unwrap();
//!
//! let names: Vec<_> = expanded.args.iter().map(|a| a.name.as_str()).collect();
//! assert_eq!(names, vec!["xlon", "xlat"]);
//! assert!(expanded.args.iter().all(|a| a.intent == Intent::InOut));
//! assert_eq!(expanded.types.len(), 1);
//! ```

use std::collections::HashMap;

use crate::error::{Result, SchemaError};
use crate::{Argument, DerivedDataType, Routine, Scheme};

/// Lookup of known derived data types by name.
#[derive(Debug, Default)]
pub struct TypeIndex<'a> {
    types: HashMap<&'a str, &'a DerivedDataType>,
}

impl<'a> TypeIndex<'a> {
    /// Indexes `types` by name. Later entries win on duplicate names.
    pub fn new(types: &'a [DerivedDataType]) -> Self {
        Self {
            types: types.iter().map(|ddt| (ddt.name.as_str(), ddt)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a DerivedDataType> {
        self.types.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Expands a routine's declared arguments into leaf arguments.
///
/// The result keeps `internal_args` untouched, replaces `args` with the
/// expanded list and records every traversed type once in `types`.
///
/// # Errors
///
/// Returns [`SchemaError::Cycle`] if a type is reached again while it is
/// still being expanded.
pub fn expand_routine(routine: &Routine, index: &TypeIndex<'_>) -> Result<Routine> {
    let mut expander = Expander {
        routine: &routine.name,
        index,
        path: Vec::new(),
        args: Vec::with_capacity(routine.internal_args.len()),
        types: Vec::new(),
    };
    expander.expand(&routine.internal_args)?;

    Ok(Routine {
        name: routine.name.clone(),
        args: expander.args,
        internal_args: routine.internal_args.clone(),
        types: expander.types,
        filename: routine.filename.clone(),
    })
}

/// Expands all three routines of a scheme.
pub fn expand_scheme(scheme: &Scheme, index: &TypeIndex<'_>) -> Result<Scheme> {
    Ok(Scheme {
        name: scheme.name.clone(),
        init: expand_routine(&scheme.init, index)?,
        run: expand_routine(&scheme.run, index)?,
        finalize: expand_routine(&scheme.finalize, index)?,
    })
}

struct Expander<'r, 'i, 'a> {
    routine: &'r str,
    index: &'i TypeIndex<'a>,
    path: Vec<&'a str>,
    args: Vec<Argument>,
    types: Vec<DerivedDataType>,
}

impl<'a> Expander<'_, '_, 'a> {
    fn expand(&mut self, args: &[Argument]) -> Result<()> {
        for arg in args {
            let ddt = match arg.arg_type.derived_name() {
                Some(name) => self.index.get(name),
                None => None,
            };
            match ddt {
                Some(ddt) => self.expand_type(arg, ddt)?,
                None => self.args.push(arg.clone()),
            }
        }
        Ok(())
    }

    fn expand_type(&mut self, arg: &Argument, ddt: &'a DerivedDataType) -> Result<()> {
        if self.path.contains(&ddt.name.as_str()) {
            let path = self
                .path
                .iter()
                .copied()
                .chain(std::iter::once(ddt.name.as_str()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(SchemaError::Cycle {
                routine: self.routine.to_string(),
                path,
            });
        }

        if !self.types.iter().any(|seen| seen.name == ddt.name) {
            self.types.push(ddt.clone());
        }

        let fields: Vec<Argument> = ddt
            .attrs
            .iter()
            .map(|attr| attr.clone().into_argument(arg.intent, arg.optional))
            .collect();

        self.path.push(&ddt.name);
        let result = self.expand(&fields);
        self.path.pop();
        result
    }
}
