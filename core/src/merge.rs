//! Module consolidation across metadata files.
//!
//! The same module name may be declared in several files (a scheme's module
//! and a hand-declared module of constants, for instance). [`consolidate_modules`]
//! folds them into one module per name.
//!
//! # Example
//!
//! ```
//! use ccpp_schema_core::*;
//!
//! let a = Argument::new("a", "alpha", ArgType::from("real"), Intent::In).to_attribute();
//! let b = Argument::new("b", "beta", ArgType::from("real"), Intent::In).to_attribute();
//!
//! let entries = vec![
//!     ModuleEntry::from(Module::new("m", vec![ModuleMember::Attribute(a.clone())])),
//!     ModuleEntry::from(Module::new("m", vec![ModuleMember::Attribute(b), ModuleMember::Attribute(a)])),
//! ];
//! let modules = consolidate_modules(entries, &IgnoreFilter::default()).unwrap();
//!
//! assert_eq!(modules.len(), 1);
//! let names: Vec<_> = modules[0].members.iter().map(|m| m.name()).collect();
//! assert_eq!(names, vec!["a", "b"]);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::filter::IgnoreFilter;
use crate::{Module, ModuleMember};

/// Members of a module record as supplied by its author.
///
/// Hand-written module records sometimes list a single member where a list
/// was intended; that shape deserializes as [`MemberList::Scalar`] and is
/// rejected during consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberList {
    Sequence(Vec<ModuleMember>),
    Scalar(ModuleMember),
}

/// A module record before consolidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub members: MemberList,
}

impl From<Module> for ModuleEntry {
    fn from(module: Module) -> Self {
        Self {
            name: module.name,
            members: MemberList::Sequence(module.members),
        }
    }
}

/// Groups module entries by name and merges their members.
///
/// Members are concatenated in arrival order, filtered through `filter`,
/// deduplicated by full equality and put in canonical order (routines before
/// attributes, then by name; ties keep arrival order). Modules left without
/// members are dropped. The result is sorted by module name.
///
/// # Errors
///
/// Returns [`SchemaError::ScalarMembers`] if any entry's members are a single
/// member rather than a sequence.
pub fn consolidate_modules(
    entries: impl IntoIterator<Item = ModuleEntry>,
    filter: &IgnoreFilter,
) -> Result<Vec<Module>> {
    let mut grouped: BTreeMap<String, Vec<ModuleMember>> = BTreeMap::new();

    for entry in entries {
        let members = match entry.members {
            MemberList::Sequence(members) => members,
            MemberList::Scalar(_) => {
                return Err(SchemaError::ScalarMembers { module: entry.name });
            }
        };
        grouped.entry(entry.name).or_default().extend(members);
    }

    let mut modules = Vec::with_capacity(grouped.len());
    for (name, members) in grouped {
        let members = canonical_members(filter.filter_members(members));
        if members.is_empty() {
            tracing::debug!(module = %name, "Dropping module with no remaining members");
            continue;
        }
        modules.push(Module { name, members });
    }

    Ok(modules)
}

fn canonical_members(members: Vec<ModuleMember>) -> Vec<ModuleMember> {
    let mut unique: Vec<ModuleMember> = Vec::with_capacity(members.len());
    for member in members {
        if !unique.contains(&member) {
            unique.push(member);
        }
    }
    unique.sort_by(|a, b| {
        a.sort_rank()
            .cmp(&b.sort_rank())
            .then_with(|| a.name().cmp(b.name()))
    });
    unique
}
