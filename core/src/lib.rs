//! Core schema types and resolution passes for CCPP physics metadata.
//!
//! Each compiled physics routine is described by a declarative metadata
//! file. This crate holds the typed model those files resolve into and the
//! passes that shape it:
//!
//! - [`Scheme`]: an init/run/finalize triple of [`Routine`]s.
//! - [`Module`]: a named group of routines and attributes.
//! - [`DerivedDataType`]: a composite record whose fields may be passed as
//!   arguments.
//! - [`CcppMetadata`]: the immutable aggregate handed to consumers.
//!
//! Passes: [`expand_routine`] flattens derived-type arguments into leaves,
//! [`IgnoreFilter`] drops entities touching unsupported types,
//! [`consolidate_modules`] merges same-named modules, and
//! [`StandardNameIndex`] maps canonical names to local binding names.
//!
//! # Example
//!
//! ```
//! use ccpp_schema_core::*;
//!
//! let run = Routine::new("foo_run", vec![
//!     Argument::new("x", "bar", ArgType::from("integer"), Intent::In),
//! ]);
//! let scheme = Scheme::with_placeholders("foo", run);
//! let modules = consolidate_modules(
//!     vec![ModuleEntry::from(Module::from_scheme(&scheme))],
//!     &IgnoreFilter::default(),
//! )
//! .unwrap();
//!
//! let resolved = ResolvedSchema::new(CcppMetadata::new(modules, vec![scheme], vec![])).unwrap();
//! assert_eq!(resolved.names.resolve("bar"), Some("x"));
//! assert_eq!(resolved.metadata.find_routine("foo_init").unwrap().args.len(), 0);
//! ```

mod error;
mod expand;
mod filter;
mod index;
mod merge;
mod package;
mod types;

pub use error::{Result, SchemaError};
pub use expand::{TypeIndex, expand_routine, expand_scheme};
pub use filter::IgnoreFilter;
pub use index::StandardNameIndex;
pub use merge::{MemberList, ModuleEntry, consolidate_modules};
pub use package::{ResolvedSchema, SchemaArtifact};
pub use types::*;
