//! Reading CCPP metadata files into a resolved schema.
//!
//! A metadata directory holds one or more files of `[ccpp-arg-table]`
//! blocks. Each block declares a scheme routine, a module or a derived data
//! type together with its arguments or fields. [`MetadataLoader`] reads a
//! directory, runs the resolution passes from [`ccpp_schema_core`], and
//! returns a [`ResolvedSchema`](ccpp_schema_core::ResolvedSchema).
//!
//! # Example
//!
//! ```
//! use ccpp_schema_meta::{MetadataLoader, ResolverConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(
//!     dir.path().join("foo.meta"),
//!     "[ccpp-arg-table]\n  name = foo_run\n  type = scheme\n",
//! )
//! .unwrap();
//!
//! let schema = MetadataLoader::new(ResolverConfig::default())
//!     .load_dir(dir.path())
//!     .unwrap();
//! let foo = schema.metadata.find_scheme("foo").unwrap();
//! assert_eq!(foo.init.name, "foo_init");
//! assert_eq!(foo.run.filename.as_deref(), Some("foo.meta"));
//! ```

mod builder;
mod config;
mod error;
mod fingerprint;
mod loader;
mod parser;

pub use builder::{BuiltSchema, SchemaBuilder};
pub use config::{DEFAULT_EXTENSION, DEFAULT_HEADER_MARKER, ResolverConfig};
pub use error::{MetaError, Result};
pub use fingerprint::fingerprint;
pub use loader::{MetadataLoader, load_meta_dir};
pub use parser::{EntryBody, EntryKind, MetaEntry, MetadataParser};
