//! Directory loading and the resolution pipeline.
//!
//! [`MetadataLoader::load_dir`] reads every metadata file of a directory in
//! sorted filename order, so the same directory always yields the same
//! schema:
//!
//! 1. parse each file into blocks ([`MetadataParser`]),
//! 2. group blocks into schemes, modules and types ([`SchemaBuilder`]),
//! 3. expand derived-type arguments of every routine,
//! 4. drop schemes and types touching ignored types,
//! 5. register each surviving scheme as a module and merge same-named modules,
//! 6. index standard names.
//!
//! Any failure aborts the load.
//!
//! ```no_run
//! use ccpp_schema_meta::load_meta_dir;
//!
//! let schema = load_meta_dir("physics/").unwrap();
//! for scheme in schema.metadata.schemes() {
//!     println!("{}", scheme.name);
//! }
//! ```

use std::path::{Path, PathBuf};

use ccpp_schema_core::{
    CcppMetadata, Module, ModuleEntry, ResolvedSchema, TypeIndex, consolidate_modules,
    expand_scheme,
};
use tracing::{debug, info};

use crate::builder::{BuiltSchema, SchemaBuilder};
use crate::config::ResolverConfig;
use crate::error::{MetaError, Result};
use crate::parser::MetadataParser;

/// Loads metadata files into a [`ResolvedSchema`].
#[derive(Debug, Clone, Default)]
pub struct MetadataLoader {
    config: ResolverConfig,
}

impl MetadataLoader {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Loads and resolves every file with the configured extension in `dir`.
    ///
    /// Subdirectories are not descended into.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Io`] if the directory or a file cannot be read,
    /// [`MetaError::Parse`] for malformed blocks, and [`MetaError::Schema`]
    /// if the entries do not resolve.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<ResolvedSchema> {
        let dir = dir.as_ref();
        let files = self.list_files(dir)?;
        info!(dir = %dir.display(), files = files.len(), "Loading metadata directory");
        self.load_files(&files)
    }

    /// Loads and resolves a single metadata file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ResolvedSchema> {
        self.load_files(&[path.as_ref().to_path_buf()])
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|err| MetaError::io(dir, err))? {
            let path = entry.map_err(|err| MetaError::io(dir, err))?.path();
            if path.is_file() && self.config.matches_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn load_files(&self, files: &[PathBuf]) -> Result<ResolvedSchema> {
        let parser = MetadataParser::new(self.config.header_marker.clone());
        let mut builder = SchemaBuilder::new(self.config.allow_routine_override);

        for path in files {
            let entries = parser.parse_file(path)?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(file = %filename, entries = entries.len(), "Parsed metadata file");
            builder.add_entries(entries, &filename)?;
        }

        self.resolve(builder.finish()?)
    }

    fn resolve(&self, built: BuiltSchema) -> Result<ResolvedSchema> {
        let index = TypeIndex::new(&built.types);
        let expanded = built
            .schemes
            .iter()
            .map(|scheme| expand_scheme(scheme, &index))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let filter = self.config.ignore_filter();
        let schemes = filter.filter_schemes(expanded);
        let types = filter.filter_types(built.types);

        let entries = built
            .modules
            .into_iter()
            .chain(schemes.iter().map(Module::from_scheme))
            .map(ModuleEntry::from);
        let modules = consolidate_modules(entries, &filter)?;

        info!(
            schemes = schemes.len(),
            modules = modules.len(),
            types = types.len(),
            "Resolved metadata"
        );
        let schema = ResolvedSchema::new(CcppMetadata::new(modules, schemes, types))?;
        Ok(schema)
    }
}

/// Loads `dir` with the default [`ResolverConfig`].
pub fn load_meta_dir(dir: impl AsRef<Path>) -> Result<ResolvedSchema> {
    MetadataLoader::default().load_dir(dir)
}
