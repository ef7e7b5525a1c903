//! Error types for schema resolution.

use thiserror::Error;

use crate::RoutineKind;

/// Errors raised while assembling a resolved schema.
///
/// Every variant except [`SchemaError::UnsupportedType`] aborts the metadata
/// load. `UnsupportedType` is reported by the ignore filter and turned into a
/// silent exclusion of the offending entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A scheme declared init and/or finalize but no run routine.
    #[error("scheme '{scheme}' has no run routine")]
    MissingRun { scheme: String },

    /// A scheme routine name does not end in `_init`, `_run` or `_finalize`.
    #[error("routine '{routine}' does not end in _init, _run or _finalize")]
    UnknownRoutineKind { routine: String },

    /// The same routine kind was declared twice for one scheme.
    #[error("scheme '{scheme}' declares its {kind} routine twice ({first} and {second})")]
    DuplicateRoutine {
        scheme: String,
        kind: RoutineKind,
        first: String,
        second: String,
    },

    /// Two derived data types share a name but differ in their fields.
    #[error("derived type '{name}' is declared twice with different fields")]
    ConflictingType { name: String },

    /// Module members were given as a single value instead of a sequence.
    #[error("members of module '{module}' must be a sequence, not a single member")]
    ScalarMembers { module: String },

    /// Derived-type expansion re-entered a type already being expanded.
    #[error("derived type cycle while expanding '{routine}': {path}")]
    Cycle { routine: String, path: String },

    /// One standard name is bound to two different local names.
    #[error("standard name '{standard_name}' is bound to both '{first}' and '{second}'")]
    NameConflict {
        standard_name: String,
        first: String,
        second: String,
    },

    /// An entity references a type that is configured as unsupported.
    #[error("{entity} references unsupported type '{type_name}'")]
    UnsupportedType { entity: String, type_name: String },
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
