//! Error types for runtime dispatch.
//!
//! Every variant aborts only the call that raised it; the dispatcher stays
//! usable afterwards.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while binding or calling a routine.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no routine named '{routine}'")]
    UnknownRoutine { routine: String },

    #[error("{routine}: missing argument '{argument}'")]
    MissingArgument { routine: String, argument: String },

    #[error("{routine}: unexpected argument '{argument}'")]
    UnexpectedArgument { routine: String, argument: String },

    /// Only array values cross the call boundary; scalars are rank-0 arrays.
    #[error("value for {argument} must be an array, got {value_type}")]
    UnsupportedValue {
        argument: String,
        value_type: &'static str,
    },

    /// The declared type has no runtime representation.
    #[error("argument {argument} has unsupported type '{type_name}'")]
    UnsupportedType { argument: String, type_name: String },

    #[error("value for {argument} should have {expected} dimensions, but it has {actual}")]
    RankMismatch {
        argument: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "value for {argument} has a length of {actual} along axis {axis} ({dimension}), \
         but a value of {expected} was given for {dimension}"
    )]
    AxisMismatch {
        argument: String,
        axis: usize,
        dimension: String,
        expected: i64,
        actual: usize,
    },

    #[error("dimension {dimension} of {argument} is not bound by any call argument")]
    UnresolvedDimension { argument: String, dimension: String },

    #[error(
        "dimension {dimension} of {argument} is bound to '{binding}', \
         which is not a single-element integer array"
    )]
    InvalidExtent {
        argument: String,
        dimension: String,
        binding: String,
    },

    #[error("value for {argument} is not contiguous in memory")]
    NonContiguous { argument: String },

    #[error("value for {argument} should be of type {expected}, but {actual} was given")]
    TypeMismatch {
        argument: String,
        expected: String,
        actual: &'static str,
    },

    /// The foreign routine reported failure through its error flag.
    #[error("{routine}: {message}")]
    Routine { routine: String, message: String },

    #[error("failed to load library '{}': {source}", path.display())]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol '{symbol}' could not be bound: {reason}")]
    MissingSymbol { symbol: String, reason: String },

    #[error("{symbol} takes {count} arguments, more than the supported {max}")]
    TooManyArguments {
        symbol: String,
        count: usize,
        max: usize,
    },
}

impl DispatchError {
    /// Returns `true` for rank, axis and dimension binding failures.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            DispatchError::RankMismatch { .. }
                | DispatchError::AxisMismatch { .. }
                | DispatchError::UnresolvedDimension { .. }
                | DispatchError::InvalidExtent { .. }
        )
    }
}

/// Convenience alias for results with [`DispatchError`].
pub type Result<T> = std::result::Result<T, DispatchError>;
