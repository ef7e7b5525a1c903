//! Runtime dispatch of resolved CCPP routines.
//!
//! A [`Dispatcher`] binds every routine of a
//! [`ResolvedSchema`](ccpp_schema_core::ResolvedSchema) to an entry point of
//! the compiled physics library and exposes one validated call surface,
//! [`Dispatcher::invoke`]. Arguments are named `ndarray` views; scalars are
//! passed as rank-0 arrays.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ccpp_dispatch::{CallArgs, DispatchConfig, Dispatcher, NativeLibrary};
//! use ndarray::{Array1, arr0};
//!
//! let schema = Arc::new(ccpp_schema_meta::load_meta_dir("physics/").unwrap());
//! let library = NativeLibrary::load("physics/libccpp.so").unwrap();
//! let dispatcher = Dispatcher::new(schema, &library, DispatchConfig::default()).unwrap();
//!
//! let mut im = arr0(4_i64);
//! let mut t = Array1::<f64>::zeros(4);
//! let mut args = CallArgs::new().with("im", &mut im).with("t", &mut t);
//! dispatcher.invoke("sfc_ocean_run", &mut args).unwrap();
//! ```

#![recursion_limit = "256"]

mod dispatcher;
mod error;
mod foreign;
mod scratch;
mod value;

pub use dispatcher::{DEFAULT_SYMBOL_SUFFIX, DispatchConfig, Dispatcher, RoutineHandle};
pub use error::{DispatchError, Result};
pub use foreign::{ArgPointer, ForeignRoutine, MAX_FOREIGN_ARGS, NativeLibrary, RoutineResolver};
pub use scratch::{DEFAULT_ERROR_MESSAGE_LEN, ErrorScratch};
pub use value::{ArrayArg, CallArgs, CallValue, ElementKind};
