//! Binding routines to foreign entry points.
//!
//! The compiled physics library exports one wrapper per routine, named
//! `<routine>_cap` by default. Every wrapper takes one pointer per declared
//! argument followed by the error-message buffer and the error flag.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ccpp_schema_core::Routine;
use libloading::Library;
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::scratch::ErrorScratch;

/// Untyped pointer to one argument's storage.
pub type ArgPointer = *mut c_void;

/// Largest number of pointers, error pair included, a native routine can take.
pub const MAX_FOREIGN_ARGS: usize = 128;

/// A callable entry point bound to one routine.
pub trait ForeignRoutine: Send + Sync {
    /// Calls the routine with the marshaled arguments.
    ///
    /// # Safety
    ///
    /// `args` must hold exactly one pointer per declared argument, in
    /// declaration order, each pointing at live storage of the element type
    /// and extent the routine expects.
    unsafe fn invoke(&self, args: &[ArgPointer], scratch: &mut ErrorScratch) -> Result<()>;
}

impl<F> ForeignRoutine for F
where
    F: Fn(&[ArgPointer], &mut ErrorScratch) + Send + Sync,
{
    unsafe fn invoke(&self, args: &[ArgPointer], scratch: &mut ErrorScratch) -> Result<()> {
        self(args, scratch);
        Ok(())
    }
}

/// Looks up the entry point for a routine.
pub trait RoutineResolver {
    /// Binds `routine` to the entry point exported as `symbol`.
    fn resolve(&self, routine: &Routine, symbol: &str) -> Result<Arc<dyn ForeignRoutine>>;
}

type RawFn = unsafe extern "C" fn();

/// A loaded physics library.
#[derive(Debug)]
pub struct NativeLibrary {
    library: Arc<Library>,
    path: PathBuf,
}

impl NativeLibrary {
    /// Loads the shared library at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Library`] if the library cannot be opened.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // SAFETY: library initialisers run here; the physics library is trusted.
        let library = unsafe { Library::new(path) }.map_err(|source| DispatchError::Library {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded physics library");
        Ok(Self {
            library: Arc::new(library),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RoutineResolver for NativeLibrary {
    fn resolve(&self, routine: &Routine, symbol: &str) -> Result<Arc<dyn ForeignRoutine>> {
        // SAFETY: the symbol is only called through `NativeRoutine::invoke`,
        // which passes it pointer arguments matching the wrapper convention.
        let func = unsafe { self.library.get::<RawFn>(symbol.as_bytes()) }
            .map(|sym| *sym)
            .map_err(|err| DispatchError::MissingSymbol {
                symbol: symbol.to_string(),
                reason: err.to_string(),
            })?;
        debug!(routine = %routine.name, %symbol, "Bound native routine");
        Ok(Arc::new(NativeRoutine {
            symbol: symbol.to_string(),
            func,
            _library: Arc::clone(&self.library),
        }))
    }
}

struct NativeRoutine {
    symbol: String,
    func: RawFn,
    _library: Arc<Library>,
}

impl fmt::Debug for NativeRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRoutine")
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

// Expands to an if/else chain over the pointer count. Each branch casts the
// raw symbol to an `extern "C"` function of that many pointer parameters.
macro_rules! call_native {
    (@ptr $i:tt) => { ArgPointer };
    (@call $func:ident, $args:ident; $($i:tt)*) => {{
        let typed = std::mem::transmute::<RawFn, unsafe extern "C" fn($(call_native!(@ptr $i)),*)>($func);
        typed($($args[$i]),*);
    }};
    ($func:ident, $args:ident; [$($i:tt)*] [$n:tt]) => {
        if $args.len() == $n {
            call_native!(@call $func, $args; $($i)*)
        } else {
            unreachable!("pointer count checked against MAX_FOREIGN_ARGS")
        }
    };
    ($func:ident, $args:ident; [$($i:tt)*] [$n:tt $($rest:tt)+]) => {
        if $args.len() == $n {
            call_native!(@call $func, $args; $($i)*)
        } else {
            call_native!($func, $args; [$($i)* $n] [$($rest)+])
        }
    };
}

impl ForeignRoutine for NativeRoutine {
    unsafe fn invoke(&self, args: &[ArgPointer], scratch: &mut ErrorScratch) -> Result<()> {
        let count = args.len() + 2;
        if count > MAX_FOREIGN_ARGS {
            return Err(DispatchError::TooManyArguments {
                symbol: self.symbol.clone(),
                count,
                max: MAX_FOREIGN_ARGS,
            });
        }

        let mut pointers: Vec<ArgPointer> = Vec::with_capacity(count);
        pointers.extend_from_slice(args);
        pointers.push(scratch.message_ptr().cast());
        pointers.push(scratch.flag_ptr().cast());

        let func = self.func;
        // SAFETY: the caller guarantees `args`; the error pair points into
        // `scratch`, which outlives the call.
        unsafe {
            call_native!(func, pointers; [0 1] [
                2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17
                18 19 20 21 22 23 24 25 26 27 28 29 30 31 32 33
                34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49
                50 51 52 53 54 55 56 57 58 59 60 61 62 63 64 65
                66 67 68 69 70 71 72 73 74 75 76 77 78 79 80 81
                82 83 84 85 86 87 88 89 90 91 92 93 94 95 96 97
                98 99 100 101 102 103 104 105 106 107 108 109 110 111 112 113
                114 115 116 117 118 119 120 121 122 123 124 125 126 127 128
            ]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_routine_receives_pointers() {
        let routine = |args: &[ArgPointer], scratch: &mut ErrorScratch| {
            // SAFETY: the test passes one pointer to a live f64.
            unsafe { *(args[0] as *mut f64) += 1.0 };
            scratch.report(0, "");
        };
        let mut value = 1.0_f64;
        let pointer: ArgPointer = (&mut value as *mut f64).cast();
        let mut scratch = ErrorScratch::default();

        unsafe { routine.invoke(&[pointer], &mut scratch) }.unwrap();
        assert_eq!(value, 2.0);
        assert!(scratch.check("bump_run").is_ok());
    }

    #[test]
    fn test_missing_library_reports_path() {
        let err = NativeLibrary::load("/nonexistent/libccpp.so").unwrap_err();
        assert!(matches!(err, DispatchError::Library { .. }));
        assert!(err.to_string().contains("/nonexistent/libccpp.so"));
    }
}
