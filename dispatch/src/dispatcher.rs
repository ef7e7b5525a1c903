//! Validated calls into bound routines.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ccpp_schema_core::{Argument, ResolvedSchema, Routine};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::foreign::{ArgPointer, ForeignRoutine, MAX_FOREIGN_ARGS, RoutineResolver};
use crate::scratch::{DEFAULT_ERROR_MESSAGE_LEN, ErrorScratch};
use crate::value::{ArrayArg, CallArgs, CallValue, ElementKind};

/// Default suffix of the exported wrapper symbols.
pub const DEFAULT_SYMBOL_SUFFIX: &str = "_cap";

/// Dispatcher settings.
///
/// # Examples
///
/// ```
/// use ccpp_dispatch::DispatchConfig;
///
/// let config = DispatchConfig::default();
/// assert_eq!(config.error_message_len, 128);
/// assert_eq!(config.symbol_for("foo_run"), "foo_run_cap");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Capacity of the per-call error-message buffer, in bytes.
    pub error_message_len: usize,
    /// Appended to a routine name to form its exported symbol.
    pub symbol_suffix: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            error_message_len: DEFAULT_ERROR_MESSAGE_LEN,
            symbol_suffix: DEFAULT_SYMBOL_SUFFIX.to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn symbol_for(&self, routine: &str) -> String {
        format!("{routine}{}", self.symbol_suffix)
    }
}

struct RoutineBinding {
    routine: Routine,
    foreign: Arc<dyn ForeignRoutine>,
}

/// Calls resolved routines after checking their arguments against the schema.
///
/// Every routine of every scheme is bound once, at construction. A call
/// checks, in order: argument names, that every value is an array, rank,
/// axis extents against the dimension arguments, and element type. Only then
/// are pointers marshaled and the routine invoked with a fresh
/// [`ErrorScratch`].
pub struct Dispatcher {
    schema: Arc<ResolvedSchema>,
    bindings: BTreeMap<String, RoutineBinding>,
    config: DispatchConfig,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routines", &self.bindings.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Dispatcher {
    /// Binds every routine of `schema` through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error for the first routine that cannot be
    /// bound, or [`DispatchError::TooManyArguments`] for a routine whose
    /// wrapper would exceed [`MAX_FOREIGN_ARGS`].
    pub fn new(
        schema: Arc<ResolvedSchema>,
        resolver: &dyn RoutineResolver,
        config: DispatchConfig,
    ) -> Result<Self> {
        let mut bindings = BTreeMap::new();
        for routine in schema.metadata.iterate_routines() {
            let symbol = config.symbol_for(&routine.name);
            let count = routine.declared_args().count() + 2;
            if count > MAX_FOREIGN_ARGS {
                return Err(DispatchError::TooManyArguments {
                    symbol,
                    count,
                    max: MAX_FOREIGN_ARGS,
                });
            }
            let foreign = resolver.resolve(routine, &symbol)?;
            bindings.insert(
                routine.name.clone(),
                RoutineBinding {
                    routine: routine.clone(),
                    foreign,
                },
            );
        }
        debug!(routines = bindings.len(), "Bound routines");
        Ok(Self {
            schema,
            bindings,
            config,
        })
    }

    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Names of all bound routines, sorted.
    pub fn routines(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Returns a handle for one routine.
    pub fn routine(&self, name: &str) -> Result<RoutineHandle<'_>> {
        let binding = self.binding(name)?;
        Ok(RoutineHandle {
            dispatcher: self,
            binding,
        })
    }

    /// Validates `args` against routine `name` and calls it.
    ///
    /// Array arguments are written back in place.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure without calling the routine, or
    /// [`DispatchError::Routine`] if the routine sets its error flag.
    pub fn invoke(&self, name: &str, args: &mut CallArgs<'_>) -> Result<()> {
        self.call_binding(self.binding(name)?, args)
    }

    fn binding(&self, name: &str) -> Result<&RoutineBinding> {
        self.bindings
            .get(name)
            .ok_or_else(|| DispatchError::UnknownRoutine {
                routine: name.to_string(),
            })
    }

    fn call_binding(&self, binding: &RoutineBinding, args: &mut CallArgs<'_>) -> Result<()> {
        let routine = &binding.routine;
        let declared: Vec<&Argument> = routine.declared_args().collect();

        check_names(routine, &declared, args)?;
        for arg in &declared {
            if let Some(array) = args.get(&arg.name).and_then(CallValue::as_array) {
                self.check_shape(arg, array, args)?;
                check_element(arg, array)?;
            }
        }

        let mut pointers: Vec<ArgPointer> = Vec::with_capacity(declared.len());
        for arg in &declared {
            let pointer = match args.get_mut(&arg.name) {
                Some(CallValue::Array(array)) => array.as_mut_ptr().ok_or_else(|| {
                    DispatchError::NonContiguous {
                        argument: arg.name.clone(),
                    }
                })?,
                _ => std::ptr::null_mut(),
            };
            pointers.push(pointer);
        }

        let mut scratch = ErrorScratch::new(self.config.error_message_len);
        debug!(routine = %routine.name, args = pointers.len(), "Calling routine");
        // SAFETY: each pointer addresses a contiguous array that `args` borrows
        // mutably for this whole call, with the element type and extents the
        // routine declares; absent optional arguments are null.
        unsafe { binding.foreign.invoke(&pointers, &mut scratch)? };
        scratch.check(&routine.name)?;
        debug!(routine = %routine.name, "Completed routine");
        Ok(())
    }

    fn check_shape(&self, arg: &Argument, array: &ArrayArg<'_>, args: &CallArgs<'_>) -> Result<()> {
        let shape = array.shape();
        if shape.len() != arg.rank() {
            return Err(DispatchError::RankMismatch {
                argument: arg.name.clone(),
                expected: arg.rank(),
                actual: shape.len(),
            });
        }

        for (axis, (dimension, &actual)) in arg.dimensions.iter().zip(shape).enumerate() {
            let unresolved = || DispatchError::UnresolvedDimension {
                argument: arg.name.clone(),
                dimension: dimension.clone(),
            };
            let binding = self.schema.names.resolve(dimension).ok_or_else(unresolved)?;
            let value = args.get(binding).ok_or_else(unresolved)?;
            let expected = value
                .as_array()
                .and_then(ArrayArg::as_extent)
                .ok_or_else(|| DispatchError::InvalidExtent {
                    argument: arg.name.clone(),
                    dimension: dimension.clone(),
                    binding: binding.to_string(),
                })?;
            if usize::try_from(expected).ok() != Some(actual) {
                return Err(DispatchError::AxisMismatch {
                    argument: arg.name.clone(),
                    axis,
                    dimension: dimension.clone(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

fn check_names(routine: &Routine, declared: &[&Argument], args: &CallArgs<'_>) -> Result<()> {
    if let Some(extra) = args
        .names()
        .find(|name| !declared.iter().any(|arg| arg.name == *name))
    {
        return Err(DispatchError::UnexpectedArgument {
            routine: routine.name.clone(),
            argument: extra.to_string(),
        });
    }

    for arg in declared {
        match args.get(&arg.name) {
            Some(CallValue::Array(_)) => {}
            Some(other) => {
                return Err(DispatchError::UnsupportedValue {
                    argument: arg.name.clone(),
                    value_type: other.type_name(),
                });
            }
            None if arg.optional => {}
            None => {
                return Err(DispatchError::MissingArgument {
                    routine: routine.name.clone(),
                    argument: arg.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_element(arg: &Argument, array: &ArrayArg<'_>) -> Result<()> {
    let accepted =
        ElementKind::accepted_for(&arg.arg_type).ok_or_else(|| DispatchError::UnsupportedType {
            argument: arg.name.clone(),
            type_name: arg.arg_type.to_string(),
        })?;
    if accepted.contains(&array.kind()) {
        return Ok(());
    }
    Err(DispatchError::TypeMismatch {
        argument: arg.name.clone(),
        expected: arg.arg_type.to_string(),
        actual: array.kind().as_str(),
    })
}

/// A single bound routine.
///
/// Validates and calls exactly like [`Dispatcher::invoke`].
#[derive(Clone, Copy)]
pub struct RoutineHandle<'d> {
    dispatcher: &'d Dispatcher,
    binding: &'d RoutineBinding,
}

impl fmt::Debug for RoutineHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("routine", &self.binding.routine.name)
            .finish()
    }
}

impl<'d> RoutineHandle<'d> {
    pub fn name(&self) -> &'d str {
        &self.binding.routine.name
    }

    /// Arguments a caller supplies, in declaration order.
    pub fn arguments(&self) -> impl Iterator<Item = &'d Argument> + use<'d> {
        self.binding.routine.declared_args()
    }

    pub fn call(&self, args: &mut CallArgs<'_>) -> Result<()> {
        self.dispatcher.call_binding(self.binding, args)
    }
}
