//! Call-time argument values.
//!
//! Arrays are borrowed mutably for the duration of a call so that `out` and
//! `inout` arguments are written back into the caller's storage.

use std::collections::BTreeMap;
use std::ffi::c_void;
use std::fmt;

use ccpp_schema_core::{ArgType, IntrinsicType};
use ndarray::{Array, ArrayViewMut, ArrayViewMutD, Dimension};

/// Element type of an array argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    F32,
    F64,
    I64,
    Bool,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
            ElementKind::I64 => "i64",
            ElementKind::Bool => "bool",
        }
    }

    /// Element kinds accepted for a declared type.
    ///
    /// Returns `None` when the type cannot be passed at runtime.
    pub fn accepted_for(arg_type: &ArgType) -> Option<&'static [ElementKind]> {
        match arg_type {
            ArgType::Intrinsic(IntrinsicType::Real) => Some(&[ElementKind::F32, ElementKind::F64]),
            ArgType::Intrinsic(IntrinsicType::Integer) => Some(&[ElementKind::I64]),
            ArgType::Intrinsic(IntrinsicType::Logical) => Some(&[ElementKind::Bool]),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutable n-dimensional array view of one supported element type.
#[derive(Debug)]
pub enum ArrayArg<'a> {
    F32(ArrayViewMutD<'a, f32>),
    F64(ArrayViewMutD<'a, f64>),
    I64(ArrayViewMutD<'a, i64>),
    Bool(ArrayViewMutD<'a, bool>),
}

impl ArrayArg<'_> {
    pub fn kind(&self) -> ElementKind {
        match self {
            ArrayArg::F32(_) => ElementKind::F32,
            ArrayArg::F64(_) => ElementKind::F64,
            ArrayArg::I64(_) => ElementKind::I64,
            ArrayArg::Bool(_) => ElementKind::Bool,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            ArrayArg::F32(view) => view.shape(),
            ArrayArg::F64(view) => view.shape(),
            ArrayArg::I64(view) => view.shape(),
            ArrayArg::Bool(view) => view.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Returns `true` if the elements occupy one contiguous block in
    /// row-major or column-major order, starting at the first element.
    ///
    /// Reversed axes and other axis permutations are rejected even when their
    /// memory is dense.
    pub fn is_contiguous(&self) -> bool {
        match self {
            ArrayArg::F32(view) => has_plain_layout(view),
            ArrayArg::F64(view) => has_plain_layout(view),
            ArrayArg::I64(view) => has_plain_layout(view),
            ArrayArg::Bool(view) => has_plain_layout(view),
        }
    }

    /// The value of a single-element integer array, used as an axis extent.
    pub fn as_extent(&self) -> Option<i64> {
        match self {
            ArrayArg::I64(view) if view.len() == 1 => view.iter().next().copied(),
            _ => None,
        }
    }

    /// Pointer to the first element, or `None` if the view is not contiguous.
    pub fn as_mut_ptr(&mut self) -> Option<*mut c_void> {
        if !self.is_contiguous() {
            return None;
        }
        let ptr = match self {
            ArrayArg::F32(view) => view.as_mut_ptr().cast(),
            ArrayArg::F64(view) => view.as_mut_ptr().cast(),
            ArrayArg::I64(view) => view.as_mut_ptr().cast(),
            ArrayArg::Bool(view) => view.as_mut_ptr().cast(),
        };
        Some(ptr)
    }
}

fn has_plain_layout<T>(view: &ArrayViewMutD<'_, T>) -> bool {
    view.is_standard_layout() || view.t().is_standard_layout()
}

/// A value supplied for one routine argument.
///
/// Only [`CallValue::Array`] can be passed to a routine; the other variants
/// exist so that callers get a typed rejection instead of a silent coercion.
#[derive(Debug)]
pub enum CallValue<'a> {
    Array(ArrayArg<'a>),
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl<'a> CallValue<'a> {
    /// Short name of the value's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CallValue::Array(_) => "array",
            CallValue::Float(_) => "float scalar",
            CallValue::Int(_) => "integer scalar",
            CallValue::Bool(_) => "boolean scalar",
            CallValue::Text(_) => "text",
        }
    }

    pub fn as_array(&self) -> Option<&ArrayArg<'a>> {
        match self {
            CallValue::Array(array) => Some(array),
            _ => None,
        }
    }
}

macro_rules! impl_array_conversions {
    ($($elem:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a, D: Dimension> From<ArrayViewMut<'a, $elem, D>> for ArrayArg<'a> {
                fn from(view: ArrayViewMut<'a, $elem, D>) -> Self {
                    ArrayArg::$variant(view.into_dyn())
                }
            }

            impl<'a, D: Dimension> From<ArrayViewMut<'a, $elem, D>> for CallValue<'a> {
                fn from(view: ArrayViewMut<'a, $elem, D>) -> Self {
                    CallValue::Array(view.into())
                }
            }

            impl<'a, D: Dimension> From<&'a mut Array<$elem, D>> for CallValue<'a> {
                fn from(array: &'a mut Array<$elem, D>) -> Self {
                    CallValue::Array(array.view_mut().into())
                }
            }
        )*
    };
}

impl_array_conversions!(f32 => F32, f64 => F64, i64 => I64, bool => Bool);

impl From<f64> for CallValue<'_> {
    fn from(value: f64) -> Self {
        CallValue::Float(value)
    }
}

impl From<i64> for CallValue<'_> {
    fn from(value: i64) -> Self {
        CallValue::Int(value)
    }
}

impl From<bool> for CallValue<'_> {
    fn from(value: bool) -> Self {
        CallValue::Bool(value)
    }
}

impl From<&str> for CallValue<'_> {
    fn from(value: &str) -> Self {
        CallValue::Text(value.to_string())
    }
}

/// Named arguments for one routine call.
///
/// # Examples
///
/// ```
/// use ccpp_dispatch::CallArgs;
/// use ndarray::{Array1, arr0};
///
/// let mut im = arr0(4_i64);
/// let mut t = Array1::<f64>::zeros(4);
/// let args = CallArgs::new().with("im", &mut im).with("t", &mut t);
///
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.get("im").and_then(|v| v.as_array()).and_then(|a| a.as_extent()), Some(4));
/// ```
#[derive(Debug, Default)]
pub struct CallArgs<'a> {
    values: BTreeMap<String, CallValue<'a>>,
}

impl<'a> CallArgs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an argument, returning the value it replaces.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<CallValue<'a>>,
    ) -> Option<CallValue<'a>> {
        self.values.insert(name.into(), value.into())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CallValue<'a>>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CallValue<'a>> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CallValue<'a>> {
        self.values.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, ArrayD, IxDyn, arr0, s};

    #[test]
    fn test_accepted_kinds() {
        assert_eq!(
            ElementKind::accepted_for(&ArgType::from("real")),
            Some(&[ElementKind::F32, ElementKind::F64][..])
        );
        assert_eq!(
            ElementKind::accepted_for(&ArgType::from("integer")),
            Some(&[ElementKind::I64][..])
        );
        assert_eq!(ElementKind::accepted_for(&ArgType::from("character")), None);
        assert_eq!(ElementKind::accepted_for(&ArgType::from("GFS_data_type")), None);
    }

    #[test]
    fn test_array_shape_and_kind() {
        let mut data = ArrayD::<f32>::zeros(IxDyn(&[2, 3]));
        let value = CallValue::from(&mut data);
        let array = value.as_array().unwrap();
        assert_eq!(array.kind(), ElementKind::F32);
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array.ndim(), 2);
        assert!(array.is_contiguous());
    }

    #[test]
    fn test_extent_requires_single_integer() {
        let mut n = arr0(7_i64);
        assert_eq!(ArrayArg::from(n.view_mut()).as_extent(), Some(7));

        let mut pair = ndarray::Array1::<i64>::zeros(2);
        assert_eq!(ArrayArg::from(pair.view_mut()).as_extent(), None);

        let mut real = arr0(7.0_f64);
        assert_eq!(ArrayArg::from(real.view_mut()).as_extent(), None);
    }

    #[test]
    fn test_fortran_order_is_contiguous() {
        let mut data = Array2::<f64>::zeros((3, 4));
        let mut transposed = ArrayArg::from(data.view_mut().reversed_axes());
        assert!(transposed.is_contiguous());
        assert!(transposed.as_mut_ptr().is_some());
    }

    #[test]
    fn test_strided_view_is_not_contiguous() {
        let mut data = Array2::<f64>::zeros((4, 4));
        let mut strided = ArrayArg::from(data.slice_mut(s![.., ..;2]));
        assert!(!strided.is_contiguous());
        assert!(strided.as_mut_ptr().is_none());
    }

    #[test]
    fn test_reversed_view_is_not_contiguous() {
        let mut data = ndarray::Array1::<f64>::zeros(4);
        let mut reversed = ArrayArg::from(data.slice_mut(s![..;-1]));
        assert!(!reversed.is_contiguous());
        assert!(reversed.as_mut_ptr().is_none());
    }

    #[test]
    fn test_permuted_axes_are_not_contiguous() {
        let mut data = ndarray::Array3::<f64>::zeros((2, 3, 4));
        let mut permuted = ArrayArg::from(data.view_mut().permuted_axes([1, 0, 2]));
        assert!(!permuted.is_contiguous());
        assert!(permuted.as_mut_ptr().is_none());

        let mut fortran = ArrayArg::from(data.view_mut().permuted_axes([2, 1, 0]));
        assert!(fortran.is_contiguous());
    }

    #[test]
    fn test_scalar_values_are_not_arrays() {
        assert_eq!(CallValue::from(1.5).type_name(), "float scalar");
        assert_eq!(CallValue::from(3_i64).type_name(), "integer scalar");
        assert!(CallValue::from("x").as_array().is_none());
    }

    #[test]
    fn test_call_args_replace() {
        let mut a = arr0(1_i64);
        let mut args = CallArgs::new();
        assert!(args.insert("n", 2_i64).is_none());
        assert!(args.insert("n", &mut a).is_some());
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["n"]);
        assert!(args.get_mut("n").is_some());
    }
}
