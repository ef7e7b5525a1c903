//! Schema type definitions for CCPP physics metadata.
//!
//! This module defines the data model produced by metadata resolution:
//! arguments and attributes, routines grouped into schemes, modules, and
//! derived data types. All types serialize with [`serde`] so a resolved
//! schema can be handed to a code generator as JSON or YAML.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the resolved schema contract (semver).
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Local name of the trailing error-message argument.
pub const ERROR_MESSAGE_NAME: &str = "errmsg";
/// Local name of the trailing error-flag argument.
pub const ERROR_FLAG_NAME: &str = "errflg";

const ERROR_STANDARD_NAMES: [&str; 2] = ["ccpp_error_message", "ccpp_error_flag"];

/// Data flow direction of an argument across the foreign call boundary.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::Intent;
///
/// assert_eq!("inout".parse::<Intent>(), Ok(Intent::InOut));
/// assert!("both".parse::<Intent>().is_err());
/// assert_eq!(Intent::Out.to_string(), "out");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// Read-only input.
    #[serde(rename = "in")]
    In,
    /// Write-only output.
    #[serde(rename = "out")]
    Out,
    /// Read-write.
    #[serde(rename = "inout")]
    InOut,
}

impl Intent {
    /// Returns the metadata spelling of this intent.
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::In => "in",
            Intent::Out => "out",
            Intent::InOut => "inout",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in" => Ok(Intent::In),
            "out" => Ok(Intent::Out),
            "inout" => Ok(Intent::InOut),
            other => Err(format!("intent must be one of in, out, inout (got '{other}')")),
        }
    }
}

/// Fortran intrinsic types understood by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntrinsicType {
    Integer,
    Real,
    Logical,
    Complex,
    Character,
}

impl IntrinsicType {
    /// All intrinsic types, in declaration order.
    pub const ALL: [IntrinsicType; 5] = [
        IntrinsicType::Integer,
        IntrinsicType::Real,
        IntrinsicType::Logical,
        IntrinsicType::Complex,
        IntrinsicType::Character,
    ];

    /// Returns the lowercase Fortran spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            IntrinsicType::Integer => "integer",
            IntrinsicType::Real => "real",
            IntrinsicType::Logical => "logical",
            IntrinsicType::Complex => "complex",
            IntrinsicType::Character => "character",
        }
    }

    /// Looks up an intrinsic type by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

/// Declared type of an argument or attribute.
///
/// Resolved once when metadata is parsed: a name matching a Fortran intrinsic
/// becomes [`ArgType::Intrinsic`], anything else is a reference to a derived
/// data type. Serializes as the declared type name.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::{ArgType, IntrinsicType};
///
/// assert_eq!(ArgType::from("REAL"), ArgType::Intrinsic(IntrinsicType::Real));
/// assert_eq!(ArgType::from("GFS_control_type").derived_name(), Some("GFS_control_type"));
/// assert_eq!(ArgType::from("integer").type_string(Some("kind_phys")), "integer(kind=kind_phys)");
/// assert_eq!(ArgType::from("GFS_grid_type").type_string(None), "type(GFS_grid_type)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArgType {
    /// A Fortran intrinsic type.
    Intrinsic(IntrinsicType),
    /// A reference to a derived data type by name.
    Derived(String),
}

impl ArgType {
    /// Returns the type name as declared (intrinsics in lowercase).
    pub fn name(&self) -> &str {
        match self {
            ArgType::Intrinsic(t) => t.as_str(),
            ArgType::Derived(name) => name,
        }
    }

    /// Returns the derived type name, or `None` for intrinsics.
    pub fn derived_name(&self) -> Option<&str> {
        match self {
            ArgType::Intrinsic(_) => None,
            ArgType::Derived(name) => Some(name),
        }
    }

    /// Renders a Fortran declaration type string, e.g. `real(kind=kind_phys)`.
    pub fn type_string(&self, kind: Option<&str>) -> String {
        let base = match self {
            ArgType::Intrinsic(t) => t.as_str().to_string(),
            ArgType::Derived(name) => format!("type({name})"),
        };
        match kind {
            Some(kind) => format!("{base}(kind={kind})"),
            None => base,
        }
    }
}

impl From<&str> for ArgType {
    fn from(name: &str) -> Self {
        match IntrinsicType::from_name(name) {
            Some(t) => ArgType::Intrinsic(t),
            None => ArgType::Derived(name.trim().to_string()),
        }
    }
}

impl From<String> for ArgType {
    fn from(name: String) -> Self {
        ArgType::from(name.as_str())
    }
}

impl From<ArgType> for String {
    fn from(t: ArgType) -> Self {
        t.name().to_string()
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a parenthesized dimension list such as `(im, levs)`.
///
/// Returns `None` when the value is not wrapped in parentheses. `()` is rank 0.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::{parse_dimensions, render_dimensions};
///
/// assert_eq!(parse_dimensions("()"), Some(vec![]));
/// assert_eq!(
///     parse_dimensions("(horizontal_dimension, vertical_dimension)"),
///     Some(vec!["horizontal_dimension".to_string(), "vertical_dimension".to_string()])
/// );
/// assert_eq!(parse_dimensions("horizontal_dimension"), None);
///
/// let dims = vec!["a".to_string(), "b".to_string()];
/// assert_eq!(parse_dimensions(&render_dimensions(&dims)), Some(dims));
/// ```
pub fn parse_dimensions(value: &str) -> Option<Vec<String>> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(inner.split(',').map(|dim| dim.trim().to_string()).collect())
}

/// Renders dimension names back into the parenthesized metadata form.
pub fn render_dimensions(dimensions: &[String]) -> String {
    format!("({})", dimensions.join(","))
}

/// Renders an assumed-shape Fortran dimension spec, e.g. `(:,:)` for rank 2.
///
/// Rank 0 renders as the empty string.
pub fn colon_dimensions(dimensions: &[String]) -> String {
    if dimensions.is_empty() {
        return String::new();
    }
    format!("({})", vec![":"; dimensions.len()].join(","))
}

/// A field of a module or derived data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Local binding name.
    pub name: String,
    /// Canonical, codebase-wide identifier.
    pub standard_name: String,
    pub long_name: String,
    pub units: String,
    /// Dimension standard names, outermost first. Empty for scalars.
    pub dimensions: Vec<String>,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    pub kind: Option<String>,
}

impl Attribute {
    /// Wraps this attribute as an argument with the given intent and optional flag.
    pub fn into_argument(self, intent: Intent, optional: bool) -> Argument {
        Argument {
            name: self.name,
            standard_name: self.standard_name,
            long_name: self.long_name,
            units: self.units,
            dimensions: self.dimensions,
            arg_type: self.arg_type,
            kind: self.kind,
            intent,
            optional,
        }
    }

    /// Returns the number of declared dimensions.
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

/// An argument of a scheme routine.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::{Argument, ArgType, Intent, IntrinsicType};
///
/// let arg = Argument::new("im", "horizontal_loop_extent", ArgType::from("integer"), Intent::In);
/// assert_eq!(arg.arg_type, ArgType::Intrinsic(IntrinsicType::Integer));
/// assert_eq!(arg.rank(), 0);
/// assert!(!arg.is_error_reporting());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Local binding name.
    pub name: String,
    /// Canonical, codebase-wide identifier.
    pub standard_name: String,
    pub long_name: String,
    pub units: String,
    /// Dimension standard names, outermost first. Empty for scalars.
    pub dimensions: Vec<String>,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    pub kind: Option<String>,
    pub intent: Intent,
    pub optional: bool,
}

impl Argument {
    /// Creates a scalar, non-optional argument with empty descriptive fields.
    pub fn new(name: &str, standard_name: &str, arg_type: ArgType, intent: Intent) -> Self {
        Self {
            name: name.to_string(),
            standard_name: standard_name.to_string(),
            long_name: String::new(),
            units: String::new(),
            dimensions: Vec::new(),
            arg_type,
            kind: None,
            intent,
            optional: false,
        }
    }

    /// Sets the dimension standard names.
    pub fn with_dimensions(mut self, dimensions: &[&str]) -> Self {
        self.dimensions = dimensions.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Sets the kind parameter.
    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    /// Marks the argument as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Returns the number of declared dimensions.
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Drops intent and optional, keeping the descriptive fields.
    pub fn to_attribute(&self) -> Attribute {
        Attribute {
            name: self.name.clone(),
            standard_name: self.standard_name.clone(),
            long_name: self.long_name.clone(),
            units: self.units.clone(),
            dimensions: self.dimensions.clone(),
            arg_type: self.arg_type.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Returns `true` for an error-message or error-flag argument.
    ///
    /// Only when such arguments close the argument list do they form the
    /// routine's error pair; see [`Routine::declared_args`].
    pub fn is_error_reporting(&self) -> bool {
        self.name == ERROR_MESSAGE_NAME
            || self.name == ERROR_FLAG_NAME
            || ERROR_STANDARD_NAMES.contains(&self.standard_name.as_str())
    }
}

/// Entry point kind of a scheme routine, taken from the routine name suffix.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::RoutineKind;
///
/// assert_eq!(RoutineKind::split("sfc_ocean_run"), Some(("sfc_ocean", RoutineKind::Run)));
/// assert_eq!(RoutineKind::split("foo_timestep_init"), Some(("foo_timestep", RoutineKind::Init)));
/// assert_eq!(RoutineKind::split("foo_step"), None);
/// assert_eq!(RoutineKind::Finalize.routine_name("foo"), "foo_finalize");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Init,
    Run,
    Finalize,
}

impl RoutineKind {
    /// All kinds in calling order.
    pub const ALL: [RoutineKind; 3] = [RoutineKind::Init, RoutineKind::Run, RoutineKind::Finalize];

    /// Returns the routine name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            RoutineKind::Init => "init",
            RoutineKind::Run => "run",
            RoutineKind::Finalize => "finalize",
        }
    }

    /// Builds `<scheme>_<kind>`.
    pub fn routine_name(self, scheme: &str) -> String {
        format!("{scheme}_{}", self.suffix())
    }

    /// Splits a routine name into its scheme name and kind.
    ///
    /// Returns `None` when the last `_`-delimited token is not a routine kind
    /// or nothing precedes it.
    pub fn split(routine_name: &str) -> Option<(&str, RoutineKind)> {
        let (scheme, suffix) = routine_name.rsplit_once('_')?;
        if scheme.is_empty() {
            return None;
        }
        let kind = Self::ALL.into_iter().find(|k| k.suffix() == suffix)?;
        Some((scheme, kind))
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One entry point of a scheme.
///
/// `internal_args` keeps the declared argument list; `args` holds the same
/// list after derived-type expansion. `types` lists every derived type the
/// expansion traversed, in order of first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub args: Vec<Argument>,
    pub internal_args: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<DerivedDataType>,
    /// Basename of the metadata file that declared this routine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Routine {
    /// Creates an unexpanded routine; `args` and `internal_args` start equal.
    pub fn new(name: &str, args: Vec<Argument>) -> Self {
        Self {
            name: name.to_string(),
            internal_args: args.clone(),
            args,
            types: Vec::new(),
            filename: None,
        }
    }

    /// Creates the zero-argument placeholder `<scheme>_<kind>`.
    pub fn placeholder(scheme: &str, kind: RoutineKind) -> Self {
        Self::new(&kind.routine_name(scheme), Vec::new())
    }

    /// Records the declaring file.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Arguments a caller supplies, i.e. everything except the trailing
    /// error-reporting pair.
    ///
    /// An error-reporting argument anywhere else in the list is an ordinary
    /// caller argument.
    pub fn declared_args(&self) -> impl Iterator<Item = &Argument> {
        without_error_pair(&self.args).iter()
    }

    /// Pre-expansion arguments except the trailing error-reporting pair.
    pub fn declared_internal_args(&self) -> impl Iterator<Item = &Argument> {
        without_error_pair(&self.internal_args).iter()
    }

    /// Finds a post-expansion argument by local name.
    pub fn find_arg(&self, name: &str) -> Option<&Argument> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

/// A physics scheme: exactly one init, run and finalize routine.
///
/// # Examples
///
/// ```
/// use ccpp_schema_core::{Routine, RoutineKind, Scheme};
///
/// let scheme = Scheme::with_placeholders("foo", Routine::new("foo_run", vec![]));
/// assert_eq!(scheme.init.name, "foo_init");
/// assert_eq!(scheme.routine(RoutineKind::Finalize).name, "foo_finalize");
/// assert_eq!(scheme.routines().len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub name: String,
    pub init: Routine,
    pub run: Routine,
    pub finalize: Routine,
}

impl Scheme {
    /// Builds a scheme around `run` with placeholder init and finalize routines.
    pub fn with_placeholders(name: &str, run: Routine) -> Self {
        Self {
            name: name.to_string(),
            init: Routine::placeholder(name, RoutineKind::Init),
            run,
            finalize: Routine::placeholder(name, RoutineKind::Finalize),
        }
    }

    /// Returns the routine of the given kind.
    pub fn routine(&self, kind: RoutineKind) -> &Routine {
        match kind {
            RoutineKind::Init => &self.init,
            RoutineKind::Run => &self.run,
            RoutineKind::Finalize => &self.finalize,
        }
    }

    /// Returns init, run and finalize in calling order.
    pub fn routines(&self) -> [&Routine; 3] {
        [&self.init, &self.run, &self.finalize]
    }
}

/// A member of a [`Module`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "lowercase")]
pub enum ModuleMember {
    Routine(Routine),
    Attribute(Attribute),
}

impl ModuleMember {
    /// Returns the member's local name.
    pub fn name(&self) -> &str {
        match self {
            ModuleMember::Routine(routine) => &routine.name,
            ModuleMember::Attribute(attr) => &attr.name,
        }
    }

    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            ModuleMember::Routine(_) => 0,
            ModuleMember::Attribute(_) => 1,
        }
    }
}

/// A named group of routines and/or attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub members: Vec<ModuleMember>,
}

impl Module {
    pub fn new(name: &str, members: Vec<ModuleMember>) -> Self {
        Self {
            name: name.to_string(),
            members,
        }
    }

    /// Registers a scheme's three routines as one module named after the scheme.
    pub fn from_scheme(scheme: &Scheme) -> Self {
        Self::new(
            &scheme.name,
            scheme
                .routines()
                .into_iter()
                .map(|routine| ModuleMember::Routine(routine.clone()))
                .collect(),
        )
    }

    /// Iterates over attribute members.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.members.iter().filter_map(|member| match member {
            ModuleMember::Attribute(attr) => Some(attr),
            ModuleMember::Routine(_) => None,
        })
    }
}

/// A Fortran derived data type whose fields may be passed as arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedDataType {
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl DerivedDataType {
    pub fn new(name: &str, attrs: Vec<Attribute>) -> Self {
        Self {
            name: name.to_string(),
            attrs,
        }
    }
}

fn without_error_pair(args: &[Argument]) -> &[Argument] {
    let pair = args
        .iter()
        .rev()
        .take(2)
        .take_while(|arg| arg.is_error_reporting())
        .count();
    &args[..args.len() - pair]
}

/// The resolved schema: modules, schemes and derived types.
///
/// Built once per metadata load and immutable afterwards. Structural equality
/// makes two loads of the same input directly comparable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcppMetadata {
    modules: Vec<Module>,
    schemes: Vec<Scheme>,
    types: Vec<DerivedDataType>,
}

impl CcppMetadata {
    pub fn new(modules: Vec<Module>, schemes: Vec<Scheme>, types: Vec<DerivedDataType>) -> Self {
        Self {
            modules,
            schemes,
            types,
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn schemes(&self) -> &[Scheme] {
        &self.schemes
    }

    pub fn types(&self) -> &[DerivedDataType] {
        &self.types
    }

    /// Iterates over every routine of every scheme (init, run, finalize order).
    pub fn iterate_routines(&self) -> impl Iterator<Item = &Routine> {
        self.schemes.iter().flat_map(|scheme| scheme.routines())
    }

    pub fn find_scheme(&self, name: &str) -> Option<&Scheme> {
        self.schemes.iter().find(|scheme| scheme.name == name)
    }

    pub fn find_routine(&self, name: &str) -> Option<&Routine> {
        self.iterate_routines().find(|routine| routine.name == name)
    }

    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name == name)
    }

    pub fn find_type(&self, name: &str) -> Option<&DerivedDataType> {
        self.types.iter().find(|ddt| ddt.name == name)
    }
}
