//! Parser for CCPP `.meta` argument tables.
//!
//! A metadata file holds zero or more blocks. Each block starts with the
//! header marker (by default `[ccpp-arg-table]`), which is itself an INI
//! section carrying the entry's `name` and `type`, followed by one section per
//! argument or field:
//!
//! ```text
//! [ccpp-arg-table]
//!   name = sfc_ocean_run
//!   type = scheme
//! [im]
//!   standard_name = horizontal_loop_extent
//!   long_name = horizontal loop extent
//!   units = count
//!   dimensions = ()
//!   type = integer
//!   intent = in
//!   optional = F
//! ```
//!
//! Values are taken literally; in particular `%` in units is not treated as
//! an interpolation marker. Keys are case-insensitive, `=` or `:` separate key
//! and value, lines starting with `#` or `;` are comments, and lines indented
//! deeper than their key continue the previous value.

use std::path::Path;
use std::sync::LazyLock;

use ccpp_schema_core::{ArgType, Argument, Attribute, Intent, parse_dimensions};
use regex::Regex;
use tracing::debug;

use crate::config::DEFAULT_HEADER_MARKER;
use crate::error::{MetaError, Result};

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?P<name>.+)\]").expect("static regex must compile"));
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>[^=:]*?)\s*[=:]\s*(?P<value>.*)$").expect("static regex must compile")
});

/// Kind of entry declared by a block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Scheme,
    Module,
    Ddt,
}

impl EntryKind {
    fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheme" => Some(EntryKind::Scheme),
            "module" => Some(EntryKind::Module),
            "ddt" => Some(EntryKind::Ddt),
            _ => None,
        }
    }
}

/// Typed contents of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// Arguments of one scheme routine.
    Scheme(Vec<Argument>),
    /// Attributes of a module.
    Module(Vec<Attribute>),
    /// Fields of a derived data type.
    Ddt(Vec<Attribute>),
}

/// One parsed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    /// Value of the header's `name` key.
    pub name: String,
    /// 1-based line of the header marker.
    pub line: usize,
    pub body: EntryBody,
}

impl MetaEntry {
    pub fn kind(&self) -> EntryKind {
        match self.body {
            EntryBody::Scheme(_) => EntryKind::Scheme,
            EntryBody::Module(_) => EntryKind::Module,
            EntryBody::Ddt(_) => EntryKind::Ddt,
        }
    }
}

#[derive(Debug)]
struct Field {
    key: String,
    value: String,
    line: usize,
    indent: usize,
}

#[derive(Debug)]
struct Section {
    name: String,
    line: usize,
    fields: Vec<Field>,
}

impl Section {
    fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key == key)
    }
}

/// Splits metadata text into blocks and parses each into a [`MetaEntry`].
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ccpp_schema_meta::{EntryBody, MetadataParser};
///
/// let text = "\
/// [ccpp-arg-table]
///   name = foo_run
///   type = scheme
/// [x]
///   standard_name = bar
///   long_name = an integer
///   units = %
///   dimensions = ()
///   type = integer
///   intent = in
///   optional = F
/// ";
/// let entries = MetadataParser::default().parse_str(text, Path::new("foo.meta")).unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].name, "foo_run");
/// match &entries[0].body {
///     EntryBody::Scheme(args) => assert_eq!(args[0].units, "%"),
///     other => panic!("unexpected body {other:?}"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MetadataParser {
    marker: String,
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_MARKER)
    }
}

impl MetadataParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Reads and parses one metadata file.
    ///
    /// # Errors
    ///
    /// Returns [`MetaError::Io`] if the file cannot be read, or
    /// [`MetaError::Parse`] for malformed content.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Vec<MetaEntry>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| MetaError::io(path, err))?;
        self.parse_str(&text, path)
    }

    /// Parses metadata text; `path` is only used in error messages.
    ///
    /// Text before the first header marker is ignored.
    pub fn parse_str(&self, text: &str, path: &Path) -> Result<Vec<MetaEntry>> {
        let starts: Vec<usize> = text.match_indices(&self.marker).map(|(i, _)| i).collect();
        let mut entries = Vec::with_capacity(starts.len());

        for (n, &start) in starts.iter().enumerate() {
            let end = starts.get(n + 1).copied().unwrap_or(text.len());
            let first_line = text[..start].matches('\n').count() + 1;
            entries.push(self.parse_block(&text[start..end], first_line, path)?);
        }

        debug!(path = %path.display(), entries = entries.len(), "Parsed metadata");
        Ok(entries)
    }

    fn header_section_name(&self) -> &str {
        let marker = self.marker.trim();
        marker
            .strip_prefix('[')
            .and_then(|m| m.strip_suffix(']'))
            .unwrap_or(marker)
    }

    fn parse_block(&self, block: &str, first_line: usize, path: &Path) -> Result<MetaEntry> {
        let mut sections = parse_sections(block, first_line, path)?.into_iter();
        let header = match sections.next() {
            Some(section) if section.name == self.header_section_name() => section,
            _ => {
                return Err(MetaError::parse(
                    path,
                    first_line,
                    format!("block does not start with '{}'", self.marker),
                ));
            }
        };

        let name = required(&header, "name", path)?.value.clone();
        let kind_field = required(&header, "type", path)?;
        let kind = EntryKind::from_header(&kind_field.value).ok_or_else(|| {
            MetaError::parse(
                path,
                kind_field.line,
                format!(
                    "type must be one of scheme, module, ddt (got '{}')",
                    kind_field.value
                ),
            )
        })?;

        let body = match kind {
            EntryKind::Scheme => EntryBody::Scheme(
                sections
                    .map(|section| parse_argument(&section, path))
                    .collect::<Result<_>>()?,
            ),
            EntryKind::Module => EntryBody::Module(
                sections
                    .map(|section| parse_attribute(&section, path))
                    .collect::<Result<_>>()?,
            ),
            EntryKind::Ddt => EntryBody::Ddt(
                sections
                    .map(|section| parse_attribute(&section, path))
                    .collect::<Result<_>>()?,
            ),
        };

        Ok(MetaEntry {
            name,
            line: header.line,
            body,
        })
    }
}

fn parse_sections(block: &str, first_line: usize, path: &Path) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (offset, raw) in block.lines().enumerate() {
        let line = first_line + offset;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let indent = raw.len() - raw.trim_start().len();

        if let Some(last) = sections.last_mut().and_then(|s| s.fields.last_mut()) {
            if indent > last.indent && !SECTION_RE.is_match(trimmed) {
                last.value.push('\n');
                last.value.push_str(trimmed);
                continue;
            }
        }

        if let Some(caps) = SECTION_RE.captures(trimmed) {
            let name = caps["name"].trim().to_string();
            if sections.iter().any(|s| s.name == name) {
                return Err(MetaError::parse(
                    path,
                    line,
                    format!("duplicate section '{name}'"),
                ));
            }
            sections.push(Section {
                name,
                line,
                fields: Vec::new(),
            });
            continue;
        }

        let caps = ENTRY_RE
            .captures(trimmed)
            .filter(|caps| !caps["key"].trim().is_empty())
            .ok_or_else(|| {
                MetaError::parse(path, line, format!("expected 'key = value', got '{trimmed}'"))
            })?;
        let section = sections.last_mut().ok_or_else(|| {
            MetaError::parse(path, line, "key/value entry outside of any section")
        })?;

        let key = caps["key"].trim().to_ascii_lowercase();
        if section.get(&key).is_some() {
            return Err(MetaError::parse(
                path,
                line,
                format!("duplicate key '{key}' in section '{}'", section.name),
            ));
        }
        section.fields.push(Field {
            key,
            value: caps["value"].trim().to_string(),
            line,
            indent,
        });
    }

    Ok(sections)
}

fn required<'s>(section: &'s Section, key: &str, path: &Path) -> Result<&'s Field> {
    section.get(key).ok_or_else(|| {
        MetaError::parse(
            path,
            section.line,
            format!("section '{}' is missing required key '{key}'", section.name),
        )
    })
}

fn parse_attribute(section: &Section, path: &Path) -> Result<Attribute> {
    let dims = required(section, "dimensions", path)?;
    let dimensions = parse_dimensions(&dims.value).ok_or_else(|| {
        MetaError::parse(
            path,
            dims.line,
            format!(
                "dimensions of '{}' must be wrapped in parentheses (got '{}')",
                section.name, dims.value
            ),
        )
    })?;

    // Validated even where unused so a typo never passes silently.
    parse_intent(section, path)?;
    parse_optional(section, path)?;

    Ok(Attribute {
        name: section.name.clone(),
        standard_name: required(section, "standard_name", path)?.value.clone(),
        long_name: required(section, "long_name", path)?.value.clone(),
        units: required(section, "units", path)?.value.clone(),
        dimensions,
        arg_type: ArgType::from(required(section, "type", path)?.value.as_str()),
        kind: section
            .get("kind")
            .map(|field| field.value.clone())
            .filter(|kind| !kind.is_empty()),
    })
}

fn parse_argument(section: &Section, path: &Path) -> Result<Argument> {
    let attribute = parse_attribute(section, path)?;
    let intent = match parse_intent(section, path)? {
        Some(intent) => intent,
        None => return Err(missing(section, "intent", path)),
    };
    let optional = match parse_optional(section, path)? {
        Some(optional) => optional,
        None => return Err(missing(section, "optional", path)),
    };
    Ok(attribute.into_argument(intent, optional))
}

fn missing(section: &Section, key: &str, path: &Path) -> MetaError {
    MetaError::parse(
        path,
        section.line,
        format!("section '{}' is missing required key '{key}'", section.name),
    )
}

fn parse_intent(section: &Section, path: &Path) -> Result<Option<Intent>> {
    section
        .get("intent")
        .map(|field| {
            field
                .value
                .parse::<Intent>()
                .map_err(|message| MetaError::parse(path, field.line, message))
        })
        .transpose()
}

fn parse_optional(section: &Section, path: &Path) -> Result<Option<bool>> {
    section
        .get("optional")
        .map(|field| match field.value.as_str() {
            "T" => Ok(true),
            "F" => Ok(false),
            other => Err(MetaError::parse(
                path,
                field.line,
                format!("optional must be T or F (got '{other}')"),
            )),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccpp_schema_core::IntrinsicType;

    const TWO_BLOCKS: &str = "\
! leading Fortran-style text is ignored
[ccpp-arg-table]
  name = physcons
  type = module
[con_g]
  standard_name = gravitational_acceleration
  long_name = gravitational acceleration
  units = m s-2
  dimensions = ()
  type = real
  kind = kind_phys

[ccpp-arg-table]
  name = GFS_grid_type
  type = ddt
[xlon]
  standard_name = longitude
  long_name = longitude
  units = radian
  dimensions = (horizontal_dimension)
  type = real
  kind = kind_phys
";

    fn parse(text: &str) -> Result<Vec<MetaEntry>> {
        MetadataParser::default().parse_str(text, Path::new("test.meta"))
    }

    fn scheme_block(arg_lines: &str) -> String {
        format!(
            "[ccpp-arg-table]\n  name = foo_run\n  type = scheme\n[x]\n  standard_name = bar\n  long_name = x\n  units = none\n{arg_lines}"
        )
    }

    fn parse_error_line(err: MetaError) -> (usize, String) {
        match err {
            MetaError::Parse { line, message, .. } => (line, message),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_splits_blocks_and_kinds() {
        let entries = parse(TWO_BLOCKS).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind(), EntryKind::Module);
        assert_eq!(entries[0].line, 2);
        assert_eq!(entries[1].kind(), EntryKind::Ddt);
        assert_eq!(entries[1].name, "GFS_grid_type");
        assert_eq!(entries[1].line, 13);

        let EntryBody::Ddt(attrs) = &entries[1].body else {
            panic!("expected ddt body");
        };
        assert_eq!(attrs[0].dimensions, vec!["horizontal_dimension"]);
        assert_eq!(attrs[0].arg_type, ArgType::Intrinsic(IntrinsicType::Real));
        assert_eq!(attrs[0].kind.as_deref(), Some("kind_phys"));
    }

    #[test]
    fn test_empty_text_has_no_entries() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("no marker here\n").unwrap().is_empty());
    }

    #[test]
    fn test_scheme_argument_fields() {
        let text = scheme_block("  dimensions = (a, b)\n  type = integer\n  intent = inout\n  optional = T\n");
        let entries = parse(&text).unwrap();
        let EntryBody::Scheme(args) = &entries[0].body else {
            panic!("expected scheme body");
        };
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].name, "x");
        assert_eq!(args[0].dimensions, vec!["a", "b"]);
        assert_eq!(args[0].intent, Intent::InOut);
        assert!(args[0].optional);
        assert_eq!(args[0].kind, None);
    }

    #[test]
    fn test_keys_case_insensitive_and_colon_delimiter() {
        let text = "[ccpp-arg-table]\nNAME: foo_run\nType = scheme\n";
        let entries = parse(text).unwrap();
        assert_eq!(entries[0].name, "foo_run");
        assert_eq!(entries[0].body, EntryBody::Scheme(vec![]));
    }

    #[test]
    fn test_continuation_and_comments() {
        let text = scheme_block(
            "  # a comment\n  dimensions = ()\n  type = integer\n  intent = in\n  optional = F\n",
        )
        .replace("long_name = x", "long_name = first line\n      second line");
        let entries = parse(&text).unwrap();
        let EntryBody::Scheme(args) = &entries[0].body else {
            panic!("expected scheme body");
        };
        assert_eq!(args[0].long_name, "first line\nsecond line");
    }

    #[test]
    fn test_dimensions_without_parentheses_fail() {
        let text = scheme_block("  dimensions = im\n  type = integer\n  intent = in\n  optional = F\n");
        let (line, message) = parse_error_line(parse(&text).unwrap_err());
        assert_eq!(line, 8);
        assert!(message.contains("parentheses"));
    }

    #[test]
    fn test_bad_intent_fails() {
        let text = scheme_block("  dimensions = ()\n  type = integer\n  intent = both\n  optional = F\n");
        let (line, message) = parse_error_line(parse(&text).unwrap_err());
        assert_eq!(line, 10);
        assert!(message.contains("intent"));
    }

    #[test]
    fn test_bad_optional_fails() {
        let text = scheme_block("  dimensions = ()\n  type = integer\n  intent = in\n  optional = yes\n");
        let (_, message) = parse_error_line(parse(&text).unwrap_err());
        assert!(message.contains("optional must be T or F"));
    }

    #[test]
    fn test_scheme_argument_requires_intent() {
        let text = scheme_block("  dimensions = ()\n  type = integer\n  optional = F\n");
        let (line, message) = parse_error_line(parse(&text).unwrap_err());
        assert_eq!(line, 4);
        assert!(message.contains("'intent'"));
    }

    #[test]
    fn test_unknown_header_type_fails() {
        let (_, message) =
            parse_error_line(parse("[ccpp-arg-table]\n name = x\n type = widget\n").unwrap_err());
        assert!(message.contains("widget"));
    }

    #[test]
    fn test_duplicate_section_fails() {
        let text = "[ccpp-arg-table]\nname = m\ntype = module\n[a]\n[a]\n";
        let (line, message) = parse_error_line(parse(text).unwrap_err());
        assert_eq!(line, 5);
        assert!(message.contains("duplicate section"));
    }

    #[test]
    fn test_garbage_line_fails() {
        let text = "[ccpp-arg-table]\nname = m\ntype = module\njust words\n";
        let (line, _) = parse_error_line(parse(text).unwrap_err());
        assert_eq!(line, 4);
    }

    #[test]
    fn test_custom_marker() {
        let parser = MetadataParser::new("[table]");
        let entries = parser
            .parse_str("[table]\nname = m\ntype = module\n", Path::new("x.meta"))
            .unwrap();
        assert_eq!(entries[0].kind(), EntryKind::Module);
    }
}
