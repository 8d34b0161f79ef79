//! Model: compiled templates and their entries.

use std::fmt;
use std::sync::Arc;

use crate::regex::CompiledRegex;

/// Upper bound used for `$` ("to end of value") in a range.
pub const RANGE_END: usize = usize::MAX;

/// Field delimiter used when `F` carries no usable `,` clause (TAB).
pub const DEFAULT_FIELD_DELIMITER: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlMode {
    #[default]
    None,
    /// Quote and backslash escaping for engines honouring C-style escapes.
    MySqlSmart,
    /// Plain quote doubling.
    Standard,
}

impl SqlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlMode::None => "nosql",
            SqlMode::MySqlSmart => "sql",
            SqlMode::Standard => "stdsql",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    #[default]
    Default,
    MySql,
    Rfc3164,
    Rfc3339,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseConv {
    #[default]
    None,
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlCharPolicy {
    #[default]
    None,
    /// Replace with `#` and three octal digits.
    Escape,
    Drop,
    Space,
}

/// How a field's value is cut down before transforms run.
#[derive(Debug, Clone, Default)]
pub enum Extraction {
    #[default]
    WholeValue,
    /// 1-based inclusive character positions; `to == RANGE_END` runs to the end.
    Range { from: usize, to: usize },
    /// 1-based index of the `delimiter`-separated token.
    DelimitedField { index: usize, delimiter: u8 },
    /// `compiled` is `None` when the pattern failed to compile.
    Regex {
        pattern: String,
        compiled: Option<Arc<dyn CompiledRegex>>,
    },
}

impl PartialEq for Extraction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Extraction::WholeValue, Extraction::WholeValue) => true,
            (Extraction::Range { from: a, to: b }, Extraction::Range { from: c, to: d }) => {
                a == c && b == d
            }
            (
                Extraction::DelimitedField { index: a, delimiter: b },
                Extraction::DelimitedField { index: c, delimiter: d },
            ) => a == c && b == d,
            (
                Extraction::Regex { pattern: a, compiled: x },
                Extraction::Regex { pattern: b, compiled: y },
            ) => a == b && x.is_some() == y.is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldEntry {
    pub property: String,
    pub extraction: Extraction,
    pub date_format: DateFormat,
    pub case_conv: CaseConv,
    pub control_chars: ControlCharPolicy,
    pub drop_last_lf: bool,
}

impl FieldEntry {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ..Default::default()
        }
    }

    /// True for a regex field whose pattern did not compile.
    pub fn has_invalid_regex(&self) -> bool {
        matches!(self.extraction, Extraction::Regex { compiled: None, .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateEntry {
    Constant(String),
    Field(FieldEntry),
}

/// A named, compiled output format.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub(crate) name: String,
    pub(crate) entries: Vec<TemplateEntry>,
    pub(crate) sql_mode: SqlMode,
}

impl Template {
    pub fn new(name: impl Into<String>, entries: Vec<TemplateEntry>, sql_mode: SqlMode) -> Self {
        Self {
            name: name.into(),
            entries,
            sql_mode,
        }
    }

    /// The "do not use" result of a template that failed to compile.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn sql_mode(&self) -> SqlMode {
        self.sql_mode
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_disabled(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template: Name='{}'", self.name)?;
        match self.sql_mode {
            SqlMode::MySqlSmart => write!(f, " [SQL-Format (MySQL)]")?,
            SqlMode::Standard => write!(f, " [SQL-Format (standard SQL)]")?,
            SqlMode::None => {}
        }
        writeln!(f)?;
        for entry in &self.entries {
            write!(f, "\t")?;
            match entry {
                TemplateEntry::Constant(text) => writeln!(f, "(CONSTANT), value: {:?}", text)?,
                TemplateEntry::Field(field) => writeln!(
                    f,
                    "(FIELD), value: '{}'{}",
                    field.property,
                    FieldFlags(field)
                )?,
            }
        }
        Ok(())
    }
}

struct FieldFlags<'a>(&'a FieldEntry);

impl fmt::Display for FieldFlags<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.0;
        match field.date_format {
            DateFormat::Default => {}
            DateFormat::MySql => write!(f, " [Format as MySQL-Date]")?,
            DateFormat::Rfc3164 => write!(f, " [Format as RFC3164-Date]")?,
            DateFormat::Rfc3339 => write!(f, " [Format as RFC3339-Date]")?,
        }
        match field.case_conv {
            CaseConv::None => {}
            CaseConv::Lower => write!(f, " [Converted to Lower Case]")?,
            CaseConv::Upper => write!(f, " [Converted to Upper Case]")?,
        }
        match field.control_chars {
            ControlCharPolicy::None => {}
            ControlCharPolicy::Escape => write!(f, " [escape control-characters]")?,
            ControlCharPolicy::Drop => write!(f, " [drop control-characters]")?,
            ControlCharPolicy::Space => write!(f, " [replace control-characters with space]")?,
        }
        if field.drop_last_lf {
            write!(f, " [drop last LF in msg]")?;
        }
        match &field.extraction {
            Extraction::WholeValue => Ok(()),
            Extraction::Range { from, to } if *to == RANGE_END => {
                write!(f, " [substring, from character {} to end]", from)
            }
            Extraction::Range { from, to } => {
                write!(f, " [substring, from character {} to {}]", from, to)
            }
            Extraction::DelimitedField { index, delimiter } => {
                write!(f, " [substring, field #{} only (delimiter {})]", index, delimiter)
            }
            Extraction::Regex { pattern, compiled: Some(_) } => write!(f, " [regex '{}']", pattern),
            Extraction::Regex { pattern, compiled: None } => {
                write!(f, " [INVALID regex '{}']", pattern)
            }
        }
    }
}
