//! Compile: turns template directives into [`Template`]s.
//!
//! # Grammar
//!
//! ```text
//! directive := name "," '"' body '"' ( "," option )*
//! body      := ( constant | "%" field "%" )*
//! field     := property [ ":" frompos [ ":" topos [ ":" options ] ] ]
//! ```
//!
//! Compilation never fails. A directive that cannot be used at all yields a
//! disabled template (see [`Template::is_disabled`]); everything else is
//! diagnosed through `tracing` and parsing carries on.

pub mod constant;
pub mod cursor;
pub mod field;
pub mod options;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{SqlMode, Template, TemplateEntry};
use crate::regex::RegexEngine;
pub use cursor::Cursor;

/// Longest template option word kept.
pub const MAX_TEMPLATE_OPTION_LEN: usize = 127;

#[derive(Clone, Default)]
pub struct TemplateCompiler {
    regex: Option<Arc<dyn RegexEngine>>,
}

impl fmt::Debug for TemplateCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCompiler")
            .field("regex", &self.regex.is_some())
            .finish()
    }
}

impl TemplateCompiler {
    /// A compiler without regex support.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `:R:` fields using `engine`.
    pub fn with_regex(mut self, engine: Arc<dyn RegexEngine>) -> Self {
        self.regex = Some(engine);
        self
    }

    pub fn regex_enabled(&self) -> bool {
        self.regex.is_some()
    }

    /// Compile a full directive line: `name, "body" [, option]*`.
    pub fn compile_directive(&self, line: &str) -> Template {
        let Some((name, spec)) = line.split_once(',') else {
            warn!(directive = line, "template directive without body");
            return Template::disabled();
        };
        let name = name.trim();
        if name.is_empty() {
            warn!(directive = line, "template directive without name");
            return Template::disabled();
        }
        self.compile_str(name, spec)
    }

    pub fn compile_str(&self, name: &str, spec: &str) -> Template {
        self.compile(name, &mut Cursor::new(spec))
    }

    /// Compile the quoted body and trailing options at `cursor`.
    ///
    /// Leaves the cursor on the first character that is not part of the
    /// option list.
    pub fn compile(&self, name: &str, cursor: &mut Cursor<'_>) -> Template {
        cursor.skip_whitespace();
        if !cursor.eat('"') {
            warn!(template = name, "template invalid, does not start with '\"'");
            return Template::disabled();
        }

        let entries = self.parse_body(name, cursor);
        let sql_mode = parse_template_options(cursor, name);

        debug!(
            template = name,
            entries = entries.len(),
            sql = sql_mode.as_str(),
            "template compiled"
        );
        Template::new(name, entries, sql_mode)
    }

    fn parse_body(&self, name: &str, cursor: &mut Cursor<'_>) -> Vec<TemplateEntry> {
        let mut entries = Vec::new();
        loop {
            match cursor.peek() {
                None => {
                    warn!(template = name, "template body not terminated by '\"'");
                    break;
                }
                Some('"') => {
                    cursor.bump();
                    break;
                }
                Some('%') => {
                    cursor.bump();
                    let field = field::parse_field(cursor, name, self.regex.as_deref());
                    entries.push(TemplateEntry::Field(field));
                }
                Some(_) => {
                    let text = constant::parse_constant(cursor, name);
                    if !text.is_empty() {
                        entries.push(TemplateEntry::Constant(text));
                    }
                }
            }
        }
        entries
    }
}

/// Parse `, option` pairs following the closing quote.
fn parse_template_options(cursor: &mut Cursor<'_>, name: &str) -> SqlMode {
    let mut sql_mode = SqlMode::None;
    loop {
        cursor.skip_whitespace();
        if !cursor.eat(',') {
            break;
        }
        cursor.skip_whitespace();

        let raw = cursor.take_until_any(&['=', ',', '\n']);
        cursor.eat('\n');
        let option = options::bounded_token(raw.trim(), MAX_TEMPLATE_OPTION_LEN);

        match option.as_str() {
            "sql" => sql_mode = SqlMode::MySqlSmart,
            "stdsql" => sql_mode = SqlMode::Standard,
            "nosql" => sql_mode = SqlMode::None,
            other => warn!(template = name, option = other, "invalid template option ignored"),
        }
    }
    sql_mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Extraction, FieldEntry};
    use crate::regex::GrepRegexEngine;

    fn compile(spec: &str) -> Template {
        TemplateCompiler::new().compile_str("t", spec)
    }

    fn field(tpl: &Template, idx: usize) -> &FieldEntry {
        match &tpl.entries()[idx] {
            TemplateEntry::Field(f) => f,
            other => panic!("entry {} is not a field: {:?}", idx, other),
        }
    }

    // ── Body ────────────────────────────────────────────────────

    #[test]
    fn test_entries_in_source_order() {
        let tpl = compile(r#""%msg% - %hostname:1:5%""#);
        assert_eq!(tpl.name(), "t");
        assert_eq!(tpl.entry_count(), 3);
        assert_eq!(field(&tpl, 0).property, "msg");
        assert_eq!(tpl.entries()[1], TemplateEntry::Constant(" - ".into()));
        assert_eq!(field(&tpl, 2).property, "hostname");
        assert_eq!(
            field(&tpl, 2).extraction,
            Extraction::Range { from: 1, to: 5 }
        );
    }

    #[test]
    fn test_constant_only() {
        let tpl = compile(r#""\n\r\\\%\65""#);
        assert_eq!(tpl.entries(), &[TemplateEntry::Constant("\n\r\\%A".into())]);
    }

    #[test]
    fn test_leading_whitespace_skipped() {
        let tpl = compile("   \t\"x\"");
        assert!(!tpl.is_disabled());
        assert_eq!(tpl.entry_count(), 1);
    }

    #[test]
    fn test_missing_quote_disables() {
        let tpl = compile("%msg%");
        assert!(tpl.is_disabled());
        assert_eq!(tpl.name(), "");
        assert_eq!(tpl.entry_count(), 0);
    }

    #[test]
    fn test_empty_body() {
        let tpl = compile(r#""""#);
        assert!(!tpl.is_disabled());
        assert_eq!(tpl.entry_count(), 0);
    }

    #[test]
    fn test_unterminated_body_keeps_entries() {
        let tpl = compile(r#""abc %msg%"#);
        assert!(!tpl.is_disabled());
        assert_eq!(tpl.entry_count(), 2);
    }

    #[test]
    fn test_broken_field_does_not_desync() {
        let tpl = compile(r#""%msg:F,999x:2:bogus% after %pri%""#);
        assert_eq!(tpl.entry_count(), 3);
        assert_eq!(
            field(&tpl, 0).extraction,
            Extraction::DelimitedField { index: 2, delimiter: 9 }
        );
        assert_eq!(tpl.entries()[1], TemplateEntry::Constant(" after ".into()));
        assert_eq!(field(&tpl, 2).property, "pri");
    }

    #[test]
    fn test_regex_field_with_engine() {
        let compiler = TemplateCompiler::new().with_regex(Arc::new(GrepRegexEngine));
        assert!(compiler.regex_enabled());
        let tpl = compiler.compile_str("t", r#""[%msg:R:id=[0-9]+--end%]""#);
        assert_eq!(tpl.entry_count(), 3);
        assert!(matches!(
            field(&tpl, 1).extraction,
            Extraction::Regex { compiled: Some(_), .. }
        ));
    }

    // ── Template options ────────────────────────────────────────

    #[test]
    fn test_sql_options() {
        assert_eq!(compile(r#""x",sql"#).sql_mode(), SqlMode::MySqlSmart);
        assert_eq!(compile(r#""x", STDSQL"#).sql_mode(), SqlMode::Standard);
        assert_eq!(compile(r#""x",sql,nosql"#).sql_mode(), SqlMode::None);
        assert_eq!(compile(r#""x""#).sql_mode(), SqlMode::None);
    }

    #[test]
    fn test_unknown_option_ignored() {
        let tpl = compile(r#""x", bogus , stdsql"#);
        assert!(!tpl.is_disabled());
        assert_eq!(tpl.sql_mode(), SqlMode::Standard);
    }

    #[test]
    fn test_options_stop_without_comma() {
        let mut cursor = Cursor::new(r#""x" trailing"#);
        let tpl = TemplateCompiler::new().compile("t", &mut cursor);
        assert_eq!(tpl.sql_mode(), SqlMode::None);
        assert_eq!(cursor.rest(), "trailing");
    }

    #[test]
    fn test_option_with_value_stops_at_equals() {
        let mut cursor = Cursor::new(r#""x",sql=1"#);
        let tpl = TemplateCompiler::new().compile("t", &mut cursor);
        assert_eq!(tpl.sql_mode(), SqlMode::MySqlSmart);
        assert_eq!(cursor.rest(), "=1");
    }

    // ── Directives ──────────────────────────────────────────────

    #[test]
    fn test_compile_directive() {
        let tpl = TemplateCompiler::new().compile_directive(r#" dbFmt , "insert '%msg%'", SQL"#);
        assert_eq!(tpl.name(), "dbFmt");
        assert_eq!(tpl.sql_mode(), SqlMode::MySqlSmart);
        assert_eq!(tpl.entry_count(), 3);
    }

    #[test]
    fn test_compile_directive_without_body() {
        assert!(TemplateCompiler::new().compile_directive("lonely").is_disabled());
    }

    #[test]
    fn test_compile_directive_without_name() {
        assert!(TemplateCompiler::new().compile_directive(r#" , "x""#).is_disabled());
    }
}
