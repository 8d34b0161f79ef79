//! SQL: escaping of field values embedded in SQL statements.
//!
//! Standard SQL only needs quotes doubled. Engines with C-style backslash
//! escapes (MySQL, depending on its configuration) also need backslashes
//! escaped, or a value ending in `\` swallows the closing quote.
//!
//! # Emergency escape
//!
//! If the escaped copy cannot be allocated, the value is rewritten in place:
//! every `'` becomes `"` and, for the smart dialect, every `\` becomes `/`.
//! The message is corrupted but stays injection-safe, and the record is still
//! written instead of being dropped. This trades fidelity for availability
//! and must stay that way.

use std::borrow::Cow;

use tracing::warn;

use crate::model::SqlMode;
use crate::render::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// Double single quotes.
    Standard,
    /// Backslash-escape quotes and backslashes.
    MySqlSmart,
}

impl SqlDialect {
    pub fn for_mode(mode: SqlMode) -> Option<Self> {
        match mode {
            SqlMode::None => None,
            SqlMode::MySqlSmart => Some(SqlDialect::MySqlSmart),
            SqlMode::Standard => Some(SqlDialect::Standard),
        }
    }

    fn is_special(self, c: char) -> bool {
        match self {
            SqlDialect::Standard => c == '\'',
            SqlDialect::MySqlSmart => c == '\'' || c == '\\',
        }
    }

    fn quote_escape(self) -> char {
        match self {
            SqlDialect::Standard => '\'',
            SqlDialect::MySqlSmart => '\\',
        }
    }
}

/// Result of [`escape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escaped<'a> {
    pub value: Cow<'a, str>,
    /// The emergency rewrite was used.
    pub degraded: bool,
}

pub fn needs_escape(value: &str, dialect: SqlDialect) -> bool {
    value.chars().any(|c| dialect.is_special(c))
}

/// Escape `value` for `dialect`. Values without special characters are
/// handed back untouched.
pub fn escape(value: Cow<'_, str>, dialect: SqlDialect) -> Result<Escaped<'_>, RenderError> {
    escape_with(value, dialect, try_allocate)
}

/// [`escape`] with an explicit buffer allocator, which returns `None` when
/// `capacity` bytes cannot be obtained.
pub fn escape_with<'a>(
    value: Cow<'a, str>,
    dialect: SqlDialect,
    alloc: impl Fn(usize) -> Option<String>,
) -> Result<Escaped<'a>, RenderError> {
    let extra = value.chars().filter(|c| dialect.is_special(*c)).count();
    if extra == 0 {
        return Ok(Escaped {
            value,
            degraded: false,
        });
    }

    let capacity = value.len().saturating_add(extra);
    if let Some(mut buf) = alloc(capacity) {
        for c in value.chars() {
            if c == '\'' {
                buf.push(dialect.quote_escape());
            } else if c == '\\' && dialect == SqlDialect::MySqlSmart {
                buf.push('\\');
            }
            buf.push(c);
        }
        return Ok(Escaped {
            value: Cow::Owned(buf),
            degraded: false,
        });
    }

    warn!(
        requested = capacity,
        "out of memory while SQL-escaping, using emergency escape"
    );
    let owned = match value {
        Cow::Owned(s) => s,
        Cow::Borrowed(s) => {
            let mut copy = alloc(s.len()).ok_or(RenderError::Allocation { requested: s.len() })?;
            copy.push_str(s);
            copy
        }
    };
    Ok(Escaped {
        value: Cow::Owned(emergency_escape(owned, dialect)),
        degraded: true,
    })
}

/// Rewrite dangerous characters without allocating: `'` → `"` and, for
/// [`SqlDialect::MySqlSmart`], `\` → `/`.
pub fn emergency_escape(value: String, dialect: SqlDialect) -> String {
    let mut bytes = value.into_bytes();
    for b in bytes.iter_mut() {
        if *b == b'\'' {
            *b = b'"';
        } else if *b == b'\\' && dialect == SqlDialect::MySqlSmart {
            *b = b'/';
        }
    }
    // only ASCII bytes were replaced by ASCII bytes
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn try_allocate(capacity: usize) -> Option<String> {
    let mut buf = String::new();
    buf.try_reserve_exact(capacity).ok()?;
    Some(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_memory(_: usize) -> Option<String> {
        None
    }

    // ── Normal path ─────────────────────────────────────────────

    #[test]
    fn test_standard_doubles_quotes() {
        let out = escape(Cow::Borrowed("O'Brien"), SqlDialect::Standard).unwrap();
        assert_eq!(out.value, "O''Brien");
        assert!(!out.degraded);
    }

    #[test]
    fn test_standard_leaves_backslashes() {
        let out = escape(Cow::Borrowed(r"C:\temp"), SqlDialect::Standard).unwrap();
        assert_eq!(out.value, r"C:\temp");
        assert!(matches!(out.value, Cow::Borrowed(_)));
    }

    #[test]
    fn test_smart_escapes_backslash_and_quote() {
        let out = escape(Cow::Borrowed(r"a\'b"), SqlDialect::MySqlSmart).unwrap();
        assert_eq!(out.value, r"a\\\'b");
    }

    #[test]
    fn test_smart_trailing_backslash_cannot_eat_quote() {
        let out = escape(Cow::Borrowed(r"evil\"), SqlDialect::MySqlSmart).unwrap();
        assert_eq!(out.value, r"evil\\");
    }

    #[test]
    fn test_unchanged_value_is_not_copied() {
        let out = escape(Cow::Borrowed("plain text"), SqlDialect::MySqlSmart).unwrap();
        assert!(matches!(out.value, Cow::Borrowed("plain text")));
    }

    #[test]
    fn test_owned_value_stays_owned_when_unchanged() {
        let out = escape(Cow::Owned("plain".to_string()), SqlDialect::Standard).unwrap();
        assert!(matches!(out.value, Cow::Owned(_)));
    }

    #[test]
    fn test_multibyte_value() {
        let out = escape(Cow::Borrowed("l'été"), SqlDialect::Standard).unwrap();
        assert_eq!(out.value, "l''été");
    }

    #[test]
    fn test_needs_escape() {
        assert!(needs_escape("it's", SqlDialect::Standard));
        assert!(!needs_escape(r"a\b", SqlDialect::Standard));
        assert!(needs_escape(r"a\b", SqlDialect::MySqlSmart));
    }

    #[test]
    fn test_dialect_for_mode() {
        assert_eq!(SqlDialect::for_mode(SqlMode::None), None);
        assert_eq!(SqlDialect::for_mode(SqlMode::MySqlSmart), Some(SqlDialect::MySqlSmart));
        assert_eq!(SqlDialect::for_mode(SqlMode::Standard), Some(SqlDialect::Standard));
    }

    // ── Emergency path ──────────────────────────────────────────

    #[test]
    fn test_emergency_escape_standard() {
        assert_eq!(
            emergency_escape(r"O'Brien\x".to_string(), SqlDialect::Standard),
            r#"O"Brien\x"#
        );
    }

    #[test]
    fn test_emergency_escape_smart() {
        assert_eq!(
            emergency_escape(r"O'Brien\x".to_string(), SqlDialect::MySqlSmart),
            r#"O"Brien/x"#
        );
    }

    #[test]
    fn test_allocation_failure_on_owned_value_degrades() {
        let out = escape_with(
            Cow::Owned("it's".to_string()),
            SqlDialect::Standard,
            no_memory,
        )
        .unwrap();
        assert!(out.degraded);
        assert_eq!(out.value, "it\"s");
    }

    #[test]
    fn test_allocation_failure_never_passes_quote() {
        let out = escape_with(
            Cow::Owned(r"x\' OR 1=1 --".to_string()),
            SqlDialect::MySqlSmart,
            no_memory,
        )
        .unwrap();
        assert!(!out.value.contains('\''));
        assert!(!out.value.contains('\\'));
    }

    #[test]
    fn test_borrowed_value_copied_for_emergency() {
        // escape buffer fails, a same-size copy still succeeds
        let small_only = |cap: usize| {
            if cap <= 4 {
                Some(String::with_capacity(cap))
            } else {
                None
            }
        };
        let out = escape_with(Cow::Borrowed("a'b'"), SqlDialect::Standard, small_only).unwrap();
        assert!(out.degraded);
        assert_eq!(out.value, "a\"b\"");
    }

    #[test]
    fn test_borrowed_value_without_any_memory_fails() {
        let err = escape_with(Cow::Borrowed("a'b"), SqlDialect::Standard, no_memory).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { requested: 3 }));
    }
}
