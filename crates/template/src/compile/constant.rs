//! Constant: literal text runs between field descriptors.

use tracing::warn;

use super::cursor::Cursor;

/// Parse literal text up to the next `%` or `"`, expanding backslash escapes.
///
/// Numeric escapes (`\65`) accumulate greedily and name a Unicode scalar
/// value. Zero is dropped so rendered output never carries NUL; values that
/// are not scalar values become U+FFFD.
pub fn parse_constant(cursor: &mut Cursor<'_>, template: &str) -> String {
    let mut out = String::new();

    while let Some(c) = cursor.peek() {
        match c {
            '%' | '"' => break,
            '\\' => {
                cursor.bump();
                parse_escape(cursor, template, &mut out);
            }
            _ => {
                out.push_str(cursor.take_until_any(&['%', '"', '\\']));
            }
        }
    }

    out
}

fn parse_escape(cursor: &mut Cursor<'_>, template: &str, out: &mut String) {
    match cursor.peek() {
        // a lone backslash at end of input stays literal
        None => out.push('\\'),
        Some('n') => {
            cursor.bump();
            out.push('\n');
        }
        Some('r') => {
            cursor.bump();
            out.push('\r');
        }
        Some(c) if c.is_ascii_digit() => {
            let value = cursor.take_number().unwrap_or(0);
            push_code_point(value, template, out);
        }
        Some(c) => {
            // covers `\\`, `\%` and every unknown escape
            cursor.bump();
            out.push(c);
        }
    }
}

fn push_code_point(value: usize, template: &str, out: &mut String) {
    if value == 0 {
        warn!(template, "numeric escape \\0 dropped from constant");
        return;
    }
    match u32::try_from(value).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            warn!(
                template,
                value, "numeric escape is not a valid character, using U+FFFD"
            );
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}
