//! Field: `%property:frompos:topos:options%` descriptors.
//!
//! Every malformed piece is diagnosed and skipped up to the next `:` or
//! `%`, so a broken descriptor never desynchronises the rest of the
//! template.

use tracing::{debug, warn};

use super::cursor::Cursor;
use super::options::parse_field_options;
use crate::model::{Extraction, FieldEntry, DEFAULT_FIELD_DELIMITER, RANGE_END};
use crate::regex::RegexEngine;

/// Marker terminating a regex pattern in topos.
pub const REGEX_END_MARKER: &str = "--end";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FromPos {
    Offset(usize),
    Fields(u8),
    Regex,
}

/// Parse one field descriptor. The cursor must sit just past the opening `%`.
pub fn parse_field(
    cursor: &mut Cursor<'_>,
    template: &str,
    regex: Option<&dyn RegexEngine>,
) -> FieldEntry {
    let property = cursor.take_until_any(&['%', ':']);
    if property.is_empty() {
        warn!(template, "field descriptor without property name");
    }
    let mut field = FieldEntry::new(property);

    let mut from = FromPos::Offset(0);
    if cursor.eat(':') {
        from = parse_from(cursor, template, property, regex.is_some());
    }

    let mut to = 0;
    let mut pattern = None;
    if cursor.eat(':') {
        match (from, regex) {
            (FromPos::Regex, Some(engine)) => {
                pattern = Some(parse_pattern(cursor, template, property, engine));
            }
            _ => to = parse_to(cursor, template, property),
        }
    }

    field.extraction = match from {
        FromPos::Offset(0) if to == 0 => Extraction::WholeValue,
        FromPos::Offset(from) if to < from => Extraction::Range { from: to, to: from },
        FromPos::Offset(from) => Extraction::Range { from, to },
        FromPos::Fields(delimiter) => Extraction::DelimitedField { index: to, delimiter },
        FromPos::Regex => pattern.unwrap_or_else(|| {
            warn!(template, property, "regex field without pattern, using whole value");
            Extraction::WholeValue
        }),
    };

    if cursor.eat(':') {
        parse_field_options(cursor, &mut field, template);
    }

    if !cursor.eat('%') {
        warn!(template, property, "unterminated field descriptor");
    }

    field
}

fn parse_from(
    cursor: &mut Cursor<'_>,
    template: &str,
    property: &str,
    regex_enabled: bool,
) -> FromPos {
    match cursor.peek() {
        Some('R') if regex_enabled => {
            cursor.bump();
            if cursor.peek() == Some(':') {
                FromPos::Regex
            } else {
                warn!(template, property, "invalid character in frompos after \"R\"");
                skip_garbage(cursor, template, property);
                FromPos::Offset(0)
            }
        }
        Some('F') => {
            cursor.bump();
            let delimiter = parse_delimiter(cursor, template, property);
            skip_garbage(cursor, template, property);
            FromPos::Fields(delimiter)
        }
        _ => {
            let offset = cursor.take_number().unwrap_or(0);
            skip_garbage(cursor, template, property);
            FromPos::Offset(offset)
        }
    }
}

/// The delimiter after `F`: nothing, or `,` and a decimal byte value.
fn parse_delimiter(cursor: &mut Cursor<'_>, template: &str, property: &str) -> u8 {
    match cursor.peek() {
        None | Some(':') | Some('%') => DEFAULT_FIELD_DELIMITER,
        Some(',') => {
            cursor.bump();
            match cursor.take_number() {
                None => {
                    warn!(
                        template,
                        property,
                        "invalid character in frompos after \"F,\", using 9 (HT) as field delimiter"
                    );
                    DEFAULT_FIELD_DELIMITER
                }
                Some(value) => u8::try_from(value).unwrap_or_else(|_| {
                    warn!(
                        template,
                        property,
                        value,
                        "non-USASCII delimiter character value, using 9 (HT) as substitute"
                    );
                    DEFAULT_FIELD_DELIMITER
                }),
            }
        }
        Some(_) => {
            warn!(
                template,
                property,
                "invalid character in frompos after \"F\", using 9 (HT) as field delimiter"
            );
            DEFAULT_FIELD_DELIMITER
        }
    }
}

fn parse_to(cursor: &mut Cursor<'_>, template: &str, property: &str) -> usize {
    let to = if cursor.eat('$') {
        RANGE_END
    } else {
        cursor.take_number().unwrap_or(0)
    };
    skip_garbage(cursor, template, property);
    to
}

fn parse_pattern(
    cursor: &mut Cursor<'_>,
    template: &str,
    property: &str,
    engine: &dyn RegexEngine,
) -> Extraction {
    let Some(pattern) = cursor.take_through(REGEX_END_MARKER) else {
        let pattern = cursor.take_until_any(&['%']);
        warn!(template, property, pattern, "can not find regex end marker, field disabled");
        return Extraction::Regex {
            pattern: pattern.to_string(),
            compiled: None,
        };
    };

    let compiled = match engine.compile(pattern) {
        Ok(re) => {
            debug!(template, property, pattern, "regex compiled");
            Some(re)
        }
        Err(e) => {
            warn!(
                template,
                property,
                pattern,
                error = %e,
                "can not compile regex, field renders empty"
            );
            None
        }
    };
    skip_garbage(cursor, template, property);

    Extraction::Regex {
        pattern: pattern.to_string(),
        compiled,
    }
}

fn skip_garbage(cursor: &mut Cursor<'_>, template: &str, property: &str) {
    let extra = cursor.take_until_any(&['%', ':']);
    if !extra.is_empty() {
        warn!(template, property, extra, "extra characters in field position skipped");
    }
}
