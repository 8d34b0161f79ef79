//! Options: the comma-separated option list inside a field descriptor.

use tracing::warn;

use super::cursor::Cursor;
use crate::model::{CaseConv, ControlCharPolicy, DateFormat, FieldEntry};

/// Longest option token kept; the remainder of an oversize token is skipped.
pub const MAX_FIELD_OPTION_LEN: usize = 63;

/// Apply options up to (not including) the closing `%`.
pub fn parse_field_options(cursor: &mut Cursor<'_>, field: &mut FieldEntry, template: &str) {
    while !cursor.is_eof() && cursor.peek() != Some('%') {
        let raw = cursor.take_until_any(&['%', ',']);
        cursor.eat(',');

        let token = bounded_token(raw, MAX_FIELD_OPTION_LEN);
        if token.is_empty() {
            continue;
        }
        apply_option(&token, field, template);
    }
}

/// Lower-case `raw` and truncate it to `max` characters.
pub(crate) fn bounded_token(raw: &str, max: usize) -> String {
    raw.chars().take(max).flat_map(char::to_lowercase).collect()
}

fn apply_option(token: &str, field: &mut FieldEntry, template: &str) {
    match token {
        "date-mysql" => field.date_format = DateFormat::MySql,
        "date-rfc3164" => field.date_format = DateFormat::Rfc3164,
        "date-rfc3339" => field.date_format = DateFormat::Rfc3339,
        "lowercase" => field.case_conv = CaseConv::Lower,
        "uppercase" => field.case_conv = CaseConv::Upper,
        "escape-cc" => field.control_chars = ControlCharPolicy::Escape,
        "drop-cc" => field.control_chars = ControlCharPolicy::Drop,
        "space-cc" => field.control_chars = ControlCharPolicy::Space,
        "drop-last-lf" => field.drop_last_lf = true,
        other => warn!(
            template,
            property = %field.property,
            option = other,
            "invalid field option ignored"
        ),
    }
}
