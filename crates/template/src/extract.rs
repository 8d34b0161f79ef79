//! Extract: property resolution and per-field transforms.
//!
//! Values are `Cow<str>`: a resolver may lend the record's own text or hand
//! over a freshly built string, and every step below keeps a borrowed value
//! borrowed as long as it does not need to change it.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::model::{CaseConv, ControlCharPolicy, DateFormat, Extraction, FieldEntry};

/// Rendered for a field-split index that does not exist in the value.
pub const FIELD_NOT_FOUND: &str = "**FIELD NOT FOUND**";

/// Rendered when a regex field does not match.
pub const NO_MATCH: &str = "**NO MATCH**";

/// A log record as seen by templates.
pub trait LogRecord {
    /// Textual value of a property, `None` if the record does not carry it.
    fn property(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Timestamp behind a property, used by the `date-*` field options.
    fn timestamp(&self, _name: &str) -> Option<DateTime<FixedOffset>> {
        None
    }
}

impl LogRecord for HashMap<String, String> {
    fn property(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }
}

/// Turns a field descriptor into its value for one record.
pub trait PropertyResolver<R: LogRecord + ?Sized> {
    fn resolve<'r>(&self, record: &'r R, field: &FieldEntry) -> Cow<'r, str>;
}

impl<R: LogRecord + ?Sized, P: PropertyResolver<R> + ?Sized> PropertyResolver<R> for &P {
    fn resolve<'r>(&self, record: &'r R, field: &FieldEntry) -> Cow<'r, str> {
        (**self).resolve(record, field)
    }
}

/// Date formatting, extraction, case conversion, LF and control-character
/// handling, in that order.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardResolver;

impl<R: LogRecord + ?Sized> PropertyResolver<R> for StandardResolver {
    fn resolve<'r>(&self, record: &'r R, field: &FieldEntry) -> Cow<'r, str> {
        let value = raw_value(record, field);
        let value = extract(value, &field.extraction);
        let value = convert_case(value, field.case_conv);
        let value = if field.drop_last_lf {
            drop_last_lf(value)
        } else {
            value
        };
        apply_control_chars(value, field.control_chars)
    }
}

fn raw_value<'r, R: LogRecord + ?Sized>(record: &'r R, field: &FieldEntry) -> Cow<'r, str> {
    if field.date_format != DateFormat::Default {
        if let Some(ts) = record.timestamp(&field.property) {
            return Cow::Owned(format_date(&ts, field.date_format));
        }
    }
    record.property(&field.property).unwrap_or(Cow::Borrowed(""))
}

pub fn format_date(ts: &DateTime<FixedOffset>, format: DateFormat) -> String {
    match format {
        DateFormat::MySql => ts.format("%Y%m%d%H%M%S").to_string(),
        DateFormat::Rfc3164 => ts.format("%b %e %H:%M:%S").to_string(),
        DateFormat::Rfc3339 | DateFormat::Default => {
            ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
        }
    }
}

pub fn extract<'a>(value: Cow<'a, str>, extraction: &Extraction) -> Cow<'a, str> {
    match extraction {
        Extraction::WholeValue => value,
        Extraction::Range { from, to } => map_slice(value, |s| char_range(s, *from, *to)),
        Extraction::DelimitedField { index, delimiter } => {
            match map_opt_slice(value, |s| delimited_field(s, *index, *delimiter)) {
                Some(v) => v,
                None => Cow::Borrowed(FIELD_NOT_FOUND),
            }
        }
        Extraction::Regex { compiled: None, .. } => Cow::Borrowed(""),
        Extraction::Regex { compiled: Some(re), .. } => {
            match map_opt_slice(value, |s| re.find(s)) {
                Some(v) => v,
                None => Cow::Borrowed(NO_MATCH),
            }
        }
    }
}

/// Characters `from..=to` (1-based), clamped to the value. `from == 0`
/// behaves like 1.
pub fn char_range(s: &str, from: usize, to: usize) -> &str {
    let skip = from.saturating_sub(1);
    let take = to.saturating_sub(skip);

    let mut indices = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
    let Some(start) = indices.nth(skip) else {
        return "";
    };
    let end = if take == 0 {
        start
    } else {
        indices.nth(take - 1).unwrap_or(s.len())
    };
    &s[start..end]
}

/// The `index`-th (1-based) token separated by `delimiter`.
pub fn delimited_field(s: &str, index: usize, delimiter: u8) -> Option<&str> {
    if index == 0 {
        return None;
    }
    let delimiter = char::from(delimiter);
    s.split(delimiter).nth(index - 1)
}

fn map_slice<'a>(value: Cow<'a, str>, f: impl for<'s> Fn(&'s str) -> &'s str) -> Cow<'a, str> {
    match value {
        Cow::Borrowed(s) => Cow::Borrowed(f(s)),
        Cow::Owned(s) => Cow::Owned(f(&s).to_string()),
    }
}

fn map_opt_slice<'a>(
    value: Cow<'a, str>,
    f: impl for<'s> Fn(&'s str) -> Option<&'s str>,
) -> Option<Cow<'a, str>> {
    match value {
        Cow::Borrowed(s) => f(s).map(Cow::Borrowed),
        Cow::Owned(s) => f(&s).map(|v| Cow::Owned(v.to_string())),
    }
}

pub fn convert_case(value: Cow<'_, str>, conv: CaseConv) -> Cow<'_, str> {
    match conv {
        CaseConv::None => value,
        CaseConv::Lower if !value.chars().any(char::is_uppercase) => value,
        CaseConv::Upper if !value.chars().any(char::is_lowercase) => value,
        CaseConv::Lower => Cow::Owned(value.to_lowercase()),
        CaseConv::Upper => Cow::Owned(value.to_uppercase()),
    }
}

pub fn drop_last_lf(value: Cow<'_, str>) -> Cow<'_, str> {
    match value {
        Cow::Borrowed(s) => Cow::Borrowed(s.strip_suffix('\n').unwrap_or(s)),
        Cow::Owned(mut s) => {
            if s.ends_with('\n') {
                s.pop();
            }
            Cow::Owned(s)
        }
    }
}

fn is_control(c: char) -> bool {
    c.is_ascii_control()
}

pub fn apply_control_chars(value: Cow<'_, str>, policy: ControlCharPolicy) -> Cow<'_, str> {
    if policy == ControlCharPolicy::None || !value.chars().any(is_control) {
        return value;
    }
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if !is_control(c) {
            out.push(c);
            continue;
        }
        match policy {
            ControlCharPolicy::Escape => out.push_str(&format!("#{:03o}", c as u32)),
            ControlCharPolicy::Space => out.push(' '),
            ControlCharPolicy::Drop | ControlCharPolicy::None => {}
        }
    }
    Cow::Owned(out)
}
