//! Render: executes a compiled template against one record.
//!
//! Rendering is a pure function of template and record. The output buffer
//! grows with `try_reserve`, so running out of memory (or exceeding the
//! configured output limit) fails the whole render instead of aborting the
//! process or returning a truncated line.

use std::borrow::Cow;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::extract::{LogRecord, PropertyResolver, StandardResolver};
use crate::metrics::RenderMetrics;
use crate::model::{Template, TemplateEntry};
use crate::sql::{self, SqlDialect};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Allocation of {requested} bytes failed while rendering")]
    Allocation { requested: usize },

    #[error("Template is disabled")]
    Disabled,
}

/// Render `template` for `record` with the standard resolver.
pub fn render<R: LogRecord + ?Sized>(
    template: &Template,
    record: &R,
) -> Result<String, RenderError> {
    Renderer::new().render(template, record)
}

/// Render `template` for `record`, resolving fields through `resolver`.
pub fn render_with<R, P>(
    template: &Template,
    record: &R,
    resolver: &P,
) -> Result<String, RenderError>
where
    R: LogRecord + ?Sized,
    P: PropertyResolver<R> + ?Sized,
{
    Renderer::with_resolver(resolver).render(template, record)
}

#[derive(Debug, Clone, Default)]
pub struct Renderer<P = StandardResolver> {
    resolver: P,
    /// 0 means unlimited.
    max_output_bytes: usize,
    metrics: Option<Arc<RenderMetrics>>,
}

impl Renderer<StandardResolver> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> Renderer<P> {
    pub fn with_resolver(resolver: P) -> Self {
        Self {
            resolver,
            max_output_bytes: 0,
            metrics: None,
        }
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RenderMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn render<R>(&self, template: &Template, record: &R) -> Result<String, RenderError>
    where
        R: LogRecord + ?Sized,
        P: PropertyResolver<R>,
    {
        let result = self.render_entries(template, record);
        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(out) => metrics.record_render(out.len()),
                Err(_) => metrics.record_failure(),
            }
        }
        if let Err(e) = &result {
            debug!(template = template.name(), error = %e, "render failed");
        }
        result
    }

    fn render_entries<R>(&self, template: &Template, record: &R) -> Result<String, RenderError>
    where
        R: LogRecord + ?Sized,
        P: PropertyResolver<R>,
    {
        if template.is_disabled() {
            return Err(RenderError::Disabled);
        }
        let dialect = SqlDialect::for_mode(template.sql_mode());

        let mut out = String::new();
        for entry in template.entries() {
            match entry {
                TemplateEntry::Constant(text) => self.append(&mut out, text)?,
                TemplateEntry::Field(field) => {
                    let value = self.resolver.resolve(record, field);
                    let value = match dialect {
                        Some(dialect) => self.escape(value, dialect)?,
                        None => value,
                    };
                    self.append(&mut out, &value)?;
                }
            }
        }
        Ok(out)
    }

    fn escape<'v>(
        &self,
        value: Cow<'v, str>,
        dialect: SqlDialect,
    ) -> Result<Cow<'v, str>, RenderError> {
        let escaped = sql::escape(value, dialect)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_sql_escape(escaped.degraded);
        }
        Ok(escaped.value)
    }

    /// Append `text` without NUL characters, failing instead of aborting
    /// when the buffer cannot grow.
    fn append(&self, out: &mut String, text: &str) -> Result<(), RenderError> {
        let nuls = text.bytes().filter(|b| *b == 0).count();
        let needed = text.len() - nuls;
        let requested = out.len().saturating_add(needed);

        if self.max_output_bytes > 0 && requested > self.max_output_bytes {
            return Err(RenderError::Allocation { requested });
        }
        out.try_reserve(needed)
            .map_err(|_| RenderError::Allocation { requested })?;

        if nuls == 0 {
            out.push_str(text);
        } else {
            out.extend(text.chars().filter(|c| *c != '\0'));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::compile::TemplateCompiler;
    use crate::model::FieldEntry;

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn compile(spec: &str) -> Template {
        TemplateCompiler::new().compile_str("t", spec)
    }

    /// Resolver handing out freshly built values.
    struct Shouting;

    impl PropertyResolver<HashMap<String, String>> for Shouting {
        fn resolve<'r>(
            &self,
            record: &'r HashMap<String, String>,
            field: &FieldEntry,
        ) -> Cow<'r, str> {
            let v = record.get(&field.property).map(String::as_str).unwrap_or("");
            Cow::Owned(format!("{}!", v))
        }
    }

    // ── Basics ──────────────────────────────────────────────────

    #[test]
    fn test_end_to_end() {
        let tpl = compile(r#""%msg% - %hostname:1:5%""#);
        let rec = record(&[("msg", "hi"), ("hostname", "server01")]);
        assert_eq!(render(&tpl, &rec).unwrap(), "hi - serve");
    }

    #[test]
    fn test_constant_only() {
        let tpl = compile(r#""\n\r\\\%\65""#);
        assert_eq!(render(&tpl, &record(&[])).unwrap(), "\n\r\\%A");
    }

    #[test]
    fn test_reversed_range() {
        let tpl = compile(r#""%msg:5:2%""#);
        assert_eq!(render(&tpl, &record(&[("msg", "abcdef")])).unwrap(), "bcde");
    }

    #[test]
    fn test_delimited_field() {
        let tpl = compile(r#""%msg:F,44:2%""#);
        assert_eq!(render(&tpl, &record(&[("msg", "a,bb,ccc")])).unwrap(), "bb");
    }

    #[test]
    fn test_missing_property_renders_empty() {
        let tpl = compile(r#""[%nothere%]""#);
        assert_eq!(render(&tpl, &record(&[])).unwrap(), "[]");
    }

    #[test]
    fn test_disabled_template_fails() {
        let tpl = compile("no quote");
        assert_eq!(render(&tpl, &record(&[])), Err(RenderError::Disabled));
    }

    #[test]
    fn test_nul_characters_removed() {
        let tpl = compile(r#""<%msg%>""#);
        let rec = record(&[("msg", "a\0b")]);
        assert_eq!(render(&tpl, &rec).unwrap(), "<ab>");
    }

    #[test]
    fn test_render_is_repeatable() {
        let tpl = compile(r#""%msg:::uppercase%""#);
        let rec = record(&[("msg", "x")]);
        assert_eq!(render(&tpl, &rec).unwrap(), render(&tpl, &rec).unwrap());
    }

    // ── SQL ─────────────────────────────────────────────────────

    #[test]
    fn test_sql_mode_escapes_fields_only() {
        let tpl = compile(r#""insert into t values ('%msg%')", sql"#);
        let rec = record(&[("msg", r"it's a\b")]);
        assert_eq!(
            render(&tpl, &rec).unwrap(),
            r"insert into t values ('it\'s a\\b')"
        );
    }

    #[test]
    fn test_stdsql_mode() {
        let tpl = compile(r#""'%msg%'", stdsql"#);
        let rec = record(&[("msg", r"O'Brien\")]);
        assert_eq!(render(&tpl, &rec).unwrap(), r"'O''Brien\'");
    }

    #[test]
    fn test_sql_metrics_recorded() {
        let metrics = Arc::new(RenderMetrics::new());
        let renderer = Renderer::new().with_metrics(Arc::clone(&metrics));
        let tpl = compile(r#""%msg%", sql"#);
        renderer.render(&tpl, &record(&[("msg", "a'b")])).unwrap();
        renderer.render(&tpl, &record(&[("msg", "ab")])).unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.renders, 2);
        assert_eq!(snap.sql_escapes, 2);
        assert_eq!(snap.sql_emergency_escapes, 0);
    }

    // ── Limits and resolvers ────────────────────────────────────

    #[test]
    fn test_output_limit_fails_whole_render() {
        let metrics = Arc::new(RenderMetrics::new());
        let renderer = Renderer::new()
            .with_max_output_bytes(8)
            .with_metrics(Arc::clone(&metrics));
        let tpl = compile(r#""head %msg%""#);

        assert_eq!(renderer.render(&tpl, &record(&[("msg", "abc")])).unwrap(), "head abc");
        let err = renderer
            .render(&tpl, &record(&[("msg", "abcd")]))
            .unwrap_err();
        assert_eq!(err, RenderError::Allocation { requested: 9 });
        assert_eq!(metrics.snapshot().failures, 1);
    }

    #[test]
    fn test_custom_resolver() {
        let renderer = Renderer::with_resolver(Shouting);
        let tpl = compile(r#""%a% %b%""#);
        let rec = record(&[("a", "hey")]);
        assert_eq!(renderer.render(&tpl, &rec).unwrap(), "hey! !");
    }

    #[test]
    fn test_render_with_borrowed_resolver() {
        let tpl = compile(r#""<%a%>""#);
        let rec = record(&[("a", "x")]);
        assert_eq!(render_with(&tpl, &rec, &Shouting).unwrap(), "<x!>");
    }
}
