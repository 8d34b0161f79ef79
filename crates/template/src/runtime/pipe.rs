//! Pipe: renders JSON records from a reader with one template.

use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::conf::TemplateConfig;
use crate::extract::LogRecord;
use crate::metrics::RenderMetrics;
use crate::model::Template;
use crate::registry::SharedRegistry;
use crate::render::Renderer;

/// A record given as one JSON object. Strings are lent out as-is; numbers
/// and booleans are rendered as text; `null` counts as absent.
#[derive(Debug, Clone, Default)]
pub struct JsonRecord(Map<String, Value>);

impl JsonRecord {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line).map(JsonRecord)
    }
}

impl LogRecord for JsonRecord {
    fn property(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.0.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    fn timestamp(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        match self.0.get(name)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s).ok(),
            _ => None,
        }
    }
}

/// Render stdin to stdout with the template named by `config.render`.
/// Without one there is nothing to do.
pub fn serve(
    registry: SharedRegistry,
    config: TemplateConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(name) = config.render.as_deref() else {
        info!("No template selected for rendering, exiting");
        return Ok(());
    };
    let template = registry
        .find_by_name(name)
        .ok_or_else(|| format!("template '{}' not found", name))?;

    let metrics = Arc::new(RenderMetrics::new());
    let renderer = Renderer::new()
        .with_max_output_bytes(config.max_output_bytes)
        .with_metrics(Arc::clone(&metrics));

    let stats = render_stream(io::stdin().lock(), io::stdout().lock(), &template, &renderer)?;
    info!(
        "Rendered {} records ({} skipped), metrics: {}",
        stats.rendered,
        stats.skipped,
        serde_json::to_string(&metrics.snapshot())?
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// Render every non-blank line of `input` and write the results to `output`.
///
/// Lines that are not JSON objects, or whose render fails, are logged and
/// skipped; only I/O errors end the loop.
pub fn render_stream<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    template: &Template,
    renderer: &Renderer,
) -> io::Result<PipeStats> {
    let mut stats = PipeStats::default();

    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = match JsonRecord::parse(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "skipping malformed record");
                stats.skipped += 1;
                continue;
            }
        };

        match renderer.render(template, &record) {
            Ok(out) => {
                output.write_all(out.as_bytes())?;
                stats.rendered += 1;
            }
            Err(e) => {
                warn!(line = lineno + 1, template = template.name(), error = %e, "render failed");
                stats.skipped += 1;
            }
        }
    }

    output.flush()?;
    Ok(stats)
}
