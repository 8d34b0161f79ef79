// Template subsystem of the log daemon: compiles output-format templates and
// renders them against log records.

// Template language
pub mod model;
pub mod compile;
pub mod regex;

// Registry
pub mod registry;
pub mod builtin;

// Rendering
pub mod extract;
pub mod sql;
pub mod render;
pub mod metrics;

// Infrastructure
pub mod conf;
pub mod runtime;

pub use compile::TemplateCompiler;
pub use extract::{LogRecord, PropertyResolver, StandardResolver};
pub use model::{Template, TemplateEntry};
pub use registry::{SharedRegistry, TemplateRegistry};
pub use render::{render, render_with, RenderError, Renderer};
