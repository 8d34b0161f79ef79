//! Boot: logging init, config load, registry construction.

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::builtin;
use crate::compile::TemplateCompiler;
use crate::conf::TemplateConfig;
use crate::registry::{RegistryError, SharedRegistry, TemplateRegistry};

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "template=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config and build the registry: built-ins, boundary, then the
/// configured directives.
pub fn boot() -> Result<(SharedRegistry, TemplateConfig), Box<dyn std::error::Error>> {
    info!("Starting template v{}", env!("CARGO_PKG_VERSION"));

    let config = TemplateConfig::load()?;
    info!(
        "Loaded configuration: directives={}, regex={}",
        config.directives.len(),
        config.regex
    );

    let registry = build_registry(&config)?;
    info!("Registered {} templates", registry.snapshot().len());
    debug!("Template list:\n{}", registry.snapshot());

    Ok((registry, config))
}

pub fn build_registry(config: &TemplateConfig) -> Result<SharedRegistry, RegistryError> {
    let compiler = config.compiler();
    let mut registry = TemplateRegistry::new();
    builtin::register_builtins(&mut registry, &compiler)?;

    let shared = SharedRegistry::new(registry);
    load_directives(&shared, config, &compiler);
    Ok(shared)
}

/// Replace all configuration templates with those in `config`.
///
/// Returns the number of directives that produced a usable template; the
/// rest are logged and skipped.
pub fn load_directives(
    registry: &SharedRegistry,
    config: &TemplateConfig,
    compiler: &TemplateCompiler,
) -> usize {
    registry.reload(|reg| {
        let mut loaded = 0;
        for directive in &config.directives {
            match reg.register(compiler.compile_directive(directive)) {
                Ok(template) => {
                    debug!(template = template.name(), "template registered");
                    loaded += 1;
                }
                Err(e) => warn!(directive = %directive, error = %e, "template not registered"),
            }
        }
        loaded
    })
}
