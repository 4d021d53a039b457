pub mod check;
pub mod list;
pub mod show;

use std::path::Path;
use std::process;

use devgen::{GenConfig, OverrideRegistry};

/// Configuration and registry shared by every subcommand.
pub struct Session {
    pub config: GenConfig,
    pub registry: OverrideRegistry,
}

/// Discover the configuration, install logging, and build the registry.
/// Exits the process on configuration errors.
pub fn open_session(explicit: Option<&Path>) -> Session {
    let (config, path) = match GenConfig::discover(explicit) {
        Ok(found) => found,
        Err(diag) => {
            devgen::logging::init_tracing(None);
            let shown = explicit
                .map(|p| p.display().to_string())
                .or_else(|| std::env::var(devgen::config::CONFIG_ENV).ok())
                .unwrap_or_else(|| devgen::config::CONFIG_FILE.to_string());
            report_config_error(&diag, &shown);
            process::exit(1);
        }
    };
    devgen::logging::init_tracing(config.log_filter.as_deref());
    if let Some(path) = &path {
        tracing::debug!(path = %path.display(), "loaded configuration");
    }

    let registry = OverrideRegistry::with_builtins();
    registry.register_from_config(&config);
    Session { config, registry }
}

/// Render a configuration diagnostic against the file's source when it
/// can be read, otherwise print the bare message.
pub fn report_config_error(diag: &devgen::diagnostic::Diagnostic, filename: &str) {
    match std::fs::read_to_string(filename) {
        Ok(source) if !diag.span.is_dummy() => diag.render(filename, &source),
        _ => eprintln!("error: {}", diag.message),
    }
}
