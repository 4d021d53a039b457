use std::path::PathBuf;
use std::process;

use clap::Args;

use devgen::{GenConfig, OverrideRegistry};

use super::report_config_error;

#[derive(Args)]
pub struct CheckArgs {
    /// Configuration file to validate
    pub config: PathBuf,
}

pub fn cmd_check(args: CheckArgs) {
    let CheckArgs { config } = args;
    let source = match std::fs::read_to_string(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", config.display(), e);
            process::exit(1);
        }
    };

    let parsed = match GenConfig::parse(&source) {
        Ok(c) => c,
        Err(diag) => {
            report_config_error(&diag, &config.to_string_lossy());
            process::exit(1);
        }
    };

    let registry = OverrideRegistry::with_builtins();
    registry.register_from_config(&parsed);
    if let Some(default) = &parsed.default_backend {
        if !registry.contains(default) {
            eprintln!(
                "error: default_backend '{}' is not a known backend ({})",
                default,
                registry.backends().join(", ")
            );
            process::exit(1);
        }
    }
    eprintln!(
        "OK: {} ({} backend{})",
        config.display(),
        parsed.backends.len(),
        if parsed.backends.len() == 1 { "" } else { "s" }
    );
}
