//! `devgen.toml`: generator configuration.
//!
//! ```toml
//! default_backend = "xpu"
//! log_filter = "devgen=debug"
//!
//! [backends.npu]
//! import_get_raw_stream_as = "from npu_rt import raw_stream as {name}"
//! set_device = "npu.set_device({idx})"
//! # ... every capability of `TableSpec`
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::device::TableSpec;
use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "DEVGEN_CONFIG";
/// File looked up in the working directory when nothing else is given.
pub const CONFIG_FILE: &str = "devgen.toml";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GenConfig {
    /// Backend used by `devgen show` when none is named.
    #[serde(default)]
    pub default_backend: Option<String>,
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Additional backends described as string tables.
    #[serde(default)]
    pub backends: BTreeMap<String, TableSpec>,
}

impl GenConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read config '{}': {}", path.display(), e),
                Span::dummy(),
            )
        })?;
        Self::parse(&content)
    }

    /// Parse configuration source. Errors carry the offending span.
    pub fn parse(content: &str) -> Result<Self, Diagnostic> {
        let config: GenConfig = toml::from_str(content).map_err(|e| {
            let span = e.span().map(Span::from_range).unwrap_or_else(Span::dummy);
            Diagnostic::error(e.message().to_string(), span)
        })?;

        for name in config.backends.keys() {
            if !is_valid_backend_name(name) {
                let span = backend_header_span(content, name);
                return Err(Diagnostic::error(
                    format!("invalid backend name '{}'", name),
                    span,
                )
                .with_help("backend names use ASCII letters, digits, '_' and '-'".to_string()));
            }
        }

        if let Some(default) = &config.default_backend {
            if !is_valid_backend_name(default) {
                return Err(Diagnostic::error(
                    format!("invalid default_backend '{}'", default),
                    Span::dummy(),
                ));
            }
        }

        debug!(backends = config.backends.len(), "configuration parsed");
        Ok(config)
    }

    /// Locate and load the configuration.
    ///
    /// Order: `explicit`, then `$DEVGEN_CONFIG`, then `./devgen.toml`.
    /// Returns the default configuration (and no path) if none exists.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), Diagnostic> {
        if let Some(path) = explicit {
            return Self::load(path).map(|c| (c, Some(path.to_path_buf())));
        }

        if let Ok(raw) = std::env::var(CONFIG_ENV) {
            if !raw.trim().is_empty() {
                let path = PathBuf::from(raw);
                return Self::load(&path).map(|c| (c, Some(path)));
            }
        }

        let cwd_path = PathBuf::from(CONFIG_FILE);
        if cwd_path.exists() {
            return Self::load(&cwd_path).map(|c| (c, Some(cwd_path)));
        }

        Ok((Self::default(), None))
    }
}

/// Span of the `[backends.NAME]` header, with NAME bare or quoted.
fn backend_header_span(content: &str, name: &str) -> Span {
    [
        format!("[backends.{}]", name),
        format!("[backends.\"{}\"]", name),
        format!("[backends.'{}']", name),
    ]
    .iter()
    .find_map(|header| {
        content
            .find(header.as_str())
            .map(|start| Span::from_range(start..start + header.len()))
    })
    .unwrap_or_else(Span::dummy)
}

fn is_valid_backend_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
