use std::process;

use clap::{Args, ValueEnum};

use devgen::emit::{HostPrelude, NativePrelude};

use super::Session;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Section {
    Host,
    Native,
    #[default]
    All,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Backend name (default: config `default_backend`, else xpu)
    pub backend: Option<String>,
    /// Device index substituted into the snippets
    #[arg(long, default_value_t = 0)]
    pub device: u32,
    /// Which prelude to print
    #[arg(long, value_enum, default_value_t = Section::All)]
    pub section: Section,
}

pub fn cmd_show(session: &Session, args: ShowArgs) {
    let ShowArgs {
        backend,
        device,
        section,
    } = args;
    let backend = backend
        .or_else(|| session.config.default_backend.clone())
        .unwrap_or_else(|| "xpu".to_string());

    let overrides = match session.registry.lookup(&backend) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("  available: {}", session.registry.backends().join(", "));
            process::exit(1);
        }
    };

    if matches!(section, Section::Host | Section::All) {
        if section == Section::All {
            println!("# --- host ---");
        }
        print!("{}", HostPrelude::new(overrides.as_ref(), device).render());
    }
    if matches!(section, Section::Native | Section::All) {
        if section == Section::All {
            println!("// --- native ---");
        }
        print!("{}", NativePrelude::new(overrides.as_ref(), device).render());
    }
}
