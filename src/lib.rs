pub mod config;
pub mod device;
pub mod diagnostic;
pub mod emit;
pub mod error;
pub mod logging;
pub mod registry;
pub mod span;
pub mod subclass;

// Re-exports: preserves `devgen::X` paths used by the CLI and tests
pub use config::GenConfig;
pub use device::{DeviceOpOverrides, LaunchGrid, TableOverrides, TableSpec, XpuOverrides};
pub use emit::{render_units, CompileUnit, HostPrelude, NativePrelude, RenderedUnit};
pub use error::{Error, Result};
pub use registry::{global, OverrideRegistry, Overrides};
