//! Device overrides: per-backend source snippets for generated code.
//!
//! The code generator is backend-agnostic. Whenever it needs a line that
//! depends on the accelerator (a stream type, a device guard, a kernel
//! header), it asks the `DeviceOpOverrides` registered for the backend.
//!
//! Two families of snippets are produced:
//! - host snippets (Python wrapper code): stream import, set_device,
//!   synchronize, device guard
//! - native snippets (C++ wrapper / AOT code): guard and stream type
//!   names, kernel header and driver boilerplate
//!
//! Every method is pure. The strings are not validated here; the
//! generated translation unit is compiled downstream.

mod table;
mod xpu;

pub use table::{TableOverrides, TableSpec};
pub use xpu::XpuOverrides;

/// Extra global state a backend needs in generated native code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalScratch {
    /// C++ type of the scratch buffer (e.g. "at::Tensor").
    pub type_name: String,
    /// Variable name of the declaration.
    pub var_name: String,
}

impl GlobalScratch {
    pub fn new(type_name: impl Into<String>, var_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            var_name: var_name.into(),
        }
    }

    /// `type_name var_name;`
    pub fn declaration(&self) -> String {
        format!("{} {};", self.type_name, self.var_name)
    }
}

/// Launch grid, mirroring the `Grid` struct emitted by `kernel_driver`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl LaunchGrid {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// A launch is valid only if every dimension is strictly positive.
    pub fn is_non_zero(&self) -> bool {
        self.x > 0 && self.y > 0 && self.z > 0
    }
}

/// Backend-specific source emission for the code generator.
///
/// One implementation per backend, registered once under its name in
/// an `OverrideRegistry`. Implementations are shared across worker
/// threads, hence `Send + Sync`.
pub trait DeviceOpOverrides: Send + Sync {
    // --- Host (Python wrapper) snippets ---

    /// Import the "current raw stream" getter under a local alias.
    fn import_get_raw_stream_as(&self, name: &str) -> String;
    fn set_device(&self, device_idx: u32) -> String;
    fn synchronize(&self) -> String;
    /// Scoped device switch usable in a `with` statement.
    fn device_guard(&self, device_idx: u32) -> String;

    // --- Native (C++ wrapper) type and function names ---

    fn cpp_device_guard(&self) -> String;
    fn cpp_aoti_device_guard(&self) -> String;
    fn cpp_stream_guard(&self) -> String;
    fn cpp_aoti_stream_guard(&self) -> String;
    fn cpp_get_stream_from_external(&self) -> String;
    fn cpp_stream_type(&self) -> String;
    fn cpp_kernel_type(&self) -> String;
    fn cpp_device_ptr(&self) -> String;
    /// Runtime entry point returning the current stream for a device.
    fn aoti_get_stream(&self) -> String;

    // --- Kernel boilerplate ---

    /// Includes required to compile the generated kernels.
    fn kernel_header(&self) -> String;
    /// Support types for launching kernels (grid descriptor, etc.).
    fn kernel_driver(&self) -> String;

    /// Global scratch buffer declaration for workspace index `idx`.
    /// Most backends need none.
    fn cpp_global_scratch(&self, _idx: usize) -> Option<GlobalScratch> {
        None
    }

    /// Tensor-memory-accelerator descriptor helpers. Empty when the
    /// backend has no such capability.
    fn tma_descriptor_helpers(&self) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests;
