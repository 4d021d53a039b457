//! Snippet assembly on top of `DeviceOpOverrides`.
//!
//! The full wrapper generator lives elsewhere; this module assembles the
//! backend-dependent pieces it needs, pulling each name from the
//! overrides exactly once so every reference in a unit agrees (the same
//! stream type at declaration and guard sites, the same guard class).

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::device::{DeviceOpOverrides, LaunchGrid};
use crate::error::Result;
use crate::registry::OverrideRegistry;

/// Alias under which the raw-stream getter is imported.
pub const RAW_STREAM_ALIAS: &str = "get_raw_stream";

/// Host-side (Python) prelude of a wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPrelude {
    pub import: String,
    pub set_device: String,
    pub device_guard: String,
    pub synchronize: String,
    pub device_idx: u32,
}

impl HostPrelude {
    pub fn new(overrides: &dyn DeviceOpOverrides, device_idx: u32) -> Self {
        Self {
            import: overrides.import_get_raw_stream_as(RAW_STREAM_ALIAS),
            set_device: overrides.set_device(device_idx),
            device_guard: overrides.device_guard(device_idx),
            synchronize: overrides.synchronize(),
            device_idx,
        }
    }

    pub fn render(&self) -> String {
        let idx = self.device_idx;
        let mut out = String::new();
        out.push_str(&self.import);
        out.push_str("\n\n");
        out.push_str(&self.set_device);
        out.push('\n');
        out.push_str(&format!("with {}:\n", self.device_guard));
        out.push_str(&format!(
            "    stream{} = {}({})\n",
            idx, RAW_STREAM_ALIAS, idx
        ));
        out.push_str(&self.synchronize);
        out.push('\n');
        out
    }
}

/// Native (C++) prelude of a wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativePrelude {
    pub kernel_header: String,
    pub kernel_driver: String,
    pub stream_type: String,
    pub stream_guard: String,
    pub device_guard: String,
    pub get_stream: String,
    pub scratch: Option<String>,
    pub tma_helpers: String,
    pub device_idx: u32,
}

impl NativePrelude {
    pub fn new(overrides: &dyn DeviceOpOverrides, device_idx: u32) -> Self {
        Self {
            kernel_header: overrides.kernel_header(),
            kernel_driver: overrides.kernel_driver(),
            stream_type: overrides.cpp_stream_type(),
            stream_guard: overrides.cpp_aoti_stream_guard(),
            device_guard: overrides.cpp_aoti_device_guard(),
            get_stream: overrides.aoti_get_stream(),
            scratch: overrides
                .cpp_global_scratch(device_idx as usize)
                .map(|s| s.declaration()),
            tma_helpers: overrides.tma_descriptor_helpers(),
            device_idx,
        }
    }

    pub fn render(&self) -> String {
        let idx = self.device_idx;
        let mut out = String::new();
        out.push_str(self.kernel_header.trim_end());
        out.push('\n');
        out.push_str(&self.kernel_driver);
        if !self.tma_helpers.is_empty() {
            out.push_str(self.tma_helpers.trim_end());
            out.push('\n');
        }
        if let Some(scratch) = &self.scratch {
            out.push_str(scratch);
            out.push('\n');
        }
        out.push_str(&format!("{} device_guard({});\n", self.device_guard, idx));
        out.push_str(&format!("{} stream{};\n", self.stream_type, idx));
        out.push_str(&format!(
            "AOTI_TORCH_ERROR_CODE_CHECK({}({}, (void**)&stream{}));\n",
            self.get_stream, idx, idx
        ));
        out.push_str(&format!(
            "{} stream_guard(stream{}, {});\n",
            self.stream_guard, idx, idx
        ));
        out
    }
}

/// Kernel launch through the emitted `Grid` helper.
///
/// Returns `None` when the grid is statically empty; such launches are
/// dropped instead of emitted behind a runtime check.
pub fn launch_call(kernel: &str, grid: LaunchGrid, device_idx: u32) -> Option<String> {
    if !grid.is_non_zero() {
        trace!(kernel, ?grid, "skipping launch of empty grid");
        return None;
    }
    Some(format!(
        "Grid {k}_grid = Grid({x}, {y}, {z});\n\
         if ({k}_grid.is_non_zero()) {{\n    \
         launchKernel({k}, {k}_grid.grid_x, {k}_grid.grid_y, {k}_grid.grid_z, {k}_args, stream{idx});\n\
         }}\n",
        k = kernel,
        x = grid.x,
        y = grid.y,
        z = grid.z,
        idx = device_idx,
    ))
}

/// One independent translation unit to render.
#[derive(Clone, Debug)]
pub struct CompileUnit {
    pub name: String,
    pub device_idx: u32,
    pub kernels: Vec<(String, LaunchGrid)>,
}

impl CompileUnit {
    pub fn new(name: impl Into<String>, device_idx: u32) -> Self {
        Self {
            name: name.into(),
            device_idx,
            kernels: Vec::new(),
        }
    }

    pub fn with_kernel(mut self, kernel: impl Into<String>, grid: LaunchGrid) -> Self {
        self.kernels.push((kernel.into(), grid));
        self
    }
}

/// Rendered host and native halves of a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedUnit {
    pub name: String,
    pub host: String,
    pub native: String,
}

pub fn render_unit(overrides: &dyn DeviceOpOverrides, unit: &CompileUnit) -> RenderedUnit {
    let host = HostPrelude::new(overrides, unit.device_idx).render();
    let mut native = NativePrelude::new(overrides, unit.device_idx).render();
    for (kernel, grid) in &unit.kernels {
        if let Some(call) = launch_call(kernel, *grid, unit.device_idx) {
            native.push_str(&call);
        }
    }
    RenderedUnit {
        name: unit.name.clone(),
        host,
        native,
    }
}

/// Render many units for one backend on the rayon pool.
pub fn render_units(
    registry: &OverrideRegistry,
    backend: &str,
    units: &[CompileUnit],
) -> Result<Vec<RenderedUnit>> {
    let overrides = registry.lookup(backend)?;
    debug!(backend, units = units.len(), "rendering units");
    Ok(units
        .par_iter()
        .map(|unit| render_unit(overrides.as_ref(), unit))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::XpuOverrides;
    use crate::error::Error;

    #[test]
    fn test_host_prelude_xpu() {
        let host = HostPrelude::new(&XpuOverrides::new(), 1).render();
        assert_eq!(
            host,
            "from torch._C import _xpu_getCurrentRawStream as get_raw_stream\n\
             \n\
             torch.xpu.set_device(1)\n\
             with torch.xpu._DeviceGuard(1):\n    \
             stream1 = get_raw_stream(1)\n\
             torch.xpu.synchronize()\n"
        );
    }

    #[test]
    fn test_native_prelude_uses_one_stream_type() {
        let native = NativePrelude::new(&XpuOverrides::new(), 0).render();
        assert!(native.contains("sycl::queue* stream0;"));
        assert!(native.contains("AOTIXpuStreamGuard stream_guard(stream0, 0);"));
        assert!(native.contains("AOTIXpuGuard device_guard(0);"));
        assert!(native.contains("aoti_torch_get_current_xpu_stream(0, (void**)&stream0)"));
        assert!(!native.contains("global_scratch"));
    }

    #[test]
    fn test_launch_call_skips_empty_grid() {
        assert!(launch_call("k0", LaunchGrid::new(0, 1, 1), 0).is_none());
        let call = launch_call("k0", LaunchGrid::new(4, 1, 1), 0).unwrap();
        assert!(call.starts_with("Grid k0_grid = Grid(4, 1, 1);"));
        assert!(call.contains("stream0"));
    }

    #[test]
    fn test_render_units_parallel() {
        let registry = OverrideRegistry::with_builtins();
        let units: Vec<CompileUnit> = (0..16)
            .map(|i| {
                CompileUnit::new(format!("unit{}", i), i % 2)
                    .with_kernel("k_add", LaunchGrid::new(i + 1, 1, 1))
                    .with_kernel("k_empty", LaunchGrid::new(0, 1, 1))
            })
            .collect();
        let rendered = render_units(&registry, "xpu", &units).unwrap();
        assert_eq!(rendered.len(), 16);
        for (i, unit) in rendered.iter().enumerate() {
            assert_eq!(unit.name, format!("unit{}", i));
            assert!(unit.native.contains("k_add_grid"));
            assert!(!unit.native.contains("k_empty_grid"));
        }
    }

    #[test]
    fn test_render_units_unknown_backend() {
        let registry = OverrideRegistry::with_builtins();
        let err = render_units(&registry, "cuda", &[]).unwrap_err();
        assert!(matches!(err, Error::BackendNotFound(ref b) if b == "cuda"));
    }
}
