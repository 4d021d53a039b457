//! XPU overrides for Intel GPUs through SYCL.
//!
//! Streams are `sycl::queue*`, kernels are `sycl::kernel` handles, and
//! the AOT runtime reaches the queue through
//! `aoti_torch_get_current_xpu_stream`.

use super::{DeviceOpOverrides, GlobalScratch};

const KERNEL_HEADER: &str = r#"
#include <torch/csrc/inductor/aoti_runtime/sycl_runtime_wrappers.h>
"#;

const KERNEL_DRIVER: &str = r#"
namespace {

struct Grid {
    Grid(uint32_t x, uint32_t y, uint32_t z)
      : grid_x(x), grid_y(y), grid_z(z) {}
    uint32_t grid_x;
    uint32_t grid_y;
    uint32_t grid_z;

    bool is_non_zero() {
        return grid_x > 0 && grid_y > 0 && grid_z > 0;
    }
};

}  // anonymous namespace

"#;

#[derive(Clone, Copy, Debug, Default)]
pub struct XpuOverrides;

impl XpuOverrides {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceOpOverrides for XpuOverrides {
    fn import_get_raw_stream_as(&self, name: &str) -> String {
        format!("from torch._C import _xpu_getCurrentRawStream as {}", name)
    }

    fn set_device(&self, device_idx: u32) -> String {
        format!("torch.xpu.set_device({})", device_idx)
    }

    fn synchronize(&self) -> String {
        "torch.xpu.synchronize()".to_string()
    }

    fn device_guard(&self, device_idx: u32) -> String {
        format!("torch.xpu._DeviceGuard({})", device_idx)
    }

    fn cpp_device_guard(&self) -> String {
        "at::DeviceGuard".to_string()
    }

    fn cpp_aoti_device_guard(&self) -> String {
        "AOTIXpuGuard".to_string()
    }

    fn cpp_stream_guard(&self) -> String {
        "at::xpu::XPUStreamGuard".to_string()
    }

    fn cpp_aoti_stream_guard(&self) -> String {
        "AOTIXpuStreamGuard".to_string()
    }

    fn cpp_get_stream_from_external(&self) -> String {
        "at::xpu::getStreamFromExternal".to_string()
    }

    fn cpp_stream_type(&self) -> String {
        "sycl::queue*".to_string()
    }

    fn cpp_kernel_type(&self) -> String {
        "std::unique_ptr<sycl::kernel>".to_string()
    }

    fn cpp_device_ptr(&self) -> String {
        "void *".to_string()
    }

    fn aoti_get_stream(&self) -> String {
        "aoti_torch_get_current_xpu_stream".to_string()
    }

    fn kernel_header(&self) -> String {
        KERNEL_HEADER.to_string()
    }

    fn kernel_driver(&self) -> String {
        KERNEL_DRIVER.to_string()
    }

    fn cpp_global_scratch(&self, _idx: usize) -> Option<GlobalScratch> {
        None
    }
}
