use super::*;

fn npu_spec() -> TableSpec {
    toml::from_str(
        r##"
import_get_raw_stream_as = "from npu_rt import current_raw_stream as {name}"
set_device = "npu.set_device({idx})"
synchronize = "npu.synchronize()"
device_guard = "npu.DeviceGuard({idx})"
cpp_device_guard = "npu::DeviceGuard"
cpp_aoti_device_guard = "AOTINpuGuard"
cpp_stream_guard = "npu::StreamGuard"
cpp_aoti_stream_guard = "AOTINpuStreamGuard"
cpp_get_stream_from_external = "npu::getStreamFromExternal"
cpp_stream_type = "npuStream_t"
cpp_kernel_type = "npuFunction_t"
cpp_device_ptr = "npuDevicePtr_t"
aoti_get_stream = "aoti_torch_get_current_npu_stream"
kernel_header = "#include <npu_runtime.h>"

[global_scratch]
type_name = "npuDevicePtr_t"
var_name = "global_scratch_{idx}"
"##,
    )
    .unwrap()
}

#[test]
fn test_grid_all_positive_is_non_zero() {
    assert!(LaunchGrid::new(1, 1, 1).is_non_zero());
    assert!(LaunchGrid::new(128, 4, 2).is_non_zero());
}

#[test]
fn test_grid_any_zero_dimension_is_invalid() {
    assert!(!LaunchGrid::new(0, 1, 1).is_non_zero());
    assert!(!LaunchGrid::new(1, 0, 1).is_non_zero());
    assert!(!LaunchGrid::new(1, 1, 0).is_non_zero());
    assert!(!LaunchGrid::new(0, 0, 0).is_non_zero());
}

#[test]
fn test_xpu_host_snippets() {
    let xpu = XpuOverrides::new();
    assert_eq!(
        xpu.import_get_raw_stream_as("get_raw_stream"),
        "from torch._C import _xpu_getCurrentRawStream as get_raw_stream"
    );
    assert_eq!(xpu.set_device(3), "torch.xpu.set_device(3)");
    assert_eq!(xpu.synchronize(), "torch.xpu.synchronize()");
    assert_eq!(xpu.device_guard(0), "torch.xpu._DeviceGuard(0)");
}

#[test]
fn test_xpu_native_names() {
    let xpu = XpuOverrides::new();
    assert_eq!(xpu.cpp_device_guard(), "at::DeviceGuard");
    assert_eq!(xpu.cpp_aoti_device_guard(), "AOTIXpuGuard");
    assert_eq!(xpu.cpp_stream_guard(), "at::xpu::XPUStreamGuard");
    assert_eq!(xpu.cpp_aoti_stream_guard(), "AOTIXpuStreamGuard");
    assert_eq!(
        xpu.cpp_get_stream_from_external(),
        "at::xpu::getStreamFromExternal"
    );
    assert_eq!(xpu.cpp_stream_type(), "sycl::queue*");
    assert_eq!(xpu.cpp_kernel_type(), "std::unique_ptr<sycl::kernel>");
    assert_eq!(xpu.cpp_device_ptr(), "void *");
    assert_eq!(xpu.aoti_get_stream(), "aoti_torch_get_current_xpu_stream");
}

#[test]
fn test_xpu_kernel_boilerplate() {
    let xpu = XpuOverrides::new();
    assert!(xpu
        .kernel_header()
        .contains("#include <torch/csrc/inductor/aoti_runtime/sycl_runtime_wrappers.h>"));
    let driver = xpu.kernel_driver();
    assert!(driver.contains("struct Grid"));
    assert!(driver.contains("return grid_x > 0 && grid_y > 0 && grid_z > 0;"));
    assert!(driver.contains("}  // anonymous namespace"));
}

#[test]
fn test_xpu_has_no_optional_capabilities() {
    let xpu = XpuOverrides::new();
    assert_eq!(xpu.cpp_global_scratch(0), None);
    assert_eq!(xpu.cpp_global_scratch(7), None);
    assert!(xpu.tma_descriptor_helpers().is_empty());
}

#[test]
fn test_table_substitutes_placeholders() {
    let npu = TableOverrides::new(npu_spec());
    assert_eq!(
        npu.import_get_raw_stream_as("grs"),
        "from npu_rt import current_raw_stream as grs"
    );
    assert_eq!(npu.set_device(2), "npu.set_device(2)");
    assert_eq!(npu.device_guard(5), "npu.DeviceGuard(5)");
    assert_eq!(npu.synchronize(), "npu.synchronize()");
    assert_eq!(npu.cpp_stream_type(), "npuStream_t");
}

#[test]
fn test_table_optional_fields_default_empty() {
    let npu = TableOverrides::new(npu_spec());
    assert_eq!(npu.kernel_header(), "#include <npu_runtime.h>");
    assert!(npu.kernel_driver().is_empty());
    assert!(npu.tma_descriptor_helpers().is_empty());
}

#[test]
fn test_table_global_scratch() {
    let npu = TableOverrides::new(npu_spec());
    let scratch = npu.cpp_global_scratch(1).unwrap();
    assert_eq!(scratch.type_name, "npuDevicePtr_t");
    assert_eq!(scratch.var_name, "global_scratch_1");
    assert_eq!(scratch.declaration(), "npuDevicePtr_t global_scratch_1;");
}

#[test]
fn test_table_rejects_unknown_fields() {
    let result: Result<TableSpec, _> = toml::from_str("stream = \"x\"\n");
    assert!(result.is_err());
}
