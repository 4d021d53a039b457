//! Registry lookup and prelude rendering.
//!
//! Lookups happen once per generated wrapper, rendering once per unit;
//! both should stay well under the cost of the surrounding codegen.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use devgen::device::{DeviceOpOverrides, LaunchGrid, TableOverrides, TableSpec};
use devgen::emit::{render_units, CompileUnit, HostPrelude, NativePrelude};
use devgen::OverrideRegistry;

const NPU: &str = r#"
import_get_raw_stream_as = "from npu_rt import raw_stream as {name}"
set_device = "npu.set_device({idx})"
synchronize = "npu.synchronize()"
device_guard = "npu.DeviceGuard({idx})"
cpp_device_guard = "npu::DeviceGuard"
cpp_aoti_device_guard = "AOTINpuGuard"
cpp_stream_guard = "npu::StreamGuard"
cpp_aoti_stream_guard = "AOTINpuStreamGuard"
cpp_get_stream_from_external = "npu::getStreamFromExternal"
cpp_stream_type = "npu::Stream"
cpp_kernel_type = "npu::Kernel*"
cpp_device_ptr = "void*"
aoti_get_stream = "aoti_torch_get_current_npu_stream"
"#;

fn registry() -> OverrideRegistry {
    let registry = OverrideRegistry::with_builtins();
    let spec: TableSpec = toml::from_str(NPU).expect("valid table");
    registry.register("npu", std::sync::Arc::new(TableOverrides::new(spec)));
    for i in 0..32 {
        registry.register(&format!("fake{}", i), registry.lookup("npu").expect("npu"));
    }
    registry
}

fn bench_lookup(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("lookup");
    group.bench_function("hit", |b| b.iter(|| registry.lookup(black_box("xpu"))));
    group.bench_function("miss", |b| {
        b.iter(|| registry.lookup(black_box("missing")).is_err())
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let registry = registry();
    let xpu = registry.lookup("xpu").expect("xpu");
    let npu = registry.lookup("npu").expect("npu");

    let mut group = c.benchmark_group("render");
    for (name, overrides) in [("xpu", &xpu), ("npu", &npu)] {
        let o: &dyn DeviceOpOverrides = overrides.as_ref();
        group.bench_function(format!("{}_host", name), |b| {
            b.iter(|| HostPrelude::new(o, black_box(1)).render())
        });
        group.bench_function(format!("{}_native", name), |b| {
            b.iter(|| NativePrelude::new(o, black_box(1)).render())
        });
    }

    let units: Vec<CompileUnit> = (0..64)
        .map(|i| {
            CompileUnit::new(format!("unit{}", i), i % 4)
                .with_kernel("triton_poi_0", LaunchGrid::new(128, 1, 1))
                .with_kernel("triton_red_1", LaunchGrid::new(64, 8, 1))
        })
        .collect();
    group.bench_function("units_64_parallel", |b| {
        b.iter(|| render_units(&registry, "xpu", black_box(&units)))
    });
    group.finish();
}

criterion_group!(benches, bench_lookup, bench_render);
criterion_main!(benches);
