//! Configuration-defined overrides.
//!
//! A backend described entirely by a `[backends.NAME]` table in
//! `devgen.toml`. Host templates may use `{name}` (the stream getter
//! alias) and `{idx}` (the device index).

use serde::Deserialize;

use super::{DeviceOpOverrides, GlobalScratch};

/// Raw `[backends.NAME]` table.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub import_get_raw_stream_as: String,
    pub set_device: String,
    pub synchronize: String,
    pub device_guard: String,
    pub cpp_device_guard: String,
    pub cpp_aoti_device_guard: String,
    pub cpp_stream_guard: String,
    pub cpp_aoti_stream_guard: String,
    pub cpp_get_stream_from_external: String,
    pub cpp_stream_type: String,
    pub cpp_kernel_type: String,
    pub cpp_device_ptr: String,
    pub aoti_get_stream: String,
    #[serde(default)]
    pub kernel_header: String,
    #[serde(default)]
    pub kernel_driver: String,
    #[serde(default)]
    pub tma_descriptor_helpers: String,
    #[serde(default)]
    pub global_scratch: Option<ScratchSpec>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScratchSpec {
    pub type_name: String,
    pub var_name: String,
}

#[derive(Clone, Debug)]
pub struct TableOverrides {
    spec: TableSpec,
}

impl TableOverrides {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }
}

fn with_idx(template: &str, device_idx: u32) -> String {
    template.replace("{idx}", &device_idx.to_string())
}

impl DeviceOpOverrides for TableOverrides {
    fn import_get_raw_stream_as(&self, name: &str) -> String {
        self.spec.import_get_raw_stream_as.replace("{name}", name)
    }

    fn set_device(&self, device_idx: u32) -> String {
        with_idx(&self.spec.set_device, device_idx)
    }

    fn synchronize(&self) -> String {
        self.spec.synchronize.clone()
    }

    fn device_guard(&self, device_idx: u32) -> String {
        with_idx(&self.spec.device_guard, device_idx)
    }

    fn cpp_device_guard(&self) -> String {
        self.spec.cpp_device_guard.clone()
    }

    fn cpp_aoti_device_guard(&self) -> String {
        self.spec.cpp_aoti_device_guard.clone()
    }

    fn cpp_stream_guard(&self) -> String {
        self.spec.cpp_stream_guard.clone()
    }

    fn cpp_aoti_stream_guard(&self) -> String {
        self.spec.cpp_aoti_stream_guard.clone()
    }

    fn cpp_get_stream_from_external(&self) -> String {
        self.spec.cpp_get_stream_from_external.clone()
    }

    fn cpp_stream_type(&self) -> String {
        self.spec.cpp_stream_type.clone()
    }

    fn cpp_kernel_type(&self) -> String {
        self.spec.cpp_kernel_type.clone()
    }

    fn cpp_device_ptr(&self) -> String {
        self.spec.cpp_device_ptr.clone()
    }

    fn aoti_get_stream(&self) -> String {
        self.spec.aoti_get_stream.clone()
    }

    fn kernel_header(&self) -> String {
        self.spec.kernel_header.clone()
    }

    fn kernel_driver(&self) -> String {
        self.spec.kernel_driver.clone()
    }

    fn cpp_global_scratch(&self, idx: usize) -> Option<GlobalScratch> {
        self.spec.global_scratch.as_ref().map(|s| {
            GlobalScratch::new(
                s.type_name.clone(),
                s.var_name.replace("{idx}", &idx.to_string()),
            )
        })
    }

    fn tma_descriptor_helpers(&self) -> String {
        self.spec.tma_descriptor_helpers.clone()
    }
}
