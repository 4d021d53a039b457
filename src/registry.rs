//! Backend override registry.
//!
//! Maps a backend name ("xpu", "npu", ...) to its `DeviceOpOverrides`.
//! Registration happens during startup; afterwards the generator only
//! performs lookups, which take a shared read lock.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, warn};

use crate::config::GenConfig;
use crate::device::{DeviceOpOverrides, TableOverrides, XpuOverrides};
use crate::error::{Error, Result};

/// Shared handle to a registered strategy.
pub type Overrides = Arc<dyn DeviceOpOverrides>;

pub struct OverrideRegistry {
    backends: RwLock<HashMap<String, Overrides>>,
}

impl OverrideRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with the built-in backends ("xpu") registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("xpu", Arc::new(XpuOverrides::new()));
        registry
    }

    /// Store `overrides` under `name`. An existing entry is replaced.
    pub fn register(&self, name: &str, overrides: Overrides) {
        let mut backends = self
            .backends
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if backends.insert(name.to_string(), overrides).is_some() {
            warn!(backend = name, "device overrides replaced");
        } else {
            debug!(backend = name, "device overrides registered");
        }
    }

    /// Register every `[backends.NAME]` table of a configuration.
    pub fn register_from_config(&self, config: &GenConfig) {
        for (name, spec) in &config.backends {
            self.register(name, Arc::new(TableOverrides::new(spec.clone())));
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Overrides> {
        self.backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| Error::BackendNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Registered backend names, sorted.
    pub fn backends(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: OnceLock<OverrideRegistry> = OnceLock::new();

/// Process-wide registry with the built-in backends.
///
/// Library code takes a registry by reference; this exists for
/// embedders that want a single ambient instance.
pub fn global() -> &'static OverrideRegistry {
    GLOBAL_REGISTRY.get_or_init(OverrideRegistry::with_builtins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GlobalScratch;

    struct FakeOverrides(&'static str);

    impl DeviceOpOverrides for FakeOverrides {
        fn import_get_raw_stream_as(&self, name: &str) -> String {
            format!("from fake import raw_stream as {}", name)
        }
        fn set_device(&self, device_idx: u32) -> String {
            format!("fake.set_device({})", device_idx)
        }
        fn synchronize(&self) -> String {
            "fake.synchronize()".to_string()
        }
        fn device_guard(&self, device_idx: u32) -> String {
            format!("fake.guard({})", device_idx)
        }
        fn cpp_device_guard(&self) -> String {
            "fake::Guard".to_string()
        }
        fn cpp_aoti_device_guard(&self) -> String {
            "AOTIFakeGuard".to_string()
        }
        fn cpp_stream_guard(&self) -> String {
            "fake::StreamGuard".to_string()
        }
        fn cpp_aoti_stream_guard(&self) -> String {
            "AOTIFakeStreamGuard".to_string()
        }
        fn cpp_get_stream_from_external(&self) -> String {
            "fake::fromExternal".to_string()
        }
        fn cpp_stream_type(&self) -> String {
            self.0.to_string()
        }
        fn cpp_kernel_type(&self) -> String {
            "fake_kernel".to_string()
        }
        fn cpp_device_ptr(&self) -> String {
            "fake_ptr".to_string()
        }
        fn aoti_get_stream(&self) -> String {
            "aoti_fake_stream".to_string()
        }
        fn kernel_header(&self) -> String {
            String::new()
        }
        fn kernel_driver(&self) -> String {
            String::new()
        }
        fn cpp_global_scratch(&self, idx: usize) -> Option<GlobalScratch> {
            Some(GlobalScratch::new("fake_ptr", format!("scratch{}", idx)))
        }
    }

    #[test]
    fn test_lookup_returns_registered_strategy() {
        let registry = OverrideRegistry::new();
        let fake: Overrides = Arc::new(FakeOverrides("fake_stream_t"));
        registry.register("fake", fake.clone());
        let found = registry.lookup("fake").unwrap();
        assert!(Arc::ptr_eq(&found, &fake));
    }

    #[test]
    fn test_lookup_unregistered_fails() {
        let registry = OverrideRegistry::with_builtins();
        match registry.lookup("cuda") {
            Err(Error::BackendNotFound(name)) => assert_eq!(name, "cuda"),
            other => panic!("expected BackendNotFound, got {:?}", other.map(|_| ())),
        }
        assert!(OverrideRegistry::new().lookup("xpu").is_err());
    }

    #[test]
    fn test_reregistration_is_last_write_wins() {
        let registry = OverrideRegistry::new();
        registry.register("fake", Arc::new(FakeOverrides("first_t")));
        registry.register("fake", Arc::new(FakeOverrides("second_t")));
        assert_eq!(registry.lookup("fake").unwrap().cpp_stream_type(), "second_t");
        assert_eq!(registry.backends(), vec!["fake"]);
    }

    #[test]
    fn test_builtins_and_listing() {
        let registry = OverrideRegistry::with_builtins();
        assert!(registry.contains("xpu"));
        assert!(!registry.contains("cuda"));
        registry.register("abc", Arc::new(FakeOverrides("t")));
        assert_eq!(registry.backends(), vec!["abc", "xpu"]);
    }

    #[test]
    fn test_global_has_xpu() {
        assert_eq!(global().lookup("xpu").unwrap().cpp_stream_type(), "sycl::queue*");
    }

    #[test]
    fn test_concurrent_lookups() {
        let registry = Arc::new(OverrideRegistry::with_builtins());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let xpu = registry.lookup("xpu").unwrap();
                    xpu.set_device(i)
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), format!("torch.xpu.set_device({})", i));
        }
    }
}
