//! Registry of declared subclass types, keyed by stable id.
//!
//! Synthesized reconstruction resolves its type here by the id captured
//! at declaration time, so re-declaring a type under the same id makes
//! reconstruction build the newest declaration.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::instance::{SubclassInstance, SubclassType};
use super::value::{Kwargs, Value};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<SubclassType>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, ty: Arc<SubclassType>) {
        let mut types = self
            .types
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if types.insert(ty.id().to_string(), Arc::clone(&ty)).is_some() {
            warn!(ty = ty.id(), "subclass type redeclared");
        } else {
            debug!(ty = ty.id(), "subclass type declared");
        }
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<SubclassType>> {
        self.types
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TypeResolution(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(id)
    }

    /// Reconstruct an instance of the type registered under `id`.
    pub fn unflatten(
        &self,
        id: &str,
        inner: &Kwargs,
        meta: &Value,
        outer_size: &[i64],
        outer_stride: &[i64],
    ) -> Result<Arc<SubclassInstance>> {
        self.resolve(id)?
            .unflatten(self, inner, meta, outer_size, outer_stride)
    }
}
