//! Declarative subclass descriptors and protocol-method synthesis.
//!
//! A descriptor names the type's components (`inner_tensors`) and any
//! hooks. `register` builds the `SubclassType`: protocol methods the
//! declaration supplies are kept, the rest are synthesized from the
//! component list:
//!
//! - flatten: `(inner_tensors, get_meta(self) or None)`
//! - unflatten: resolve the type by id, merge components with
//!   `meta_init_kwargs(meta)`, construct
//! - slots: exactly the components
//! - repr: `Name(a:repr(a), b:repr(b))` in declaration order
//! - interception: composed from the prologue/epilogue hooks

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::alias::{AliasCorrection, ReturnAndCorrectAliasing};
use super::dispatch::{DispatchCall, EpilogueFn, InterceptFn, Intercept, Interceptor, OpRef, PrologueFn};
use super::instance::{Flattened, SubclassInstance, SubclassType, OUTER_SIZE, OUTER_STRIDE};
use super::types::TypeRegistry;
use super::value::{Kwargs, Value};
use crate::error::{Error, Result};

pub type FlattenFn = Arc<dyn Fn(&SubclassInstance) -> Result<Flattened> + Send + Sync>;
pub type UnflattenFn = Arc<
    dyn Fn(&TypeRegistry, &Kwargs, &Value, &[i64], &[i64]) -> Result<Arc<SubclassInstance>>
        + Send
        + Sync,
>;
pub type ReprFn = Arc<dyn Fn(&SubclassInstance) -> String + Send + Sync>;
pub type GetMetaFn = Arc<dyn Fn(&SubclassInstance) -> Value + Send + Sync>;
pub type MetaInitKwargsFn = Arc<dyn Fn(&Value) -> Kwargs + Send + Sync>;

/// Declaration of a subclass type.
pub struct SubclassDescriptor {
    module: String,
    qualname: String,
    inner_tensors: Option<Vec<String>>,
    init_params: Vec<String>,
    slots: Option<Vec<String>>,
    get_meta: Option<GetMetaFn>,
    meta_init_kwargs: Option<MetaInitKwargsFn>,
    flatten: Option<FlattenFn>,
    unflatten: Option<UnflattenFn>,
    repr: Option<ReprFn>,
    dispatch: Option<InterceptFn>,
    prologue: Option<PrologueFn>,
    epilogue: Option<EpilogueFn>,
    alias_correction: Arc<dyn AliasCorrection>,
}

impl SubclassDescriptor {
    /// `module` and `qualname` together form the type's stable id.
    pub fn new(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            qualname: qualname.into(),
            inner_tensors: None,
            init_params: Vec::new(),
            slots: None,
            get_meta: None,
            meta_init_kwargs: None,
            flatten: None,
            unflatten: None,
            repr: None,
            dispatch: None,
            prologue: None,
            epilogue: None,
            alias_correction: Arc::new(ReturnAndCorrectAliasing),
        }
    }

    /// Component attribute names, in declaration order.
    pub fn inner_tensors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner_tensors = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Extra constructor keywords (typically produced by
    /// `meta_init_kwargs`).
    pub fn init_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.init_params = names.into_iter().map(Into::into).collect();
        self
    }

    /// Explicit attribute set. Must include every component.
    pub fn slots<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slots = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn get_meta<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubclassInstance) -> Value + Send + Sync + 'static,
    {
        self.get_meta = Some(Arc::new(f));
        self
    }

    pub fn meta_init_kwargs<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Kwargs + Send + Sync + 'static,
    {
        self.meta_init_kwargs = Some(Arc::new(f));
        self
    }

    pub fn flatten<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubclassInstance) -> Result<Flattened> + Send + Sync + 'static,
    {
        self.flatten = Some(Arc::new(f));
        self
    }

    pub fn unflatten<F>(mut self, f: F) -> Self
    where
        F: Fn(&TypeRegistry, &Kwargs, &Value, &[i64], &[i64]) -> Result<Arc<SubclassInstance>>
            + Send
            + Sync
            + 'static,
    {
        self.unflatten = Some(Arc::new(f));
        self
    }

    pub fn repr<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubclassInstance) -> String + Send + Sync + 'static,
    {
        self.repr = Some(Arc::new(f));
        self
    }

    /// A complete interception method. Takes precedence over
    /// `prologue`/`epilogue`.
    pub fn dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubclassType, &OpRef, &[String], &[Value], Option<&Kwargs>) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.dispatch = Some(Arc::new(f));
        self
    }

    pub fn prologue<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubclassType, &DispatchCall<'_>) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.prologue = Some(Arc::new(f));
        self
    }

    pub fn epilogue<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubclassType, &DispatchCall<'_>, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.epilogue = Some(Arc::new(f));
        self
    }

    pub fn alias_correction(mut self, correction: Arc<dyn AliasCorrection>) -> Self {
        self.alias_correction = correction;
        self
    }

    /// Validate, synthesize missing protocol methods, and register the
    /// type under `module::qualname`.
    pub fn register(self, registry: &TypeRegistry) -> Result<Arc<SubclassType>> {
        let name = self.qualname.clone();
        if self.module.is_empty() || self.qualname.is_empty() {
            return Err(Error::invalid_declaration(
                &name,
                "module and qualified name must be non-empty".to_string(),
            ));
        }
        let id = format!("{}::{}", self.module, self.qualname);

        let inner = self.inner_tensors.clone().unwrap_or_default();
        validate_names(&name, &inner, "component")?;
        validate_names(&name, &self.init_params, "init param")?;
        if let Some(clash) = self.init_params.iter().find(|p| inner.contains(*p)) {
            return Err(Error::invalid_declaration(
                &name,
                format!("'{}' is both a component and an init param", clash),
            ));
        }

        let slots = match self.slots {
            Some(slots) => {
                if let Some(missing) = inner.iter().find(|c| !slots.contains(*c)) {
                    return Err(Error::invalid_declaration(
                        &name,
                        format!("slots do not include component '{}'", missing),
                    ));
                }
                slots
            }
            None => inner.clone(),
        };

        let declared = self.inner_tensors.is_some();
        let flatten = match self.flatten {
            Some(f) => f,
            None if declared => gen_flatten(inner.clone(), self.get_meta),
            None => not_decomposable(&name),
        };
        let unflatten = match self.unflatten {
            Some(f) => f,
            None if declared => gen_unflatten(id.clone(), name.clone(), inner.clone(), self.meta_init_kwargs),
            None => not_reconstructible(&name),
        };
        let repr = match self.repr {
            Some(f) => f,
            None => gen_repr(name.clone(), inner.clone()),
        };
        let intercept = match self.dispatch {
            Some(f) => Some(Intercept::Custom(f)),
            None => Interceptor::new(self.prologue, self.epilogue).map(Intercept::Synthesized),
        };

        debug!(
            ty = %id,
            components = inner.len(),
            intercepts = intercept.is_some(),
            "synthesized subclass protocol"
        );

        let ty = Arc::new(SubclassType {
            id,
            name,
            inner_tensors: inner,
            slots,
            init_params: self.init_params,
            flatten,
            unflatten,
            repr,
            intercept,
            alias_correction: self.alias_correction,
        });
        registry.insert(Arc::clone(&ty));
        Ok(ty)
    }
}

fn validate_names(type_name: &str, names: &[String], what: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for n in names {
        if n.is_empty() {
            return Err(Error::invalid_declaration(type_name, format!("empty {} name", what)));
        }
        if n == OUTER_SIZE || n == OUTER_STRIDE {
            return Err(Error::invalid_declaration(
                type_name,
                format!("'{}' is reserved and cannot be a {}", n, what),
            ));
        }
        if !seen.insert(n.as_str()) {
            return Err(Error::invalid_declaration(
                type_name,
                format!("duplicate {} '{}'", what, n),
            ));
        }
    }
    Ok(())
}

fn gen_flatten(inner: Vec<String>, get_meta: Option<GetMetaFn>) -> FlattenFn {
    match get_meta {
        Some(get_meta) => Arc::new(move |inst: &SubclassInstance| -> Result<Flattened> {
            Ok(Flattened {
                attrs: inner.clone(),
                meta: get_meta(inst),
            })
        }),
        None => Arc::new(move |_inst: &SubclassInstance| -> Result<Flattened> {
            Ok(Flattened {
                attrs: inner.clone(),
                meta: Value::None,
            })
        }),
    }
}

fn gen_unflatten(
    id: String,
    name: String,
    inner: Vec<String>,
    meta_init_kwargs: Option<MetaInitKwargsFn>,
) -> UnflattenFn {
    Arc::new(
        move |registry: &TypeRegistry,
              components: &Kwargs,
              meta: &Value,
              outer_size: &[i64],
              outer_stride: &[i64]|
              -> Result<Arc<SubclassInstance>> {
            if let Some(extra) = components.keys().find(|k| !inner.contains(*k)) {
                return Err(Error::key_mismatch(
                    &name,
                    format!("unexpected component '{}'", extra),
                ));
            }
            let mut kwargs = Kwargs::new();
            for attr in &inner {
                let value = components.get(attr).ok_or_else(|| {
                    Error::key_mismatch(&name, format!("missing component '{}'", attr))
                })?;
                kwargs.insert(attr.clone(), value.clone());
            }

            let ty = registry.resolve(&id)?;
            if let Some(meta_init_kwargs) = &meta_init_kwargs {
                kwargs.extend(meta_init_kwargs(meta));
            }
            ty.construct(outer_size, outer_stride, kwargs)
        },
    )
}

fn gen_repr(name: String, inner: Vec<String>) -> ReprFn {
    Arc::new(move |inst: &SubclassInstance| -> String {
        let parts: Vec<String> = inner
            .iter()
            .map(|attr| match inst.get(attr) {
                Ok(value) => format!("{}:{}", attr, value.repr()),
                Err(_) => format!("{}:<unset>", attr),
            })
            .collect();
        format!("{}({})", name, parts.join(", "))
    })
}

fn not_decomposable(name: &str) -> FlattenFn {
    let name = name.to_string();
    Arc::new(move |_inst: &SubclassInstance| -> Result<Flattened> {
        Err(Error::invalid_declaration(
            &name,
            "no inner tensors declared and no flatten method given".to_string(),
        ))
    })
}

fn not_reconstructible(name: &str) -> UnflattenFn {
    let name = name.to_string();
    Arc::new(
        move |_registry: &TypeRegistry,
              _components: &Kwargs,
              _meta: &Value,
              _size: &[i64],
              _stride: &[i64]|
              -> Result<Arc<SubclassInstance>> {
            Err(Error::invalid_declaration(
                &name,
                "no inner tensors declared and no unflatten method given".to_string(),
            ))
        },
    )
}
