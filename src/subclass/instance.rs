//! Subclass types and their instances.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::alias::AliasCorrection;
use super::descriptor::{FlattenFn, ReprFn, UnflattenFn};
use super::dispatch::{cond_op, Intercept, InterceptShape, OpRef};
use super::pytree::{map_kwargs, map_slice};
use super::types::TypeRegistry;
use super::value::{Kwargs, Value};
use crate::error::{Error, Result};

/// Constructor keywords that are never components.
pub const OUTER_SIZE: &str = "outer_size";
pub const OUTER_STRIDE: &str = "outer_stride";

/// Result of decomposing an instance: the component attribute names and
/// the auxiliary metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Flattened {
    pub attrs: Vec<String>,
    pub meta: Value,
}

/// A declared subclass type with its protocol methods installed.
///
/// Built by `SubclassDescriptor::register`; every method is either the
/// one the declaration supplied or a synthesized one.
pub struct SubclassType {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) inner_tensors: Vec<String>,
    pub(crate) slots: Vec<String>,
    pub(crate) init_params: Vec<String>,
    pub(crate) flatten: FlattenFn,
    pub(crate) unflatten: UnflattenFn,
    pub(crate) repr: ReprFn,
    pub(crate) intercept: Option<Intercept>,
    pub(crate) alias_correction: Arc<dyn AliasCorrection>,
}

impl SubclassType {
    /// Stable identifier, `module::qualname`.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Qualified name, used by the synthesized repr.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner_tensors(&self) -> &[String] {
        &self.inner_tensors
    }

    /// Attribute names instances may hold.
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    pub fn init_params(&self) -> &[String] {
        &self.init_params
    }

    pub fn intercept(&self) -> Option<&Intercept> {
        self.intercept.as_ref()
    }

    /// Shape of the synthesized interceptor; `None` when the type has
    /// no interceptor or a custom one.
    pub fn intercept_shape(&self) -> Option<InterceptShape> {
        match &self.intercept {
            Some(Intercept::Synthesized(interceptor)) => Some(interceptor.shape()),
            _ => None,
        }
    }

    /// Construct an instance from constructor keywords.
    ///
    /// Every component is required. Besides components, only declared
    /// init params are accepted.
    pub fn construct(
        self: &Arc<Self>,
        outer_size: &[i64],
        outer_stride: &[i64],
        mut kwargs: Kwargs,
    ) -> Result<Arc<SubclassInstance>> {
        if let Some(unknown) = kwargs
            .keys()
            .find(|k| !self.inner_tensors.contains(*k) && !self.init_params.contains(*k))
        {
            return Err(Error::key_mismatch(
                &self.name,
                format!("__init__() got an unexpected keyword argument '{}'", unknown),
            ));
        }

        let mut attrs = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match kwargs.remove(slot) {
                Some(value) => attrs.push((slot.clone(), Some(value))),
                None if self.inner_tensors.contains(slot) => {
                    return Err(Error::key_mismatch(
                        &self.name,
                        format!("__init__() missing required argument '{}'", slot),
                    ));
                }
                None => attrs.push((slot.clone(), None)),
            }
        }

        trace!(ty = %self.id, "constructed instance");
        Ok(Arc::new(SubclassInstance {
            ty: Arc::clone(self),
            outer_size: outer_size.to_vec(),
            outer_stride: outer_stride.to_vec(),
            attrs,
            params: kwargs,
        }))
    }

    /// Decomposition protocol: component names plus metadata.
    pub fn flatten(&self, inst: &SubclassInstance) -> Result<Flattened> {
        (self.flatten)(inst)
    }

    /// Reconstruction protocol.
    pub fn unflatten(
        &self,
        registry: &TypeRegistry,
        inner: &Kwargs,
        meta: &Value,
        outer_size: &[i64],
        outer_stride: &[i64],
    ) -> Result<Arc<SubclassInstance>> {
        (self.unflatten)(registry, inner, meta, outer_size, outer_stride)
    }

    /// Flatten and read back each named component.
    pub fn decompose(&self, inst: &SubclassInstance) -> Result<(Kwargs, Value)> {
        let flat = self.flatten(inst)?;
        let mut inner = Kwargs::new();
        for attr in &flat.attrs {
            inner.insert(attr.clone(), inst.get(attr)?.clone());
        }
        Ok((inner, flat.meta))
    }

    pub fn repr_of(&self, inst: &SubclassInstance) -> String {
        (self.repr)(inst)
    }

    fn is_own_instance(&self, value: &Value) -> bool {
        matches!(value, Value::Instance(inst) if inst.ty.id == self.id)
    }

    /// Replace instances of this type in `args` with their `attr`.
    pub fn args_attr(&self, args: &[Value], attr: &str) -> Result<Vec<Value>> {
        self.map_args(args, &mut |v| attr_of(v, attr))
    }

    pub fn kwargs_attr(&self, kwargs: &Kwargs, attr: &str) -> Result<Kwargs> {
        self.map_kwargs(kwargs, &mut |v| attr_of(v, attr))
    }

    /// Replace instances of this type in `args` with `get(instance)`.
    pub fn map_args(
        &self,
        args: &[Value],
        get: &mut dyn FnMut(&SubclassInstance) -> Result<Value>,
    ) -> Result<Vec<Value>> {
        let pred = |v: &Value| self.is_own_instance(v);
        map_slice(args, &pred, &mut |v| match v {
            Value::Instance(inst) => get(inst.as_ref()),
            other => Ok(other.clone()),
        })
    }

    pub fn map_kwargs(
        &self,
        kwargs: &Kwargs,
        get: &mut dyn FnMut(&SubclassInstance) -> Result<Value>,
    ) -> Result<Kwargs> {
        let pred = |v: &Value| self.is_own_instance(v);
        map_kwargs(kwargs, &pred, &mut |v| match v {
            Value::Instance(inst) => get(inst.as_ref()),
            other => Ok(other.clone()),
        })
    }

    /// Call `op` with every instance of this type projected by `get`.
    pub fn func_args_kwargs(
        &self,
        op: &OpRef,
        args: &[Value],
        kwargs: &Kwargs,
        get: &mut dyn FnMut(&SubclassInstance) -> Result<Value>,
    ) -> Result<Value> {
        let args = self.map_args(args, get)?;
        let kwargs = self.map_kwargs(kwargs, get)?;
        op.call(&args, &kwargs)
    }

    /// Call `op` with every instance of this type replaced by `attr`.
    pub fn func_args_kwargs_attr(
        &self,
        op: &OpRef,
        args: &[Value],
        kwargs: &Kwargs,
        attr: &str,
    ) -> Result<Value> {
        let args = self.args_attr(args, attr)?;
        let kwargs = self.kwargs_attr(kwargs, attr)?;
        op.call(&args, &kwargs)
    }

    /// Return path for intercepted calls: `cond` results pass through,
    /// everything else is aliasing-corrected.
    pub fn finish_return(&self, op: &OpRef, args: &[Value], kwargs: &Kwargs, out: Value) -> Value {
        if op.is(cond_op()) {
            return out;
        }
        self.alias_correction.correct(op, args, kwargs, out)
    }
}

fn attr_of(inst: &SubclassInstance, attr: &str) -> Result<Value> {
    inst.get(attr).cloned()
}

impl fmt::Debug for SubclassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubclassType")
            .field("id", &self.id)
            .field("inner_tensors", &self.inner_tensors)
            .field("slots", &self.slots)
            .field("init_params", &self.init_params)
            .field("intercepts", &self.intercept.is_some())
            .finish()
    }
}

/// An instance of a `SubclassType`.
///
/// Attribute storage is closed: only the type's slots can be read or
/// written.
#[derive(Clone)]
pub struct SubclassInstance {
    ty: Arc<SubclassType>,
    outer_size: Vec<i64>,
    outer_stride: Vec<i64>,
    attrs: Vec<(String, Option<Value>)>,
    params: Kwargs,
}

impl SubclassInstance {
    pub fn subclass_type(&self) -> &Arc<SubclassType> {
        &self.ty
    }

    pub fn outer_size(&self) -> &[i64] {
        &self.outer_size
    }

    pub fn outer_stride(&self) -> &[i64] {
        &self.outer_stride
    }

    pub fn get(&self, attr: &str) -> Result<&Value> {
        self.attrs
            .iter()
            .find(|(name, _)| name == attr)
            .and_then(|(_, value)| value.as_ref())
            .ok_or_else(|| Error::Attribute {
                type_name: self.ty.name.clone(),
                attr: attr.to_string(),
            })
    }

    pub fn set(&mut self, attr: &str, value: Value) -> Result<()> {
        match self.attrs.iter_mut().find(|(name, _)| name == attr) {
            Some((_, slot)) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(Error::Attribute {
                type_name: self.ty.name.clone(),
                attr: attr.to_string(),
            }),
        }
    }

    /// Non-component constructor keyword, if it was given.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Kwargs {
        &self.params
    }

    pub fn flatten(&self) -> Result<Flattened> {
        self.ty.flatten(self)
    }

    pub fn decompose(&self) -> Result<(Kwargs, Value)> {
        self.ty.decompose(self)
    }

    pub fn repr(&self) -> String {
        self.ty.repr_of(self)
    }
}

impl PartialEq for SubclassInstance {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id == other.ty.id
            && self.outer_size == other.outer_size
            && self.outer_stride == other.outer_stride
            && self.attrs == other.attrs
            && self.params == other.params
    }
}

impl fmt::Debug for SubclassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for SubclassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}
