//! Dispatch interception for subclass types.
//!
//! `dispatch` is the generic entry point: when interception is enabled
//! on the current thread and an argument is an instance of a type with
//! an interceptor, the call is routed through that type. Interceptors
//! run the wrapped op under an `InterceptionGuard`, so calls made by
//! the op itself go straight through instead of re-entering the type.
//!
//! The synthesized interceptor has one of three shapes, picked once
//! when the type is built:
//!
//! ```text
//! Prologue:  pro(call) ?? { guard; op(args) }
//! Epilogue:  { guard; epi(call, op(args)) }
//! Both:      pro(call) ?? { guard; epi(call, op(args)) }
//! ```

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use tracing::trace;

use super::instance::SubclassType;
use super::pytree::for_each_leaf;
use super::value::{Kwargs, Value};
use crate::error::{Error, Result};

pub type OpFn = dyn Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync;

/// Aliasing facts about an op's output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpSchema {
    /// Positional argument the output aliases (in-place and view ops).
    pub returns_alias_of: Option<usize>,
}

struct OpInner {
    name: String,
    schema: OpSchema,
    func: Box<OpFn>,
}

/// A callable operation with identity.
///
/// Clones share identity; two ops built separately are never `is`,
/// even with the same name.
#[derive(Clone)]
pub struct OpRef {
    inner: Arc<OpInner>,
}

impl OpRef {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_schema(name, OpSchema::default(), func)
    }

    pub fn with_schema<F>(name: impl Into<String>, schema: OpSchema, func: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(OpInner {
                name: name.into(),
                schema,
                func: Box::new(func),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn schema(&self) -> OpSchema {
        self.inner.schema
    }

    pub fn is(&self, other: &OpRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke the op directly, bypassing dispatch.
    pub fn call(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        (self.inner.func)(args, kwargs)
    }
}

impl fmt::Debug for OpRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpRef")
            .field("name", &self.inner.name)
            .field("schema", &self.inner.schema)
            .finish()
    }
}

static COND_OP: OnceLock<OpRef> = OnceLock::new();

/// The `cond` higher-order op: `cond(pred, on_true, on_false)`.
///
/// Its outputs are not aliasing-corrected on return.
pub fn cond_op() -> &'static OpRef {
    COND_OP.get_or_init(|| {
        OpRef::new("cond", |args, _kwargs| match args {
            [Value::Bool(pred), on_true, on_false] => {
                Ok(if *pred { on_true.clone() } else { on_false.clone() })
            }
            _ => Err(Error::Hook(format!(
                "cond expects (pred: bool, on_true, on_false), got {} arguments",
                args.len()
            ))),
        })
    })
}

// ─── Interception state ────────────────────────────────────────────

thread_local! {
    static DISABLED_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Whether `dispatch` routes through subclass interceptors on this thread.
pub fn interception_enabled() -> bool {
    DISABLED_DEPTH.with(|depth| depth.get() == 0)
}

/// Disables interception on the current thread until dropped.
///
/// Guards nest; the state is restored on every exit path, unwinding
/// included. Not `Send`: the state it restores is thread-local.
pub struct InterceptionGuard {
    _thread_bound: PhantomData<*const ()>,
}

impl InterceptionGuard {
    pub fn disable() -> Self {
        DISABLED_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _thread_bound: PhantomData,
        }
    }
}

impl Drop for InterceptionGuard {
    fn drop(&mut self) {
        DISABLED_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

// ─── Hooks ─────────────────────────────────────────────────────────

/// A call routed through a subclass type.
pub struct DispatchCall<'a> {
    pub op: &'a OpRef,
    /// Ids of the subclass types found among the arguments.
    pub types: &'a [String],
    pub args: &'a [Value],
    pub kwargs: &'a Kwargs,
}

/// Runs before the op. A non-empty result short-circuits the call.
pub type PrologueFn =
    Arc<dyn Fn(&SubclassType, &DispatchCall<'_>) -> Result<Option<Value>> + Send + Sync>;

/// Runs after the op with its raw result; its return value is the
/// call's result.
pub type EpilogueFn =
    Arc<dyn Fn(&SubclassType, &DispatchCall<'_>, Value) -> Result<Value> + Send + Sync>;

/// A complete user-provided interception method.
pub type InterceptFn = Arc<
    dyn Fn(&SubclassType, &OpRef, &[String], &[Value], Option<&Kwargs>) -> Result<Value>
        + Send
        + Sync,
>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterceptShape {
    Prologue,
    Epilogue,
    Both,
}

/// Prologue/epilogue pair composed into one interceptor.
#[derive(Clone)]
pub struct Interceptor {
    prologue: Option<PrologueFn>,
    epilogue: Option<EpilogueFn>,
}

impl Interceptor {
    /// `None` when neither hook is present.
    pub fn new(prologue: Option<PrologueFn>, epilogue: Option<EpilogueFn>) -> Option<Self> {
        if prologue.is_none() && epilogue.is_none() {
            return None;
        }
        Some(Self { prologue, epilogue })
    }

    pub fn shape(&self) -> InterceptShape {
        match (&self.prologue, &self.epilogue) {
            (Some(_), Some(_)) => InterceptShape::Both,
            (Some(_), None) => InterceptShape::Prologue,
            _ => InterceptShape::Epilogue,
        }
    }

    pub fn intercept(
        &self,
        ty: &SubclassType,
        op: &OpRef,
        types: &[String],
        args: &[Value],
        kwargs: Option<&Kwargs>,
    ) -> Result<Value> {
        let empty = Kwargs::new();
        let kwargs = kwargs.unwrap_or(&empty);
        let call = DispatchCall {
            op,
            types,
            args,
            kwargs,
        };

        if let Some(prologue) = &self.prologue {
            if let Some(ret) = prologue(ty, &call)? {
                if !ret.is_falsy() {
                    trace!(op = op.name(), ty = ty.id(), "prologue short-circuit");
                    return Ok(ret);
                }
            }
        }

        let _guard = InterceptionGuard::disable();
        let out = op.call(args, kwargs)?;
        match &self.epilogue {
            Some(epilogue) => epilogue(ty, &call, out),
            None => Ok(out),
        }
    }
}

/// The interception method installed on a type.
#[derive(Clone)]
pub enum Intercept {
    Synthesized(Interceptor),
    Custom(InterceptFn),
}

impl Intercept {
    pub fn call(
        &self,
        ty: &SubclassType,
        op: &OpRef,
        types: &[String],
        args: &[Value],
        kwargs: Option<&Kwargs>,
    ) -> Result<Value> {
        match self {
            Intercept::Synthesized(interceptor) => interceptor.intercept(ty, op, types, args, kwargs),
            Intercept::Custom(f) => f(ty, op, types, args, kwargs),
        }
    }
}

// ─── Entry point ───────────────────────────────────────────────────

/// Call `op`, routing through the first intercepting subclass type
/// among the arguments when interception is enabled.
pub fn dispatch(op: &OpRef, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value> {
    if interception_enabled() {
        let mut types: Vec<String> = Vec::new();
        let mut target: Option<Arc<SubclassType>> = None;
        let mut visit = |leaf: &Value| {
            if let Value::Instance(inst) = leaf {
                let ty = inst.subclass_type();
                if !types.iter().any(|t| t == ty.id()) {
                    types.push(ty.id().to_string());
                }
                if target.is_none() && ty.intercept().is_some() {
                    target = Some(Arc::clone(ty));
                }
            }
        };
        for arg in args {
            for_each_leaf(arg, &mut visit);
        }
        if let Some(kwargs) = kwargs {
            for value in kwargs.values() {
                for_each_leaf(value, &mut visit);
            }
        }

        if let Some(ty) = target {
            if let Some(intercept) = ty.intercept() {
                trace!(op = op.name(), ty = ty.id(), "intercepting dispatch");
                return intercept.call(&ty, op, &types, args, kwargs);
            }
        }
    }

    match kwargs {
        Some(kwargs) => op.call(args, kwargs),
        None => op.call(args, &Kwargs::new()),
    }
}
