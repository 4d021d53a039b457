//! Structural tensor subclasses.
//!
//! A subclass wraps a fixed set of named components (its inner
//! tensors) plus optional metadata. Declaring one through
//! `SubclassDescriptor` yields a `SubclassType` carrying the structural
//! protocol the compiler relies on:
//!
//! - decompose (`flatten`) / reconstruct (`unflatten`) for tracing
//!   through the wrapper
//! - a readable repr
//! - optionally, dispatch interception built from prologue/epilogue hooks
//!
//! Reconstruction goes through a `TypeRegistry` keyed by the id chosen
//! at declaration time (`module::qualname`).

pub mod alias;
pub mod descriptor;
pub mod dispatch;
pub mod instance;
pub mod pytree;
pub mod types;
pub mod value;

pub use alias::{AliasCorrection, ReturnAndCorrectAliasing};
pub use descriptor::SubclassDescriptor;
pub use dispatch::{
    cond_op, dispatch, interception_enabled, DispatchCall, InterceptShape, InterceptionGuard,
    OpRef, OpSchema,
};
pub use instance::{Flattened, SubclassInstance, SubclassType};
pub use types::TypeRegistry;
pub use value::{tensor_kwargs_from, Kwargs, TensorMeta, Value};
