//! Aliasing correction on the return path of intercepted calls.

use super::dispatch::OpRef;
use super::value::{Kwargs, Value};

/// Post-call adjustment so a returned value reflects the aliasing
/// relationship the caller expects (an in-place op returns its input,
/// not a fresh wrapper around the same data).
pub trait AliasCorrection: Send + Sync {
    fn correct(&self, op: &OpRef, args: &[Value], kwargs: &Kwargs, out: Value) -> Value;
}

/// Returns the aliased input itself when the op's schema says the
/// output aliases it; other outputs pass through.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReturnAndCorrectAliasing;

impl AliasCorrection for ReturnAndCorrectAliasing {
    fn correct(&self, op: &OpRef, args: &[Value], _kwargs: &Kwargs, out: Value) -> Value {
        match op.schema().returns_alias_of.and_then(|i| args.get(i)) {
            Some(input @ Value::Instance(_)) | Some(input @ Value::Tensor(_)) => input.clone(),
            _ => out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subclass::dispatch::OpSchema;
    use crate::subclass::value::TensorMeta;

    #[test]
    fn test_inplace_returns_input_identity() {
        let add_ = OpRef::with_schema(
            "add_",
            OpSchema {
                returns_alias_of: Some(0),
            },
            |args, _| Ok(args[0].clone()),
        );
        let input = Value::tensor(TensorMeta::contiguous(&[4], "torch.float32", "xpu:0"));
        let fresh = Value::tensor(TensorMeta::contiguous(&[4], "torch.float32", "xpu:0"));
        let out = ReturnAndCorrectAliasing.correct(&add_, &[input.clone()], &Kwargs::new(), fresh);
        assert!(out.is(&input));
    }

    #[test]
    fn test_functional_op_passes_through() {
        let add = OpRef::new("add", |_, _| Ok(Value::None));
        let out = ReturnAndCorrectAliasing.correct(&add, &[Value::Int(1)], &Kwargs::new(), Value::Int(2));
        assert_eq!(out, Value::Int(2));
    }
}
