//! Dynamic values flowing through decomposition and dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::instance::SubclassInstance;

/// Keyword arguments, ordered by name.
pub type Kwargs = BTreeMap<String, Value>;

/// Metadata of a plain (non-subclass) tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorMeta {
    pub size: Vec<i64>,
    pub stride: Vec<i64>,
    pub storage_offset: i64,
    pub device: String,
    pub dtype: String,
    pub layout: String,
    pub requires_grad: bool,
}

impl TensorMeta {
    /// A strided, row-major tensor.
    pub fn contiguous(size: &[i64], dtype: &str, device: &str) -> Self {
        Self {
            size: size.to_vec(),
            stride: contiguous_strides(size),
            storage_offset: 0,
            device: device.to_string(),
            dtype: dtype.to_string(),
            layout: "torch.strided".to_string(),
            requires_grad: false,
        }
    }
}

pub fn contiguous_strides(size: &[i64]) -> Vec<i64> {
    let mut strides = vec![1; size.len()];
    for i in (0..size.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * size[i + 1].max(1);
    }
    strides
}

/// Constructor keywords describing `t`, with `outer_stride` (when
/// given) replacing the tensor's own strides.
pub fn tensor_kwargs_from(t: &TensorMeta, outer_stride: Option<&[i64]>) -> Kwargs {
    let strides = outer_stride.unwrap_or(&t.stride);
    let mut kwargs = Kwargs::new();
    kwargs.insert("strides".to_string(), Value::ints(strides));
    kwargs.insert("storage_offset".to_string(), Value::Int(t.storage_offset));
    kwargs.insert("device".to_string(), Value::Str(t.device.clone()));
    kwargs.insert("layout".to_string(), Value::Str(t.layout.clone()));
    kwargs.insert("requires_grad".to_string(), Value::Bool(t.requires_grad));
    kwargs.insert("dtype".to_string(), Value::Str(t.dtype.clone()));
    kwargs
}

#[derive(Clone, Debug)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(Kwargs),
    Tensor(Arc<TensorMeta>),
    Instance(Arc<SubclassInstance>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn ints(values: &[i64]) -> Self {
        Value::List(values.iter().map(|v| Value::Int(*v)).collect())
    }

    pub fn tensor(meta: TensorMeta) -> Self {
        Value::Tensor(Arc::new(meta))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Python falsiness: `None`, `False`, zero, or an empty
    /// string/container. A prologue returning such a value does not
    /// short-circuit dispatch.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::None | Value::Bool(false) | Value::Int(0) => true,
            Value::Float(f) => *f == 0.0,
            Value::Str(s) => s.is_empty(),
            Value::List(v) | Value::Tuple(v) => v.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<SubclassInstance>> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Arc<TensorMeta>> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Object identity: same allocation for tensors and instances,
    /// equality for everything else.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Tensor(a), Value::Tensor(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Python-style representation.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format!("{:?}", v),
            Value::Str(s) => repr_str(s),
            Value::List(items) => format!("[{}]", join_repr(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items)),
            Value::Map(map) => {
                let entries: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", repr_str(k), v.repr()))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Value::Tensor(t) => format!(
                "tensor(size={:?}, dtype={}, device={})",
                t.size, t.dtype, t.device
            ),
            Value::Instance(inst) => inst.repr(),
        }
    }
}

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn repr_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Tensor(a), Value::Tensor(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<TensorMeta> for Value {
    fn from(v: TensorMeta) -> Self {
        Value::tensor(v)
    }
}

impl From<Arc<SubclassInstance>> for Value {
    fn from(v: Arc<SubclassInstance>) -> Self {
        Value::Instance(v)
    }
}
