//! Minimal pytree traversal over `Value`.
//!
//! Containers (lists, tuples, maps) are nodes; everything else is a leaf.

use super::value::{Kwargs, Value};
use crate::error::Result;

/// Map `f` over the leaves selected by `pred`, rebuilding containers.
/// Unselected leaves are cloned unchanged.
pub fn tree_map_only<P, F>(value: &Value, pred: &P, f: &mut F) -> Result<Value>
where
    P: Fn(&Value) -> bool,
    F: FnMut(&Value) -> Result<Value>,
{
    match value {
        Value::List(items) => Ok(Value::List(map_slice(items, pred, f)?)),
        Value::Tuple(items) => Ok(Value::Tuple(map_slice(items, pred, f)?)),
        Value::Map(map) => Ok(Value::Map(map_kwargs(map, pred, f)?)),
        leaf if pred(leaf) => f(leaf),
        leaf => Ok(leaf.clone()),
    }
}

pub fn map_slice<P, F>(items: &[Value], pred: &P, f: &mut F) -> Result<Vec<Value>>
where
    P: Fn(&Value) -> bool,
    F: FnMut(&Value) -> Result<Value>,
{
    items.iter().map(|item| tree_map_only(item, pred, f)).collect()
}

pub fn map_kwargs<P, F>(kwargs: &Kwargs, pred: &P, f: &mut F) -> Result<Kwargs>
where
    P: Fn(&Value) -> bool,
    F: FnMut(&Value) -> Result<Value>,
{
    let mut out = Kwargs::new();
    for (key, value) in kwargs {
        out.insert(key.clone(), tree_map_only(value, pred, f)?);
    }
    Ok(out)
}

/// Visit every leaf in depth-first order.
pub fn for_each_leaf<'a>(value: &'a Value, visit: &mut dyn FnMut(&'a Value)) {
    match value {
        Value::List(items) | Value::Tuple(items) => {
            for item in items {
                for_each_leaf(item, visit);
            }
        }
        Value::Map(map) => {
            for item in map.values() {
                for_each_leaf(item, visit);
            }
        }
        leaf => visit(leaf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_only_selected_leaves() {
        let tree = Value::List(vec![
            Value::Int(1),
            Value::Tuple(vec![Value::from("a"), Value::Int(2)]),
        ]);
        let is_int = |v: &Value| matches!(v, Value::Int(_));
        let mut double = |v: &Value| Ok(Value::Int(v.as_int().unwrap_or(0) * 2));
        let out = tree_map_only(&tree, &is_int, &mut double).unwrap();
        assert_eq!(
            out,
            Value::List(vec![
                Value::Int(2),
                Value::Tuple(vec![Value::from("a"), Value::Int(4)]),
            ])
        );
    }

    #[test]
    fn test_map_kwargs_keeps_keys() {
        let mut kwargs = Kwargs::new();
        kwargs.insert("alpha".to_string(), Value::Int(3));
        kwargs.insert("name".to_string(), Value::from("n"));
        let is_int = |v: &Value| matches!(v, Value::Int(_));
        let mut neg = |v: &Value| Ok(Value::Int(-v.as_int().unwrap_or(0)));
        let out = map_kwargs(&kwargs, &is_int, &mut neg).unwrap();
        assert_eq!(out["alpha"], Value::Int(-3));
        assert_eq!(out["name"], Value::from("n"));
    }

    #[test]
    fn test_for_each_leaf_order() {
        let mut map = Kwargs::new();
        map.insert("k".to_string(), Value::Int(3));
        let tree = Value::Tuple(vec![Value::Int(1), Value::List(vec![Value::Int(2)]), Value::Map(map)]);
        let mut seen = Vec::new();
        for_each_leaf(&tree, &mut |v| seen.push(v.as_int().unwrap()));
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
