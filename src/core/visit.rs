//! Purpose: Walk a JSON tree and rewrite string leaves that start with a prefix.
//! Exports: `visit`.
//! Role: The tree rewriter behind every staging command.
//! Invariants: Arrays in index order, objects in insertion order, each node once.
//! Invariants: The first transform error stops the walk and is returned as is.
//! Notes: Recursion depth is unbounded; pathological nesting can exhaust the stack.
use serde_json::Value;

use super::error::Error;

pub fn visit<F>(node: &mut Value, prefix: &str, transform: &mut F) -> Result<(), Error>
where
    F: FnMut(&str) -> Result<String, Error>,
{
    match node {
        Value::Array(items) => {
            for item in items.iter_mut() {
                visit(item, prefix, transform)?;
            }
        }
        Value::Object(map) => {
            for (_, value) in map.iter_mut() {
                visit(value, prefix, transform)?;
            }
        }
        Value::String(text) => {
            if text.starts_with(prefix) {
                let replaced = transform(text.as_str())?;
                *text = replaced;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}
