//! Global template functions

use minijinja::{Error, ErrorKind, Value};

/// Fail rendering with a message
///
/// Usage: {{ fail("namespace is required for this chart") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Return the first value that is defined, not none and not an empty string
///
/// Usage: {{ coalesce(namespace, vars.default_namespace, "default") }}
pub fn coalesce(args: Vec<Value>) -> Value {
    args.into_iter()
        .find(|arg| {
            !arg.is_undefined() && !arg.is_none() && !arg.as_str().is_some_and(str::is_empty)
        })
        .unwrap_or(Value::UNDEFINED)
}

/// Ternary operator
///
/// Usage: {{ ternary("Always", "IfNotPresent", vars.latest) }}
pub fn ternary(true_val: Value, false_val: Value, condition: Value) -> Value {
    if condition.is_true() {
        true_val
    } else {
        false_val
    }
}
