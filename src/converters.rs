//! Zero-panic conversion between Python values and property maps
use crate::errors::ReconcilerError;
use crate::types::{PropValue, Props};
use pyo3::IntoPyObjectExt;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule};

/// Convert a Python dict (e.g. a `render_props()` result) into a property map.
pub fn py_dict_to_props<'py>(
    py: Python<'py>,
    obj: &Bound<'py, PyAny>,
) -> Result<Props, ReconcilerError> {
    match python_to_json(py, obj)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, PropValue::from(v))).collect()),
        other => Err(ReconcilerError::Python(format!(
            "render_props() must return a dict, got {}",
            other
        ))),
    }
}

/// Convert a Python object to JSON. Values JSON cannot hold (callbacks,
/// handles) are replaced by their `repr`.
pub fn python_to_json<'py>(
    py: Python<'py>,
    obj: &Bound<'py, PyAny>,
) -> Result<serde_json::Value, ReconcilerError> {
    let json_mod = PyModule::import(py, "json")?;
    let builtins = PyModule::import(py, "builtins")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("default", builtins.getattr("repr")?)?;

    let dumped = json_mod.getattr("dumps")?.call((obj,), Some(&kwargs))?;
    let s: String = dumped.extract()?;
    serde_json::from_str(&s).map_err(|e| ReconcilerError::Python(format!("json.dumps produced invalid JSON: {}", e)))
}

/// Builds the Python value for a JSON value: objects become dicts, arrays
/// lists, and numbers keep their integer or float kind.
pub fn json_to_pyobject<'py>(
    py: Python<'py>,
    value: &serde_json::Value,
) -> PyResult<Bound<'py, PyAny>> {
    use serde_json::Value;

    match value {
        Value::Null => Ok(py.None().into_bound(py)),
        Value::Bool(flag) => flag.into_bound_py_any(py),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.into_bound_py_any(py)
            } else if let Some(unsigned) = number.as_u64() {
                unsigned.into_bound_py_any(py)
            } else {
                number.as_f64().unwrap_or(f64::NAN).into_bound_py_any(py)
            }
        }
        Value::String(text) => text.into_bound_py_any(py),
        Value::Array(items) => {
            let converted = items
                .iter()
                .map(|item| json_to_pyobject(py, item))
                .collect::<PyResult<Vec<_>>>()?;
            Ok(PyList::new(py, converted)?.into_any())
        }
        Value::Object(fields) => {
            let dict = PyDict::new(py);
            for (name, field) in fields {
                dict.set_item(name, json_to_pyobject(py, field)?)?;
            }
            Ok(dict.into_any())
        }
    }
}
