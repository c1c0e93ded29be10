//! Python module entry point with GIL-safe operations
use crate::converters::{json_to_pyobject, py_dict_to_props};
use crate::errors::ReconcilerError;
use crate::node::{Node, identity};
use crate::reconciler::Reconciler;
use crate::renderer::{HtmlStubRenderer, Renderer};
use crate::types::{Key, NodeIdentity, PatchAction, Props, props_to_json};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyInt, PyList, PyString};
use std::collections::HashMap;

/// Rust-side snapshot of one Python widget, taken before diffing so the
/// engine never calls back into Python mid-traversal.
struct PyWidgetNode {
    widget_type: String,
    key: Option<Key>,
    token: Option<String>,
    props: Props,
    children: Vec<PyWidgetNode>,
}

impl Node for PyWidgetNode {
    fn type_name(&self) -> &str {
        &self.widget_type
    }

    fn explicit_key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    fn implicit_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn children(&self) -> Vec<&dyn Node> {
        self.children.iter().map(|c| c as &dyn Node).collect()
    }

    fn render_props(&self) -> Props {
        self.props.clone()
    }
}

/// Snapshots `widget` and its subtree, remembering each widget object by
/// identity for markup generation.
fn snapshot_widget<'py>(
    py: Python<'py>,
    widget: &Bound<'py, PyAny>,
    widgets: &mut HashMap<NodeIdentity, Py<PyAny>>,
) -> Result<PyWidgetNode, ReconcilerError> {
    let widget_type = widget.get_type().name()?.to_string();

    // Key(value) objects carry the user value in `.value`.
    let key = match widget.getattr("key") {
        Ok(key) if !key.is_none() => Some(key_from_python(&key.getattr("value").unwrap_or(key))?),
        _ => None,
    };
    let token = widget
        .getattr("_internal_id")
        .ok()
        .and_then(|id| id.extract::<String>().ok());

    let props_any = widget.getattr("render_props")?.call0()?;
    let props = py_dict_to_props(py, &props_any)?;

    let children_any = widget.getattr("get_children")?.call0()?;
    let children_list = children_any
        .cast::<PyList>()
        .map_err(|e| ReconcilerError::Python(format!("get_children did not return a list: {}", e)))?;
    let mut children = Vec::with_capacity(children_list.len());
    for child in children_list.iter() {
        children.push(snapshot_widget(py, &child, widgets)?);
    }

    let node = PyWidgetNode { widget_type, key, token, props, children };
    widgets.insert(identity(&node)?, widget.clone().unbind());
    Ok(node)
}

/// Strings and integers keep their kind; anything else is keyed by `repr`.
fn key_from_python(value: &Bound<'_, PyAny>) -> Result<Key, ReconcilerError> {
    if value.is_instance_of::<PyString>() {
        return Ok(Key::Str(value.extract()?));
    }
    if value.is_instance_of::<PyInt>() && !value.is_instance_of::<PyBool>() {
        if let Ok(n) = value.extract::<i64>() {
            return Ok(Key::Int(n));
        }
    }
    Ok(Key::Repr(value.repr()?.to_string()))
}

/// Uses the widget class's `_generate_html_stub` when it has one.
struct PyStubRenderer<'py, 'w> {
    py: Python<'py>,
    widgets: &'w HashMap<NodeIdentity, Py<PyAny>>,
}

impl Renderer for PyStubRenderer<'_, '_> {
    fn generate_markup(
        &self,
        node: &dyn Node,
        surface_id: &str,
        props: &Props,
    ) -> Result<String, ReconcilerError> {
        let widget = identity(node).ok().and_then(|id| self.widgets.get(&id));
        if let Some(widget) = widget {
            let widget_bound = widget.bind(self.py);
            if let Ok(generator) = widget_bound.get_type().getattr("_generate_html_stub") {
                let props_py = json_to_pyobject(self.py, &props_to_json(props))?;
                let html_id_py = PyString::new(self.py, surface_id);
                return generator
                    .call1((widget_bound, html_id_py, props_py))?
                    .extract::<String>()
                    .map_err(|e| ReconcilerError::Render {
                        widget_type: node.type_name().to_string(),
                        details: e.to_string(),
                    });
            }
        }
        HtmlStubRenderer.generate_markup(node, surface_id, props)
    }
}

#[pyclass(name = "Reconciler", unsendable)]
pub struct PyReconciler {
    engine: Reconciler,
}

#[pymethods]
impl PyReconciler {
    #[new]
    fn new() -> Self {
        PyReconciler { engine: Reconciler::new() }
    }

    fn clear_context(&mut self, context_key: String) {
        self.engine.clear_context(&context_key);
    }

    fn clear_all_contexts(&mut self) {
        self.engine.clear_all_contexts();
    }

    /// Returns the patches as `{"action", "html_id", "data"}` dicts.
    #[pyo3(signature = (new_widget_root, parent_html_id, context_key="main".to_string()))]
    fn reconcile<'py>(
        &mut self,
        py: Python<'py>,
        new_widget_root: Option<Bound<'py, PyAny>>,
        parent_html_id: String,
        context_key: String,
    ) -> PyResult<Bound<'py, PyList>> {
        let mut widgets = HashMap::new();
        let root = new_widget_root
            .as_ref()
            .map(|widget| snapshot_widget(py, widget, &mut widgets))
            .transpose()?;

        let renderer = PyStubRenderer { py, widgets: &widgets };
        let patches = self.engine.reconcile_with(
            root.as_ref().map(|node| node as &dyn Node),
            &parent_html_id,
            &context_key,
            &renderer,
        )?;

        let list = PyList::empty(py);
        for patch in &patches {
            list.append(json_to_pyobject(py, &patch.to_wire())?)?;
        }
        Ok(list)
    }

    /// Committed baseline of a context as `{surface_id: record}` dicts.
    fn rendered_map<'py>(&self, py: Python<'py>, context_key: String) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        if let Some(mapping) = self.engine.rendered(&context_key) {
            for record in mapping.values() {
                let value = serde_json::to_value(record).map_err(|e| ReconcilerError::Python(e.to_string()))?;
                dict.set_item(&record.surface_id, json_to_pyobject(py, &value)?)?;
            }
        }
        Ok(dict)
    }
}

#[pymodule]
fn tree_reconciler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyReconciler>()?;

    // Export patch types as constants
    for action in [PatchAction::Insert, PatchAction::Update, PatchAction::Move, PatchAction::Remove] {
        let name = action.to_string();
        m.add(name.as_str(), name.as_str())?;
    }
    Ok(())
}
