//! Identity, property, record and patch types shared by every stage of a reconciliation
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// User-supplied key, stable across rebuilds of the tree.
///
/// Keys compare by kind and value: `Key::from(7)` and `Key::from("7")` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Str(String),
    /// Any other host value, held by its printed representation.
    Repr(String),
}

impl Key {
    pub fn new(value: impl Into<String>) -> Self {
        Key::Str(value.into())
    }

    /// The key's text when it is a string key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Str(s) => Some(s),
            Key::Int(_) | Key::Repr(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "Key({})", n),
            Key::Str(s) => write!(f, "Key({:?})", s),
            Key::Repr(r) => write!(f, "Key({})", r),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

/// What a node is matched by across two renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeIdentity {
    Explicit(Key),
    /// Per-instance token; only stable while the same node instance is retained.
    Implicit(String),
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdentity::Explicit(key) => write!(f, "{}", key),
            NodeIdentity::Implicit(token) => write!(f, "#{}", token),
        }
    }
}

/// Dynamically typed property value, as produced by a node's `render_props`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),
    Map(IndexMap<String, PropValue>),
    /// Host object the engine cannot look into (callbacks, handles). Carries
    /// a token that identifies the object.
    Opaque(String),
}

impl PropValue {
    /// Name of the value's kind, used for kind-change detection and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PropValue::Null => "null",
            PropValue::Bool(_) => "bool",
            PropValue::Int(_) => "int",
            PropValue::Float(_) => "float",
            PropValue::Str(_) => "str",
            PropValue::List(_) => "list",
            PropValue::Map(_) => "map",
            PropValue::Opaque(_) => "opaque",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropValue::Null => serde_json::Value::Null,
            PropValue::Bool(b) => serde_json::Value::Bool(*b),
            PropValue::Int(i) => serde_json::Value::from(*i),
            PropValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PropValue::Str(s) | PropValue::Opaque(s) => serde_json::Value::String(s.clone()),
            PropValue::List(items) => {
                serde_json::Value::Array(items.iter().map(PropValue::to_json).collect())
            }
            PropValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropValue::Null,
            serde_json::Value::Bool(b) => PropValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PropValue::Int(i),
                None => n.as_f64().map(PropValue::Float).unwrap_or(PropValue::Null),
            },
            serde_json::Value::String(s) => PropValue::Str(s),
            serde_json::Value::Array(items) => {
                PropValue::List(items.into_iter().map(PropValue::from).collect())
            }
            serde_json::Value::Object(map) => {
                PropValue::Map(map.into_iter().map(|(k, v)| (k, PropValue::from(v))).collect())
            }
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(values: Vec<T>) -> Self {
        PropValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Property map of one node, in the order the node reported it.
pub type Props = IndexMap<String, PropValue>;

/// What the engine remembers about a node currently on the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub surface_id: String,
    pub widget_type: String,
    pub key: Option<Key>,
    pub implicit_token: Option<String>,
    pub props: Props,
    pub parent_surface_id: String,
    /// Child identities in render order.
    pub children: Vec<NodeIdentity>,
}

/// One context's committed baseline, in commit order.
pub type RenderedMap = IndexMap<NodeIdentity, RenderedNode>;

/// Patch action enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchAction {
    Insert,
    Update,
    Move,
    Remove,
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatchAction::Insert => "INSERT",
            PatchAction::Update => "UPDATE",
            PatchAction::Move => "MOVE",
            PatchAction::Remove => "REMOVE",
        };
        f.write_str(name)
    }
}

/// One mutation instruction against the rendered surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Insert {
        target: String,
        markup: String,
        parent: String,
        props: Props,
        anchor: Option<String>,
    },
    Update {
        target: String,
        changes: Props,
    },
    Move {
        target: String,
        parent: String,
        anchor: Option<String>,
    },
    Remove {
        target: String,
    },
}

impl Patch {
    pub fn action(&self) -> PatchAction {
        match self {
            Patch::Insert { .. } => PatchAction::Insert,
            Patch::Update { .. } => PatchAction::Update,
            Patch::Move { .. } => PatchAction::Move,
            Patch::Remove { .. } => PatchAction::Remove,
        }
    }

    /// Surface id the patch applies to.
    pub fn target(&self) -> &str {
        match self {
            Patch::Insert { target, .. }
            | Patch::Update { target, .. }
            | Patch::Move { target, .. }
            | Patch::Remove { target } => target,
        }
    }

    /// Shape consumed by the host's patch applier.
    pub fn to_wire(&self) -> serde_json::Value {
        let data = match self {
            Patch::Insert { markup, parent, props, anchor, .. } => serde_json::json!({
                "html": markup,
                "parent_html_id": parent,
                "props": props_to_json(props),
                "before_id": anchor,
            }),
            Patch::Update { changes, .. } => serde_json::json!({ "props": props_to_json(changes) }),
            Patch::Move { parent, anchor, .. } => serde_json::json!({
                "parent_html_id": parent,
                "before_id": anchor,
            }),
            Patch::Remove { .. } => serde_json::json!({}),
        };
        serde_json::json!({
            "action": self.action().to_string(),
            "html_id": self.target(),
            "data": data,
        })
    }
}

impl Serialize for Patch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

pub fn props_to_json(props: &Props) -> serde_json::Value {
    serde_json::Value::Object(props.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
}
