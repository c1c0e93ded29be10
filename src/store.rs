//! Per-context committed render baselines
use crate::errors::ReconcilerError;
use crate::types::RenderedMap;
use std::collections::{HashMap, HashSet};

/// Holds one [`RenderedMap`] per named context. Contexts share nothing.
#[derive(Debug, Default)]
pub struct RenderStore {
    contexts: HashMap<String, RenderedMap>,
}

impl RenderStore {
    pub fn new() -> Self {
        RenderStore::default()
    }

    /// The context's mapping, created empty on first use.
    pub fn mapping_for(&mut self, context: &str) -> &mut RenderedMap {
        self.contexts.entry(context.to_string()).or_default()
    }

    pub fn get(&self, context: &str) -> Option<&RenderedMap> {
        self.contexts.get(context)
    }

    /// Replaces the context's mapping wholesale.
    pub fn commit(&mut self, context: &str, mapping: RenderedMap) {
        self.contexts.insert(context.to_string(), mapping);
    }

    /// Drops the context; returns whether it existed.
    pub fn clear(&mut self, context: &str) -> bool {
        self.contexts.remove(context).is_some()
    }

    pub fn clear_all(&mut self) {
        self.contexts.clear();
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// Checks the structural invariants of a context's committed mapping.
    /// A context that was never used is trivially valid.
    pub fn validate(&self, context: &str) -> Result<(), ReconcilerError> {
        match self.contexts.get(context) {
            Some(mapping) => validate_mapping(context, mapping),
            None => Ok(()),
        }
    }
}

fn malformed(context: &str, details: String) -> ReconcilerError {
    ReconcilerError::MalformedContext { context: context.to_string(), details }
}

pub(crate) fn validate_mapping(context: &str, mapping: &RenderedMap) -> Result<(), ReconcilerError> {
    let mut surface_ids = HashSet::with_capacity(mapping.len());
    for record in mapping.values() {
        if !surface_ids.insert(record.surface_id.as_str()) {
            return Err(malformed(context, format!("surface id '{}' is used twice", record.surface_id)));
        }
    }

    // Everything outside the tree must hang off the one root anchor.
    let mut external_parents = HashSet::new();
    for record in mapping.values() {
        if !surface_ids.contains(record.parent_surface_id.as_str()) {
            external_parents.insert(record.parent_surface_id.as_str());
        }
    }
    if external_parents.len() > 1 {
        let mut parents: Vec<_> = external_parents.into_iter().collect();
        parents.sort_unstable();
        return Err(malformed(
            context,
            format!("records hang off unrelated parents {:?}", parents),
        ));
    }

    for record in mapping.values() {
        for child in &record.children {
            match mapping.get(child) {
                Some(child_record) if child_record.parent_surface_id == record.surface_id => {}
                Some(child_record) => {
                    return Err(malformed(
                        context,
                        format!(
                            "child {} of '{}' names '{}' as its parent",
                            child, record.surface_id, child_record.parent_surface_id
                        ),
                    ));
                }
                None => {
                    return Err(malformed(
                        context,
                        format!("child {} of '{}' has no record", child, record.surface_id),
                    ));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Key, NodeIdentity, Props, RenderedNode};

    fn record(surface_id: &str, parent: &str, children: &[&str]) -> RenderedNode {
        RenderedNode {
            surface_id: surface_id.into(),
            widget_type: "Column".into(),
            key: None,
            implicit_token: None,
            props: Props::new(),
            parent_surface_id: parent.into(),
            children: children.iter().map(|k| NodeIdentity::Explicit(Key::from(*k))).collect(),
        }
    }

    fn id(key: &str) -> NodeIdentity {
        NodeIdentity::Explicit(Key::from(key))
    }

    #[test]
    fn mapping_is_created_on_first_use() {
        let mut store = RenderStore::new();
        assert!(store.get("main").is_none());
        assert!(store.mapping_for("main").is_empty());
        assert!(store.get("main").is_some());
    }

    #[test]
    fn commit_replaces_and_clear_drops() {
        let mut store = RenderStore::new();
        let mut mapping = RenderedMap::new();
        mapping.insert(id("root"), record("s1", "root-container", &[]));
        store.commit("main", mapping);
        store.mapping_for("dialog");

        let mut replacement = RenderedMap::new();
        replacement.insert(id("other"), record("s2", "root-container", &[]));
        store.commit("main", replacement);
        let main = store.get("main").unwrap();
        assert_eq!(main.len(), 1);
        assert!(main.contains_key(&id("other")));

        assert!(store.clear("main"));
        assert!(!store.clear("main"));
        assert_eq!(store.contexts().collect::<Vec<_>>(), vec!["dialog"]);
        store.clear_all();
        assert_eq!(store.contexts().count(), 0);
    }

    #[test]
    fn well_formed_tree_validates() {
        let mut mapping = RenderedMap::new();
        mapping.insert(id("root"), record("s1", "root-container", &["a", "b"]));
        mapping.insert(id("a"), record("s2", "s1", &[]));
        mapping.insert(id("b"), record("s3", "s1", &[]));
        assert!(validate_mapping("main", &mapping).is_ok());
    }

    #[test]
    fn unresolvable_parent_is_reported() {
        let mut mapping = RenderedMap::new();
        mapping.insert(id("root"), record("s1", "root-container", &[]));
        mapping.insert(id("stray"), record("s2", "ghost", &[]));
        let err = validate_mapping("main", &mapping).unwrap_err();
        assert!(matches!(err, ReconcilerError::MalformedContext { ref context, .. } if context == "main"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn dangling_child_is_reported() {
        let mut mapping = RenderedMap::new();
        mapping.insert(id("root"), record("s1", "root-container", &["missing"]));
        let err = validate_mapping("main", &mapping).unwrap_err();
        assert!(err.to_string().contains("has no record"));
    }

    #[test]
    fn reused_surface_id_is_reported() {
        let mut mapping = RenderedMap::new();
        mapping.insert(id("root"), record("s1", "root-container", &["a"]));
        mapping.insert(id("a"), record("s1", "s1", &[]));
        assert!(validate_mapping("main", &mapping).is_err());
    }
}
