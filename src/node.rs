//! What the engine needs from a tree node, and how a node is identified.
use crate::errors::ReconcilerError;
use crate::types::{Key, NodeIdentity, PropValue, Props};

/// A node of the logical tree handed to [`crate::Reconciler::reconcile`].
///
/// The engine only borrows nodes for the duration of one call.
pub trait Node {
    fn type_name(&self) -> &str;

    fn explicit_key(&self) -> Option<&Key>;

    /// Per-instance token used when no explicit key is given.
    fn implicit_token(&self) -> Option<&str>;

    /// Children in render order; empty for leaves.
    fn children(&self) -> Vec<&dyn Node>;

    fn render_props(&self) -> Props;
}

/// Resolves the identity a node is matched by. An explicit key always wins.
pub fn identity(node: &dyn Node) -> Result<NodeIdentity, ReconcilerError> {
    if let Some(key) = node.explicit_key() {
        return Ok(NodeIdentity::Explicit(key.clone()));
    }
    node.implicit_token()
        .map(|token| NodeIdentity::Implicit(token.to_string()))
        .ok_or_else(|| ReconcilerError::MissingIdentity {
            widget_type: node.type_name().to_string(),
        })
}

/// Owned tree node for Rust callers.
///
/// Every constructed element gets a fresh implicit token; clones share it, so
/// a retained (or cloned) tree matches itself while a rebuilt tree without
/// keys does not.
#[derive(Debug)]
pub struct ElementNode {
    type_name: String,
    key: Option<Key>,
    token: String,
    props: Props,
    children: Vec<ElementNode>,
}

impl ElementNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        ElementNode {
            type_name: type_name.into(),
            key: None,
            token: uuid::Uuid::new_v4().to_string(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ElementNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        self.props.insert(name.into(), value.into());
    }

    pub fn remove_prop(&mut self, name: &str) -> Option<PropValue> {
        self.props.shift_remove(name)
    }

    pub fn children_mut(&mut self) -> &mut Vec<ElementNode> {
        &mut self.children
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }

    fn shell(&self) -> Self {
        ElementNode {
            type_name: self.type_name.clone(),
            key: self.key.clone(),
            token: self.token.clone(),
            props: self.props.clone(),
            children: Vec::new(),
        }
    }
}

// Clone and Drop walk the tree with an explicit stack so arbitrarily deep
// trees never exhaust the call stack.
impl Clone for ElementNode {
    fn clone(&self) -> Self {
        let mut preorder = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            preorder.push((node.shell(), node.children.len()));
            pending.extend(node.children.iter().rev());
        }

        // Walking preorder backwards, a node's finished children sit on top
        // of `built` in reverse order.
        let mut built: Vec<ElementNode> = Vec::with_capacity(preorder.len());
        for (mut shell, child_count) in preorder.into_iter().rev() {
            let mut children = built.split_off(built.len() - child_count);
            children.reverse();
            shell.children = children;
            built.push(shell);
        }
        built.pop().unwrap_or_else(|| self.shell())
    }
}

impl Drop for ElementNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl Node for ElementNode {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn explicit_key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    fn implicit_token(&self) -> Option<&str> {
        Some(&self.token)
    }

    fn children(&self) -> Vec<&dyn Node> {
        self.children.iter().map(|c| c as &dyn Node).collect()
    }

    fn render_props(&self) -> Props {
        self.props.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Anonymous;

    impl Node for Anonymous {
        fn type_name(&self) -> &str {
            "Anonymous"
        }
        fn explicit_key(&self) -> Option<&Key> {
            None
        }
        fn implicit_token(&self) -> Option<&str> {
            None
        }
        fn children(&self) -> Vec<&dyn Node> {
            Vec::new()
        }
        fn render_props(&self) -> Props {
            Props::new()
        }
    }

    #[test]
    fn explicit_key_wins_over_token() {
        let node = ElementNode::new("Text").key("title");
        assert_eq!(identity(&node).unwrap(), NodeIdentity::Explicit(Key::from("title")));
    }

    #[test]
    fn implicit_identity_follows_the_instance() {
        let node = ElementNode::new("Text");
        let retained = node.clone();
        let rebuilt = ElementNode::new("Text");
        assert_eq!(identity(&node).unwrap(), identity(&retained).unwrap());
        assert_ne!(identity(&node).unwrap(), identity(&rebuilt).unwrap());
        assert_eq!(identity(&node).unwrap(), NodeIdentity::Implicit(node.token().to_string()));
    }

    #[test]
    fn node_without_any_identity_is_rejected() {
        let err = identity(&Anonymous).unwrap_err();
        assert!(matches!(err, ReconcilerError::MissingIdentity { widget_type } if widget_type == "Anonymous"));
    }

    #[test]
    fn clone_keeps_shape_order_and_tokens() {
        let tree = ElementNode::new("Column")
            .key("root")
            .child(ElementNode::new("Row").child(ElementNode::new("Icon")).child(ElementNode::new("Text")))
            .child(ElementNode::new("Image").prop("src", "a.png"));
        let copy = tree.clone();

        let mut pending = vec![(&tree, &copy)];
        while let Some((a, b)) = pending.pop() {
            assert_eq!(a.type_name, b.type_name);
            assert_eq!(a.key, b.key);
            assert_eq!(a.token(), b.token());
            assert_eq!(a.props, b.props);
            assert_eq!(a.children.len(), b.children.len());
            pending.extend(a.children.iter().zip(b.children.iter()));
        }
    }

    #[test]
    fn very_deep_trees_clone_count_and_drop() {
        let mut tree = ElementNode::new("Leaf");
        for _ in 0..200_000 {
            tree = ElementNode::new("Box").child(tree);
        }
        let copy = tree.clone();
        assert_eq!(copy.subtree_len(), 200_001);
        drop(tree);
        drop(copy);
    }

    #[test]
    fn subtree_len_counts_every_node() {
        let tree = ElementNode::new("Column")
            .child(ElementNode::new("Text"))
            .child(ElementNode::new("Row").child(ElementNode::new("Icon")));
        assert_eq!(tree.subtree_len(), 4);
        assert_eq!(tree.children().len(), 2);
    }
}
