//! Core diffing engine: walks the new tree against the previous render of one
//! context and emits the ordered patch list.
//!
//! Traversal uses an explicit task stack instead of recursion. The order of
//! emitted patches is the same as a depth-first recursive walk: a node's own
//! patch, then its matched children (each fully, in new order), then the
//! inserts and moves that place its children.
use crate::errors::ReconcilerError;
use crate::ids::IdAllocator;
use crate::node::{Node, identity};
use crate::props::{ComparePolicy, diff_props};
use crate::renderer::Renderer;
use crate::types::{Key, NodeIdentity, Patch, RenderedMap, RenderedNode};
use log::{debug, trace};
use std::collections::{HashMap, HashSet};

/// Whether the new node must be inserted fresh instead of updating `old`.
pub fn should_replace(old: &RenderedNode, new_key: Option<&Key>, new_type: &str) -> bool {
    match (new_key, old.key.as_ref()) {
        (Some(new_key), Some(old_key)) => new_key != old_key || old.widget_type != new_type,
        (Some(_), None) | (None, Some(_)) => true,
        (None, None) => old.widget_type != new_type,
    }
}

struct ChildSlot<'n> {
    node: &'n dyn Node,
    identity: NodeIdentity,
    surface_id: Option<String>,
    is_new: bool,
    moved: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Updating matched children in new order and detecting moves.
    Matching,
    /// Inserting new children and relocating moved ones.
    Placing,
}

struct ChildList<'n> {
    parent_surface_id: String,
    old_positions: HashMap<NodeIdentity, usize>,
    slots: Vec<ChildSlot<'n>>,
    anchors: Vec<Option<String>>,
    phase: Phase,
    cursor: usize,
    /// Slot whose update is on the stack above this list.
    awaiting: Option<usize>,
    max_old_position: Option<usize>,
}

enum Task<'n> {
    Diff {
        old: Option<NodeIdentity>,
        node: &'n dyn Node,
        parent_surface_id: String,
    },
    Insert {
        node: &'n dyn Node,
        parent_surface_id: String,
        anchor: Option<String>,
    },
    Children(ChildList<'n>),
}

pub struct DiffEngine<'a> {
    old_tree: &'a RenderedMap,
    ids: &'a mut IdAllocator,
    renderer: &'a dyn Renderer,
    policy: ComparePolicy,
    new_tree: RenderedMap,
    patches: Vec<Patch>,
}

impl<'a> DiffEngine<'a> {
    pub fn new(
        old_tree: &'a RenderedMap,
        ids: &'a mut IdAllocator,
        renderer: &'a dyn Renderer,
        policy: ComparePolicy,
    ) -> Self {
        DiffEngine {
            old_tree,
            ids,
            renderer,
            policy,
            new_tree: RenderedMap::new(),
            patches: Vec::new(),
        }
    }

    /// Diffs `root` (matched against `old_root`) under `parent_surface_id`,
    /// then sweeps stale records. Returns the patches and the mapping to commit.
    pub fn run(
        mut self,
        old_root: Option<NodeIdentity>,
        root: Option<&dyn Node>,
        parent_surface_id: &str,
    ) -> Result<(Vec<Patch>, RenderedMap), ReconcilerError> {
        if let Some(root) = root {
            let mut stack = vec![Task::Diff {
                old: old_root,
                node: root,
                parent_surface_id: parent_surface_id.to_string(),
            }];
            while let Some(task) = stack.pop() {
                match task {
                    Task::Diff { old, node, parent_surface_id } => {
                        self.diff_node(&mut stack, old, node, parent_surface_id)?
                    }
                    Task::Insert { node, parent_surface_id, anchor } => {
                        self.insert_node(&mut stack, node, parent_surface_id, anchor)?
                    }
                    Task::Children(list) => self.diff_children(&mut stack, list)?,
                }
            }
        }

        self.sweep_removed();
        Ok((self.patches, self.new_tree))
    }

    fn diff_node<'n>(
        &mut self,
        stack: &mut Vec<Task<'n>>,
        old_identity: Option<NodeIdentity>,
        node: &'n dyn Node,
        parent_surface_id: String,
    ) -> Result<(), ReconcilerError> {
        let old_tree = self.old_tree;
        let Some(old) = old_identity.as_ref().and_then(|id| old_tree.get(id)) else {
            return self.insert_node(stack, node, parent_surface_id, None);
        };

        if should_replace(old, node.explicit_key(), node.type_name()) {
            trace!(
                "DiffEngine: replace {} ('{}' -> '{}'), old surface id '{}' left for the sweep",
                identity(node)?,
                old.widget_type,
                node.type_name(),
                old.surface_id
            );
            return self.insert_node(stack, node, parent_surface_id, None);
        }

        self.update_node(stack, old, node, parent_surface_id)
    }

    fn update_node<'n>(
        &mut self,
        stack: &mut Vec<Task<'n>>,
        old: &RenderedNode,
        node: &'n dyn Node,
        parent_surface_id: String,
    ) -> Result<(), ReconcilerError> {
        let node_identity = identity(node)?;
        let surface_id = old.surface_id.clone();
        let props = node.render_props();

        if let Some(changes) = diff_props(&old.props, &props, self.policy) {
            trace!("DiffEngine: update '{}' ({} changed props)", surface_id, changes.len());
            self.patches.push(Patch::Update { target: surface_id.clone(), changes });
        }

        let slots = node
            .children()
            .into_iter()
            .map(|child| {
                Ok::<_, ReconcilerError>(ChildSlot {
                    node: child,
                    identity: identity(child)?,
                    surface_id: None,
                    is_new: false,
                    moved: false,
                })
            })
            .collect::<Result<Vec<_>, ReconcilerError>>()?;

        self.record(
            node_identity,
            RenderedNode {
                surface_id: surface_id.clone(),
                widget_type: node.type_name().to_string(),
                key: node.explicit_key().cloned(),
                implicit_token: node.implicit_token().map(str::to_string),
                props,
                parent_surface_id,
                children: slots.iter().map(|slot| slot.identity.clone()).collect(),
            },
        )?;

        if !slots.is_empty() {
            let old_positions = old
                .children
                .iter()
                .enumerate()
                .map(|(position, id)| (id.clone(), position))
                .collect();
            let anchors = vec![None; slots.len()];
            stack.push(Task::Children(ChildList {
                parent_surface_id: surface_id,
                old_positions,
                slots,
                anchors,
                phase: Phase::Matching,
                cursor: 0,
                awaiting: None,
                max_old_position: None,
            }));
        }
        Ok(())
    }

    /// Inserts `node` with a fresh surface id; its children follow as inserts.
    fn insert_node<'n>(
        &mut self,
        stack: &mut Vec<Task<'n>>,
        node: &'n dyn Node,
        parent_surface_id: String,
        anchor: Option<String>,
    ) -> Result<(), ReconcilerError> {
        let node_identity = identity(node)?;
        let surface_id = self.ids.next_id()?;
        let props = node.render_props();
        let markup = self.renderer.generate_markup(node, &surface_id, &props)?;
        let children = node.children();
        let child_identities = children
            .iter()
            .map(|child| identity(*child))
            .collect::<Result<Vec<_>, _>>()?;

        trace!(
            "DiffEngine: insert {} as '{}' into '{}' before {:?}",
            node_identity, surface_id, parent_surface_id, anchor
        );
        self.patches.push(Patch::Insert {
            target: surface_id.clone(),
            markup,
            parent: parent_surface_id.clone(),
            props: props.clone(),
            anchor,
        });
        self.record(
            node_identity,
            RenderedNode {
                surface_id: surface_id.clone(),
                widget_type: node.type_name().to_string(),
                key: node.explicit_key().cloned(),
                implicit_token: node.implicit_token().map(str::to_string),
                props,
                parent_surface_id,
                children: child_identities,
            },
        )?;

        for child in children.into_iter().rev() {
            stack.push(Task::Insert {
                node: child,
                parent_surface_id: surface_id.clone(),
                anchor: None,
            });
        }
        Ok(())
    }

    /// Advances one child-list reconciliation until it needs a nested task.
    fn diff_children<'n>(
        &mut self,
        stack: &mut Vec<Task<'n>>,
        mut list: ChildList<'n>,
    ) -> Result<(), ReconcilerError> {
        if let Some(index) = list.awaiting.take() {
            self.settle_matched(&mut list, index);
        }

        if list.phase == Phase::Matching {
            while list.cursor < list.slots.len() {
                let index = list.cursor;
                list.cursor += 1;
                if self.is_in_place_match(&list, index) {
                    let slot = &list.slots[index];
                    let task = Task::Diff {
                        old: Some(slot.identity.clone()),
                        node: slot.node,
                        parent_surface_id: list.parent_surface_id.clone(),
                    };
                    list.awaiting = Some(index);
                    stack.push(Task::Children(list));
                    stack.push(task);
                    return Ok(());
                }
                list.slots[index].is_new = true;
            }
            resolve_anchors(&mut list);
            list.phase = Phase::Placing;
            list.cursor = 0;
        }

        while list.cursor < list.slots.len() {
            let index = list.cursor;
            list.cursor += 1;
            let anchor = list.anchors[index].clone();
            let slot = &list.slots[index];

            if slot.is_new {
                let task = Task::Insert {
                    node: slot.node,
                    parent_surface_id: list.parent_surface_id.clone(),
                    anchor,
                };
                stack.push(Task::Children(list));
                stack.push(task);
                return Ok(());
            }
            if slot.moved {
                if let Some(surface_id) = &slot.surface_id {
                    trace!("DiffEngine: move '{}' before {:?}", surface_id, anchor);
                    self.patches.push(Patch::Move {
                        target: surface_id.clone(),
                        parent: list.parent_surface_id.clone(),
                        anchor,
                    });
                }
            }
        }
        Ok(())
    }

    /// A child is updated in place when it was a child of this parent before,
    /// its record still names this parent, and it is not being replaced.
    /// Anything else is placed as a new child.
    fn is_in_place_match(&self, list: &ChildList<'_>, index: usize) -> bool {
        let slot = &list.slots[index];
        if !list.old_positions.contains_key(&slot.identity) {
            return false;
        }
        self.old_tree.get(&slot.identity).is_some_and(|old| {
            old.parent_surface_id == list.parent_surface_id
                && !should_replace(old, slot.node.explicit_key(), slot.node.type_name())
        })
    }

    /// Monotonic move scan: a matched child whose old position is behind the
    /// furthest old position seen so far has to move.
    fn settle_matched(&self, list: &mut ChildList<'_>, index: usize) {
        let slot = &mut list.slots[index];
        slot.surface_id = self.new_tree.get(&slot.identity).map(|record| record.surface_id.clone());

        let Some(&old_position) = list.old_positions.get(&slot.identity) else {
            return;
        };
        if list.max_old_position.is_some_and(|max| old_position < max) {
            slot.moved = true;
        } else {
            list.max_old_position = Some(old_position);
        }
    }

    fn record(&mut self, node_identity: NodeIdentity, record: RenderedNode) -> Result<(), ReconcilerError> {
        if self.new_tree.contains_key(&node_identity) {
            return Err(ReconcilerError::DuplicateIdentity { identity: node_identity.to_string() });
        }
        self.new_tree.insert(node_identity, record);
        Ok(())
    }

    /// Removes every old record whose surface id no record of the new mapping
    /// carries any more.
    ///
    /// This differs from removing by identity. A keyed node that moves to
    /// another parent keeps its identity but is inserted under a fresh surface
    /// id, so its old surface id is removed here: consumers see `Insert` plus
    /// `Remove` for it, never a cross-parent `Move`. A root reused through the
    /// lone-record fallback keeps its surface id under a new identity and is
    /// not removed.
    fn sweep_removed(&mut self) {
        let live: HashSet<&str> = self.new_tree.values().map(|record| record.surface_id.as_str()).collect();
        let mut removed = Vec::new();
        for (node_identity, old) in self.old_tree {
            if !live.contains(old.surface_id.as_str()) {
                trace!("DiffEngine: remove '{}' ({})", old.surface_id, node_identity);
                removed.push(Patch::Remove { target: old.surface_id.clone() });
            }
        }
        debug!("DiffEngine: sweep removed {} of {} old records", removed.len(), self.old_tree.len());
        self.patches.extend(removed);
    }
}

/// Each child is anchored before the nearest following sibling that is
/// neither new nor moved.
fn resolve_anchors(list: &mut ChildList<'_>) {
    let mut next_stable: Option<String> = None;
    for index in (0..list.slots.len()).rev() {
        list.anchors[index] = next_stable.clone();
        let slot = &list.slots[index];
        if !slot.is_new && !slot.moved && slot.surface_id.is_some() {
            next_stable = slot.surface_id.clone();
        }
    }
}
