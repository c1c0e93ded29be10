//! Engine entry point: one store of committed baselines, one id allocator,
//! one markup collaborator.
use crate::config::ReconcilerConfig;
use crate::diff_engine::DiffEngine;
use crate::errors::ReconcilerError;
use crate::ids::IdAllocator;
use crate::node::{Node, identity};
use crate::props::ComparePolicy;
use crate::renderer::{HtmlStubRenderer, Renderer};
use crate::store::RenderStore;
use crate::types::{NodeIdentity, Patch, PatchAction, RenderedMap};
use log::{debug, info};

/// Keyed tree reconciler.
///
/// Calls take `&mut self`, so two reconciliations of one engine never
/// overlap. Engines are independent of each other.
#[derive(Debug)]
pub struct Reconciler<R = HtmlStubRenderer> {
    store: RenderStore,
    ids: IdAllocator,
    renderer: R,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::from_config(ReconcilerConfig::default())
    }

    pub fn from_config(config: ReconcilerConfig) -> Self {
        Self::with_renderer(HtmlStubRenderer, config)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Reconciler::new()
    }
}

impl<R: Renderer> Reconciler<R> {
    pub fn with_renderer(renderer: R, config: ReconcilerConfig) -> Self {
        info!("Reconciler initialized (compare policy {:?})", config.compare_policy);
        Reconciler {
            store: RenderStore::new(),
            ids: IdAllocator::with_limit(config.id_prefix.clone(), config.id_limit),
            renderer,
            config,
        }
    }

    /// Diffs `root` against what `context` last committed under
    /// `parent_anchor`, commits the new baseline and returns the patches.
    ///
    /// On error the context keeps its previous baseline.
    pub fn reconcile(
        &mut self,
        root: Option<&dyn Node>,
        parent_anchor: &str,
        context: &str,
    ) -> Result<Vec<Patch>, ReconcilerError> {
        let Reconciler { store, ids, renderer, config } = self;
        reconcile_into(store, ids, &*renderer, config.compare_policy, root, parent_anchor, context)
    }

    /// [`Self::reconcile`] against the configured default context.
    pub fn reconcile_main(
        &mut self,
        root: Option<&dyn Node>,
        parent_anchor: &str,
    ) -> Result<Vec<Patch>, ReconcilerError> {
        let context = self.config.default_context.clone();
        self.reconcile(root, parent_anchor, &context)
    }

    /// [`Self::reconcile`] with a markup collaborator for this call only.
    pub fn reconcile_with(
        &mut self,
        root: Option<&dyn Node>,
        parent_anchor: &str,
        context: &str,
        renderer: &dyn Renderer,
    ) -> Result<Vec<Patch>, ReconcilerError> {
        let policy = self.config.compare_policy;
        reconcile_into(&mut self.store, &mut self.ids, renderer, policy, root, parent_anchor, context)
    }

    /// Forgets `context`; the next reconciliation of it inserts everything.
    pub fn clear_context(&mut self, context: &str) {
        if self.store.clear(context) {
            info!("Reconciler: context '{}' cleared", context);
        }
    }

    pub fn clear_all_contexts(&mut self) {
        self.store.clear_all();
        info!("Reconciler: all contexts cleared");
    }

    /// Committed baseline of `context`, if it has been reconciled.
    pub fn rendered(&self, context: &str) -> Option<&RenderedMap> {
        self.store.get(context)
    }

    pub fn store(&self) -> &RenderStore {
        &self.store
    }

    /// Direct access to the baselines, for hosts that persist or seed them.
    /// Seeded state is validated on the next reconciliation.
    pub fn store_mut(&mut self) -> &mut RenderStore {
        &mut self.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

fn reconcile_into(
    store: &mut RenderStore,
    ids: &mut IdAllocator,
    renderer: &dyn Renderer,
    policy: ComparePolicy,
    root: Option<&dyn Node>,
    parent_anchor: &str,
    context: &str,
) -> Result<Vec<Patch>, ReconcilerError> {
    store.validate(context)?;
    let previous: &RenderedMap = store.mapping_for(context);
    debug!(
        "Reconciler: context '{}' under '{}', {} previous records, root {}",
        context,
        parent_anchor,
        previous.len(),
        if root.is_some() { "present" } else { "absent" }
    );

    let old_root = match root {
        Some(root) => resolve_old_root(previous, root, parent_anchor)?,
        None => None,
    };

    let (patches, mapping) = DiffEngine::new(previous, ids, renderer, policy).run(old_root, root, parent_anchor)?;

    debug!(
        "Reconciler: context '{}' -> {} patches ({} insert, {} update, {} move, {} remove)",
        context,
        patches.len(),
        count(&patches, PatchAction::Insert),
        count(&patches, PatchAction::Update),
        count(&patches, PatchAction::Move),
        count(&patches, PatchAction::Remove),
    );
    store.commit(context, mapping);
    Ok(patches)
}

/// Picks the old record the new root is diffed against: the record that hung
/// directly off the anchor, or failing that a lone record that looks like the
/// same root.
fn resolve_old_root(
    previous: &RenderedMap,
    root: &dyn Node,
    parent_anchor: &str,
) -> Result<Option<NodeIdentity>, ReconcilerError> {
    if let Some((id, _)) = previous.iter().find(|(_, record)| record.parent_surface_id == parent_anchor) {
        return Ok(Some(id.clone()));
    }

    if previous.len() == 1 {
        if let Some((id, record)) = previous.first() {
            let same_identity = *id == identity(root)?;
            let same_shape = record.key.is_some() == root.explicit_key().is_some()
                && record.widget_type == root.type_name();
            if same_identity || same_shape {
                return Ok(Some(id.clone()));
            }
        }
    }
    Ok(None)
}

fn count(patches: &[Patch], action: PatchAction) -> usize {
    patches.iter().filter(|p| p.action() == action).count()
}
