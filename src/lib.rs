//! Keyed tree reconciliation: diff a freshly built node tree against the last
//! committed render of a context and emit ordered insert/update/move/remove
//! patches for the rendered surface.
//!
//! Built with the `python` feature, the crate is also a Python extension
//! module exposing the same engine to the host UI framework.
mod config;
mod diff_engine;
mod errors;
mod ids;
mod node;
mod props;
mod reconciler;
mod renderer;
mod store;
mod types;

#[cfg(feature = "python")]
mod converters;
#[cfg(feature = "python")]
mod python;

pub use config::ReconcilerConfig;
pub use diff_engine::should_replace;
pub use errors::ReconcilerError;
pub use ids::IdAllocator;
pub use node::{ElementNode, Node, identity};
pub use props::{ComparePolicy, bool_prop_or, diff_props, int_prop_or, prop_eq, str_prop_or};
pub use reconciler::Reconciler;
pub use renderer::{HtmlStubRenderer, Renderer};
pub use store::RenderStore;
pub use types::{Key, NodeIdentity, Patch, PatchAction, PropValue, Props, RenderedMap, RenderedNode, props_to_json};
