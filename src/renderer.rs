//! Markup collaborator used for `Insert` patches
use crate::errors::ReconcilerError;
use crate::node::Node;
use crate::props::{bool_prop_or, str_prop_or};
use crate::types::Props;
use phf::phf_map;

/// Produces the initial serialized form of a node. Only called for inserts;
/// updates travel as prop deltas.
pub trait Renderer {
    fn generate_markup(
        &self,
        node: &dyn Node,
        surface_id: &str,
        props: &Props,
    ) -> Result<String, ReconcilerError>;
}

impl<F> Renderer for F
where
    F: Fn(&dyn Node, &str, &Props) -> Result<String, ReconcilerError>,
{
    fn generate_markup(
        &self,
        node: &dyn Node,
        surface_id: &str,
        props: &Props,
    ) -> Result<String, ReconcilerError> {
        self(node, surface_id, props)
    }
}

// Compile-time widget tag lookup (zero allocation)
static WIDGET_TAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "Text" => "p",
    "Image" => "img",
    "Icon" => "i",
    "TextButton" => "button",
    "ElevatedButton" => "button",
    "IconButton" => "button",
    "FloatingActionButton" => "button",
    "SnackBarAction" => "button",
};

const VOID_TAGS: [&str; 3] = ["img", "hr", "br"];

/// Escapes text for use inside an attribute value or element body.
fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Bare element stub: tag from the widget type, id, classes and the few
/// attributes a patch applier needs before the first prop update.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlStubRenderer;

impl Renderer for HtmlStubRenderer {
    fn generate_markup(
        &self,
        node: &dyn Node,
        surface_id: &str,
        props: &Props,
    ) -> Result<String, ReconcilerError> {
        let widget_type = node.type_name();
        let tag = WIDGET_TAGS.get(widget_type).copied().unwrap_or("div");
        let classes = html_escape(str_prop_or(props, "css_class", ""));

        let mut attrs = String::new();
        if widget_type == "Image" {
            attrs.push_str(&format!(r#" src="{}" alt="""#, html_escape(str_prop_or(props, "src", ""))));
        }
        if bool_prop_or(props, "enabled", true) {
            let callback = str_prop_or(props, "onPressedName", "");
            if !callback.is_empty() {
                attrs.push_str(&format!(r#" onclick="handleClick('{}')""#, html_escape(callback)));
            }
        }
        let tooltip = str_prop_or(props, "tooltip", "");
        if !tooltip.is_empty() {
            attrs.push_str(&format!(r#" title="{}""#, html_escape(tooltip)));
        }

        if VOID_TAGS.contains(&tag) {
            return Ok(format!(r#"<{tag} id="{surface_id}" class="{classes}"{attrs}>"#));
        }
        let inner = if widget_type == "Text" {
            html_escape(str_prop_or(props, "data", ""))
        } else {
            String::new()
        };
        Ok(format!(r#"<{tag} id="{surface_id}" class="{classes}"{attrs}>{inner}</{tag}>"#))
    }
}
