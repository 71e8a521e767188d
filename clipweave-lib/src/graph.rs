//! Node-graph construction.
//!
//! A depth-first walk over the parsed DOM assigns every element a
//! fresh per-run id, maps its tag to a target archetype (with a tag
//! override when the target has no dedicated preset), and emits an
//! ordered child-id list. A leaf element whose only child is a single
//! text node collapses to a text payload instead of a child node.
//! Unknown tags never fail: they become generic blocks carrying the
//! original tag.

use crate::dom::dom_tree::{Document, ElementNode, Node};
use std::cell::RefCell;
use std::rc::Rc;

/// Target element archetypes. The vocabulary is the target format's,
/// not HTML's; everything HTML-specific rides in the tag override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Block,
    Heading,
    Paragraph,
    Link,
    Image,
    List,
    ListItem,
    HtmlEmbed,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Block => "Block",
            Archetype::Heading => "Heading",
            Archetype::Paragraph => "Paragraph",
            Archetype::Link => "Link",
            Archetype::Image => "Image",
            Archetype::List => "List",
            Archetype::ListItem => "ListItem",
            Archetype::HtmlEmbed => "HtmlEmbed",
        }
    }
}

/// Map an HTML tag to its archetype plus the tag-override flag. The
/// override is set whenever the archetype alone does not pin down the
/// rendered tag (e.g. `section` is a Block that must stay a section).
pub fn map_tag(tag: &str) -> (Archetype, bool) {
    match tag {
        "div" => (Archetype::Block, false),
        "section" | "article" | "header" | "footer" | "nav" | "main" | "aside" | "figure"
        | "span" | "address" => (Archetype::Block, true),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => (Archetype::Heading, true),
        "p" => (Archetype::Paragraph, false),
        "a" => (Archetype::Link, false),
        "img" => (Archetype::Image, false),
        "ul" => (Archetype::List, false),
        "ol" => (Archetype::List, true),
        "li" => (Archetype::ListItem, false),
        // No dedicated preset: generic container keeping the tag.
        _ => (Archetype::Block, true),
    }
}

/// Payload discriminated by archetype.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    None,
    Text(String),
    Link { url: String, text: Option<String> },
    Image { src: String, alt: Option<String> },
}

/// One target-format node. Identity is assigned once per run and never
/// reused.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub archetype: Archetype,
    pub tag: String,
    pub tag_override: bool,
    /// Class names in `class`-attribute order.
    pub classes: Vec<String>,
    /// Ordered child node ids.
    pub children: Vec<String>,
    pub payload: NodePayload,
}

/// Per-run id source. One counter covers nodes, styles, and synthetic
/// embeds so ids stay globally unique within a conversion.
#[derive(Debug, Default)]
pub struct IdGen {
    counter: u32,
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { counter: 0 }
    }

    pub fn next_node(&mut self) -> String {
        self.counter += 1;
        format!("n{:06}", self.counter)
    }

    pub fn next_style(&mut self) -> String {
        self.counter += 1;
        format!("s{:06}", self.counter)
    }
}

/// Result of one section's graph build.
#[derive(Debug, Default)]
pub struct BuiltGraph {
    /// All nodes, parents before children.
    pub nodes: Vec<GraphNode>,
    /// Ids of the section's top-level nodes.
    pub roots: Vec<String>,
    /// Text of `<style>` elements found in the fragment; fed back into
    /// the CSS pipeline by the orchestrator.
    pub inline_css: Vec<String>,
    /// Text of `<script>` elements; preserved via the embed hatch.
    pub inline_js: Vec<String>,
    pub warnings: Vec<String>,
}

/// Build the node graph for one parsed document. html5ever wraps every
/// fragment in `html > head > body`; the walk starts at the body's
/// children so wrapper elements never appear in the output.
pub fn build_graph(document: &Document, ids: &mut IdGen) -> BuiltGraph {
    let mut built = BuiltGraph::default();
    if let Some(body) = find_element(&document.root, "body") {
        let children = match &*body.borrow() {
            Node::Element(elem) => elem.children.clone(),
            _ => Vec::new(),
        };
        for child in &children {
            if let Some(id) = build_node(child, ids, &mut built) {
                built.roots.push(id);
            }
        }
    }
    // <style> blocks can legally sit in <head>.
    if let Some(head) = find_element(&document.root, "head") {
        if let Node::Element(elem) = &*head.borrow() {
            for child in &elem.children {
                collect_head_assets(child, &mut built);
            }
        }
    }
    built
}

fn find_element(node: &Rc<RefCell<Node>>, tag: &str) -> Option<Rc<RefCell<Node>>> {
    match &*node.borrow() {
        Node::DocumentRoot(root) => root.children.iter().find_map(|c| find_element(c, tag)),
        Node::Element(elem) => {
            if elem.tag == tag {
                Some(Rc::clone(node))
            } else {
                elem.children.iter().find_map(|c| find_element(c, tag))
            }
        }
        Node::Text(_) => None,
    }
}

fn collect_head_assets(node: &Rc<RefCell<Node>>, built: &mut BuiltGraph) {
    if let Node::Element(elem) = &*node.borrow() {
        match elem.tag.as_str() {
            "style" => {
                if let Some(text) = element_text(elem) {
                    built.inline_css.push(text);
                }
            }
            "script" => {
                if let Some(text) = element_text(elem) {
                    built.inline_js.push(text);
                }
            }
            _ => {}
        }
    }
}

/// Build one DOM node into the graph, returning its id. Text nodes
/// become synthetic text blocks; style/script elements are harvested
/// instead of emitted.
fn build_node(
    node: &Rc<RefCell<Node>>,
    ids: &mut IdGen,
    built: &mut BuiltGraph,
) -> Option<String> {
    let borrowed = node.borrow();
    match &*borrowed {
        Node::DocumentRoot(_) => None,
        Node::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            let id = ids.next_node();
            built.nodes.push(GraphNode {
                id: id.clone(),
                archetype: Archetype::Block,
                tag: "div".to_string(),
                tag_override: false,
                classes: Vec::new(),
                children: Vec::new(),
                payload: NodePayload::Text(trimmed.to_string()),
            });
            Some(id)
        }
        Node::Element(elem) => build_element(elem, ids, built),
    }
}

fn build_element(elem: &ElementNode, ids: &mut IdGen, built: &mut BuiltGraph) -> Option<String> {
    match elem.tag.as_str() {
        "style" => {
            if let Some(text) = element_text(elem) {
                built.inline_css.push(text);
            }
            return None;
        }
        "script" => {
            if let Some(text) = element_text(elem) {
                built.inline_js.push(text);
            }
            return None;
        }
        _ => {}
    }

    let (archetype, tag_override) = map_tag(&elem.tag);
    let id = ids.next_node();
    let node_index = built.nodes.len();
    built.nodes.push(GraphNode {
        id: id.clone(),
        archetype,
        tag: elem.tag.clone(),
        tag_override,
        classes: elem.class_list(),
        children: Vec::new(),
        payload: NodePayload::None,
    });

    let payload = match archetype {
        Archetype::Image => NodePayload::Image {
            src: elem.attr("src").unwrap_or_default().to_string(),
            alt: elem.attr("alt").map(|a| a.to_string()),
        },
        Archetype::Link => NodePayload::Link {
            url: elem.attr("href").unwrap_or_default().to_string(),
            text: None,
        },
        _ => NodePayload::None,
    };

    // Single-text-child collapse.
    if let Some(text) = sole_text_child(elem) {
        let collapsed = match payload {
            NodePayload::Link { url, .. } => NodePayload::Link {
                url,
                text: Some(text),
            },
            NodePayload::None => NodePayload::Text(text),
            other => other,
        };
        built.nodes[node_index].payload = collapsed;
        return Some(id);
    }

    built.nodes[node_index].payload = payload;

    let mut child_ids = Vec::new();
    for child in &elem.children {
        if let Some(child_id) = build_node(child, ids, built) {
            child_ids.push(child_id);
        }
    }
    built.nodes[node_index].children = child_ids;
    Some(id)
}

/// The element's text when its only meaningful child is one text node.
fn sole_text_child(elem: &ElementNode) -> Option<String> {
    let mut found: Option<String> = None;
    for child in &elem.children {
        match &*child.borrow() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if found.is_some() {
                    return None;
                }
                found = Some(trimmed.to_string());
            }
            Node::Element(_) => return None,
            Node::DocumentRoot(_) => {}
        }
    }
    found
}

/// Concatenated text content of an element's direct text children.
fn element_text(elem: &ElementNode) -> Option<String> {
    let mut out = String::new();
    for child in &elem.children {
        if let Node::Text(text) = &*child.borrow() {
            out.push_str(text);
        }
    }
    let trimmed = out.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::weave_html;
    use pretty_assertions::assert_eq;

    fn build(html: &str) -> BuiltGraph {
        let (document, _errors) = weave_html::create_dom_tree(html);
        let mut ids = IdGen::new();
        build_graph(&document, &mut ids)
    }

    #[test]
    fn hero_scenario_yields_two_nodes() {
        let built = build("<div class=\"hero\"><h1>Hi</h1></div>");
        assert_eq!(built.nodes.len(), 2);

        let div = &built.nodes[0];
        assert_eq!(div.archetype, Archetype::Block);
        assert_eq!(div.classes, vec!["hero".to_string()]);
        assert_eq!(div.children.len(), 1);

        let h1 = &built.nodes[1];
        assert_eq!(h1.archetype, Archetype::Heading);
        assert!(h1.tag_override);
        assert_eq!(h1.payload, NodePayload::Text("Hi".to_string()));
        assert_eq!(div.children[0], h1.id);
    }

    #[test]
    fn unknown_tag_becomes_block_with_override() {
        let built = build("<custom-card>x</custom-card>");
        assert_eq!(built.nodes.len(), 1);
        assert_eq!(built.nodes[0].archetype, Archetype::Block);
        assert!(built.nodes[0].tag_override);
        assert_eq!(built.nodes[0].tag, "custom-card");
    }

    #[test]
    fn link_collapses_text_and_keeps_target() {
        let built = build("<a href=\"/go\">Go</a>");
        assert_eq!(
            built.nodes[0].payload,
            NodePayload::Link {
                url: "/go".to_string(),
                text: Some("Go".to_string())
            }
        );
    }

    #[test]
    fn image_payload_carries_attributes() {
        let built = build("<img src=\"a.png\" alt=\"A\">");
        assert_eq!(
            built.nodes[0].payload,
            NodePayload::Image {
                src: "a.png".to_string(),
                alt: Some("A".to_string())
            }
        );
    }

    #[test]
    fn style_and_script_harvested_not_emitted() {
        let built = build(
            "<style>.x { color: red; }</style><div>hi</div><script>console.log(1)</script>",
        );
        assert_eq!(built.nodes.len(), 1);
        assert_eq!(built.inline_css, vec![".x { color: red; }".to_string()]);
        assert_eq!(built.inline_js, vec!["console.log(1)".to_string()]);
    }

    #[test]
    fn ids_unique_and_ordered() {
        let built = build("<div><p>a</p><p>b</p></div>");
        let mut ids: Vec<&str> = built.nodes.iter().map(|n| n.id.as_str()).collect();
        let before = ids.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before.len());
    }
}
