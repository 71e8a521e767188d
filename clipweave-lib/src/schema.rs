//! Clipboard document model and structural validation.
//!
//! Field names are the compatibility contract with the destination
//! tool and must serialize exactly as written here. The validator
//! checks the assembled payload against the structural invariants and
//! reports violations; it never repairs anything.

use crate::graph::{Archetype, GraphNode, NodePayload};
use crate::style::router::StyleClass;
use crate::style::rules::VariantKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Marker string identifying the clipboard flavor.
pub const FORMAT_MARKER: &str = "@webflow/XscpData";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub payload: ClipPayload,
    pub meta: ClipMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipPayload {
    pub nodes: Vec<ClipNode>,
    pub styles: Vec<ClipStyle>,
    pub assets: Vec<serde_json::Value>,
    pub ix1: Vec<serde_json::Value>,
    pub ix2: ClipIx2,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipIx2 {
    pub interactions: Vec<serde_json::Value>,
    pub events: Vec<serde_json::Value>,
    #[serde(rename = "actionLists")]
    pub action_lists: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipNode {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub tag: String,
    pub classes: Vec<String>,
    pub children: Vec<String>,
    pub data: NodeData,
}

/// Archetype-dependent node payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "tagOverride", skip_serializing_if = "Option::is_none")]
    pub tag_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<ImageAttr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkData {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttr {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedData {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipStyle {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "styleLess")]
    pub style_less: String,
    #[serde(rename = "type")]
    pub style_type: String,
    /// Always empty for generated styles; present for format parity.
    pub namespace: String,
    pub comb: String,
    pub variants: BTreeMap<String, String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipMeta {
    #[serde(rename = "unlinkedSymbolCount")]
    pub unlinked_symbol_count: u32,
    #[serde(rename = "droppedLinks")]
    pub dropped_links: u32,
    #[serde(rename = "dynBindRemovedCount")]
    pub dyn_bind_removed_count: u32,
    #[serde(rename = "dynListBindRemovedCount")]
    pub dyn_list_bind_removed_count: u32,
    #[serde(rename = "paginationRemovedCount")]
    pub pagination_removed_count: u32,
}

impl ClipNode {
    pub fn from_graph(node: &GraphNode) -> Self {
        let mut data = NodeData::default();
        if node.tag_override {
            data.tag_override = Some(node.tag.clone());
        }
        match &node.payload {
            NodePayload::None => {}
            NodePayload::Text(text) => data.text = Some(text.clone()),
            NodePayload::Link { url, text } => {
                data.link = Some(LinkData { url: url.clone() });
                data.text = text.clone();
            }
            NodePayload::Image { src, alt } => {
                data.attr = Some(ImageAttr {
                    src: src.clone(),
                    alt: alt.clone(),
                });
            }
        }
        ClipNode {
            id: node.id.clone(),
            node_type: node.archetype.as_str().to_string(),
            tag: node.tag.clone(),
            classes: node.classes.clone(),
            children: node.children.clone(),
            data,
        }
    }

    /// Synthetic escape-hatch node carrying raw embed code.
    pub fn html_embed(id: String, code: String) -> Self {
        ClipNode {
            id,
            node_type: Archetype::HtmlEmbed.as_str().to_string(),
            tag: "div".to_string(),
            classes: Vec::new(),
            children: Vec::new(),
            data: NodeData {
                embed: Some(EmbedData { code }),
                ..NodeData::default()
            },
        }
    }
}

impl ClipStyle {
    pub fn from_class(id: String, class: &StyleClass) -> Self {
        ClipStyle {
            id,
            name: class.name.clone(),
            style_less: class.style_less.clone(),
            style_type: "class".to_string(),
            namespace: String::new(),
            comb: String::new(),
            variants: class.variants.clone(),
            children: Vec::new(),
        }
    }
}

/// Structural validation of an assembled document.
///
/// `omitted_classes` lists class names the run intentionally left
/// without a style object (duplicates dropped by the resolver, classes
/// that had no CSS at all). Any other dangling reference is a
/// violation.
pub fn validate(doc: &ClipDocument, omitted_classes: &HashSet<String>) -> Result<(), Vec<String>> {
    let mut violations = Vec::new();

    if doc.doc_type != FORMAT_MARKER {
        violations.push(format!(
            "document type must be {:?}, found {:?}",
            FORMAT_MARKER, doc.doc_type
        ));
    }

    let mut ids = HashSet::new();
    for node in &doc.payload.nodes {
        if !ids.insert(node.id.as_str()) {
            violations.push(format!("duplicate node id {:?}", node.id));
        }
    }
    for style in &doc.payload.styles {
        if !ids.insert(style.id.as_str()) {
            violations.push(format!("duplicate style id {:?}", style.id));
        }
    }

    let node_ids: HashSet<&str> = doc.payload.nodes.iter().map(|n| n.id.as_str()).collect();
    let style_names: HashSet<&str> = doc.payload.styles.iter().map(|s| s.name.as_str()).collect();

    for node in &doc.payload.nodes {
        for child in &node.children {
            if !node_ids.contains(child.as_str()) {
                violations.push(format!(
                    "node {:?} references missing child {:?}",
                    node.id, child
                ));
            }
        }
        for class in &node.classes {
            if !style_names.contains(class.as_str()) && !omitted_classes.contains(class) {
                violations.push(format!(
                    "node {:?} references unknown class {:?}",
                    node.id, class
                ));
            }
        }
    }

    for style in &doc.payload.styles {
        if style.style_type != "class" {
            violations.push(format!(
                "style {:?} has type {:?}, expected \"class\"",
                style.name, style.style_type
            ));
        }
        if !style.children.is_empty() {
            violations.push(format!("style {:?} must have no children", style.name));
        }
        for key in style.variants.keys() {
            if VariantKey::from_str(key).is_none() {
                violations.push(format!(
                    "style {:?} has unsupported variant key {:?}",
                    style.name, key
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> ClipDocument {
        ClipDocument {
            doc_type: FORMAT_MARKER.to_string(),
            payload: ClipPayload {
                nodes: Vec::new(),
                styles: Vec::new(),
                assets: Vec::new(),
                ix1: Vec::new(),
                ix2: ClipIx2::default(),
            },
            meta: ClipMeta::default(),
        }
    }

    fn node(id: &str, children: &[&str], classes: &[&str]) -> ClipNode {
        ClipNode {
            id: id.to_string(),
            node_type: "Block".to_string(),
            tag: "div".to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            children: children.iter().map(|c| c.to_string()).collect(),
            data: NodeData::default(),
        }
    }

    fn style(id: &str, name: &str) -> ClipStyle {
        ClipStyle {
            id: id.to_string(),
            name: name.to_string(),
            style_less: String::new(),
            style_type: "class".to_string(),
            namespace: String::new(),
            comb: String::new(),
            variants: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn valid_document_passes() {
        let mut doc = empty_doc();
        doc.payload.nodes.push(node("n1", &["n2"], &["hero"]));
        doc.payload.nodes.push(node("n2", &[], &[]));
        doc.payload.styles.push(style("s1", "hero"));
        assert!(validate(&doc, &HashSet::new()).is_ok());
    }

    #[test]
    fn dangling_child_reported() {
        let mut doc = empty_doc();
        doc.payload.nodes.push(node("n1", &["gone"], &[]));
        let violations = validate(&doc, &HashSet::new()).unwrap_err();
        assert!(violations[0].contains("missing child"));
    }

    #[test]
    fn unknown_class_reported_unless_omitted() {
        let mut doc = empty_doc();
        doc.payload.nodes.push(node("n1", &[], &["hero"]));
        assert!(validate(&doc, &HashSet::new()).is_err());

        let omitted: HashSet<String> = ["hero".to_string()].into();
        assert!(validate(&doc, &omitted).is_ok());
    }

    #[test]
    fn bad_variant_key_reported() {
        let mut doc = empty_doc();
        let mut s = style("s1", "hero");
        s.variants.insert("focus".to_string(), "color:red".to_string());
        doc.payload.styles.push(s);
        let violations = validate(&doc, &HashSet::new()).unwrap_err();
        assert!(violations[0].contains("variant key"));
    }

    #[test]
    fn duplicate_ids_reported() {
        let mut doc = empty_doc();
        doc.payload.nodes.push(node("n1", &[], &[]));
        doc.payload.nodes.push(node("n1", &[], &[]));
        assert!(validate(&doc, &HashSet::new()).is_err());
    }

    #[test]
    fn serialized_field_names_match_contract() {
        let mut doc = empty_doc();
        doc.payload.nodes.push(node("n1", &[], &[]));
        doc.payload.styles.push(style("s1", "hero"));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], FORMAT_MARKER);
        assert!(json["payload"]["nodes"][0].get("_id").is_some());
        assert!(json["payload"]["styles"][0].get("styleLess").is_some());
        assert!(json["payload"]["ix2"].get("actionLists").is_some());
        assert!(json["meta"].get("unlinkedSymbolCount").is_some());
        assert!(json["meta"].get("dynListBindRemovedCount").is_some());
    }
}
