//! HTML structural parsing into the clipweave DOM tree.
//!
//! Uses html5ever as the HTML parser and builds the tree defined in
//! `crate::dom::dom_tree`. Parse errors are collected per run rather
//! than printed, so the orchestrator can surface them as warnings.

use crate::dom::dom_tree;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, NodeOrText, QuirksMode, TreeSink},
    LocalName, Namespace, QualName,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Parses HTML content into a DOM tree, returning the document plus any
/// parse errors html5ever reported along the way.
pub fn create_dom_tree(html_content: &str) -> (dom_tree::Document, Vec<String>) {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let tree_sink = ClipWeaveTreeSink::new(Rc::clone(&errors));
    let document =
        html5ever::parse_document(tree_sink, Default::default()).one(html_content.to_string());
    let errors = errors.take();
    (document, errors)
}

/// A custom TreeSink for building the DOM tree used by the converter.
///
/// Holds the Document being built, a stack of open nodes, the current
/// quirks mode, and the shared parse-error accumulator.
pub struct ClipWeaveTreeSink {
    document: dom_tree::Document,
    stack: RefCell<Vec<Rc<RefCell<dom_tree::Node>>>>,
    quirks_mode: RefCell<QuirksMode>,
    errors: Rc<RefCell<Vec<String>>>,
}

impl ClipWeaveTreeSink {
    pub fn new(errors: Rc<RefCell<Vec<String>>>) -> Self {
        let root_document = dom_tree::new_document();
        let root_clone = root_document.root.clone();
        Self {
            document: root_document,
            stack: RefCell::new(vec![root_clone]),
            quirks_mode: RefCell::new(QuirksMode::NoQuirks),
            errors,
        }
    }
}

/// A simple implementation of the `ElemName` trait for our elements.
#[derive(Debug)]
pub struct WeaveElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for WeaveElemName {
    fn local_name(&self) -> &LocalName {
        &self.local
    }

    fn ns(&self) -> &Namespace {
        &self.ns
    }
}

impl TreeSink for ClipWeaveTreeSink {
    type Handle = Rc<RefCell<dom_tree::Node>>;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = WeaveElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.document
    }

    /// Called when a parsing error occurs; recorded, never printed.
    fn parse_error(&self, msg: std::borrow::Cow<'static, str>) {
        self.errors.borrow_mut().push(msg.into_owned());
    }

    fn get_document(&self) -> Self::Handle {
        self.document.root.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        if let dom_tree::Node::Element(ref elem) = *target.borrow() {
            WeaveElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            }
        } else {
            panic!("elem_name called on non-element node")
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: html5ever::interface::ElementFlags,
    ) -> Self::Handle {
        let tag = name.local.to_string();
        let attributes = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect::<std::collections::HashMap<String, String>>();
        let element_node = dom_tree::ElementNode {
            tag,
            qual_name: name,
            attributes,
            children: Vec::new(),
        };
        Rc::new(RefCell::new(dom_tree::Node::Element(element_node)))
    }

    /// Comments carry no weight in the output graph; an empty text node
    /// is dropped later by the graph builder.
    fn create_comment(&self, _text: StrTendril) -> Self::Handle {
        Rc::new(RefCell::new(dom_tree::Node::Text(String::new())))
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        let combined = format!("{} {}", target, data);
        Rc::new(RefCell::new(dom_tree::Node::Text(combined)))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let child_node = match child {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => {
                Rc::new(RefCell::new(dom_tree::Node::Text(text.to_string())))
            }
        };
        match &mut *parent.borrow_mut() {
            dom_tree::Node::DocumentRoot(root) => {
                root.children.push(child_node.clone());
            }
            dom_tree::Node::Element(element) => {
                element.children.push(child_node.clone());
            }
            dom_tree::Node::Text(_) => {
                // Text nodes cannot have children.
            }
        }
        let is_element = matches!(*child_node.borrow(), dom_tree::Node::Element(_));
        if is_element {
            self.stack.borrow_mut().push(child_node);
        }
    }

    fn append_based_on_parent_node(
        &self,
        _element: &Self::Handle,
        _prev_element: &Self::Handle,
        _child: NodeOrText<Self::Handle>,
    ) {
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        *self.document.doctype.borrow_mut() = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn pop(&self, _node: &Self::Handle) {
        self.stack.borrow_mut().pop();
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target.clone()
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        *self.quirks_mode.borrow_mut() = mode;
    }

    fn append_before_sibling(&self, _sibling: &Self::Handle, _child: NodeOrText<Self::Handle>) {}

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        if let dom_tree::Node::Element(elem_node) = &mut *target.borrow_mut() {
            for attr in attrs {
                let key = attr.name.local.to_string();
                elem_node
                    .attributes
                    .entry(key)
                    .or_insert_with(|| attr.value.to_string());
            }
        }
    }

    fn remove_from_parent(&self, _target: &Self::Handle) {}

    fn reparent_children(&self, _node: &Self::Handle, _new_parent: &Self::Handle) {}
}
