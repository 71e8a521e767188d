use html5ever::QualName;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub mod dom_tree {
    use super::*;

    #[derive(Debug, Clone)]
    pub enum Node {
        DocumentRoot(DocumentRootNode),
        Element(ElementNode),
        Text(String),
    }

    #[derive(Debug, Clone)]
    pub struct DocumentRootNode {
        pub children: Vec<Rc<RefCell<Node>>>,
    }

    #[derive(Debug, Clone)]
    pub struct ElementNode {
        pub tag: String,
        pub qual_name: QualName,
        pub attributes: HashMap<String, String>,
        pub children: Vec<Rc<RefCell<Node>>>,
    }

    #[derive(Debug)]
    pub struct Document {
        pub root: Rc<RefCell<Node>>,
        pub doctype: RefCell<Option<Doctype>>,
    }

    #[derive(Debug)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    impl DocumentRootNode {
        pub fn new() -> Self {
            DocumentRootNode {
                children: Vec::new(),
            }
        }
    }

    impl Default for DocumentRootNode {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ElementNode {
        pub fn new(tag: String, qual_name: QualName) -> Self {
            ElementNode {
                tag,
                qual_name,
                attributes: HashMap::new(),
                children: Vec::new(),
            }
        }

        /// Value of an attribute, if present.
        pub fn attr(&self, name: &str) -> Option<&str> {
            self.attributes.get(name).map(|v| v.as_str())
        }

        /// Class names from the `class` attribute, in source order.
        pub fn class_list(&self) -> Vec<String> {
            self.attr("class")
                .map(|v| v.split_whitespace().map(|c| c.to_string()).collect())
                .unwrap_or_default()
        }
    }

    pub fn new_document() -> Document {
        Document {
            root: Rc::new(RefCell::new(Node::DocumentRoot(DocumentRootNode::new()))),
            doctype: RefCell::new(None),
        }
    }
}
