//! Markup serialization (`innerHTML` / `outerHTML`).
//!
//! Rules:
//! - Attributes are written in stored order, values double-quoted.
//! - Text escapes `&`, `<`, `>`; attribute values escape `&`, `"`.
//! - Children of `script`/`style` are written raw.
//! - Void HTML elements get no end tag; childless SVG elements self-close.

use crate::dom::{Document, Namespace, NodeData, NodeKey};
use crate::tokenizer::{is_rawtext_element, is_void_element};

pub(crate) fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

pub(crate) fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

impl Document {
    /// Markup of the node's children.
    pub fn inner_markup(&self, key: NodeKey) -> String {
        let raw = self.local_name(key).is_some_and(is_rawtext_element)
            && self.namespace(key) == Some(Namespace::Html);
        let mut out = String::new();
        let mut stack = Vec::new();
        push_children(self, key, raw, &mut stack);
        write_nodes(self, stack, &mut out);
        out
    }

    /// Markup of the node itself, including its subtree.
    pub fn outer_markup(&self, key: NodeKey) -> String {
        let mut out = String::new();
        write_nodes(self, vec![Step::Open(key, false)], &mut out);
        out
    }

    /// Markup of the whole document.
    pub fn to_markup(&self) -> String {
        self.outer_markup(self.root())
    }
}

enum Step {
    /// Write the node; `true` writes text children of rawtext elements as is.
    Open(NodeKey, bool),
    /// Write the end tag of an element whose children are done.
    Close(NodeKey),
}

fn push_children(doc: &Document, key: NodeKey, raw_text: bool, stack: &mut Vec<Step>) {
    stack.extend(
        doc.children(key)
            .iter()
            .rev()
            .map(|child| Step::Open(*child, raw_text)),
    );
}

fn write_nodes(doc: &Document, mut stack: Vec<Step>, out: &mut String) {
    while let Some(step) = stack.pop() {
        let (key, raw_text) = match step {
            Step::Open(key, raw_text) => (key, raw_text),
            Step::Close(key) => {
                if let Some(name) = doc.local_name(key) {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
                continue;
            }
        };
        let Some(data) = doc.node(key) else {
            continue;
        };
        match data {
            NodeData::Document => push_children(doc, key, false, &mut stack),
            NodeData::Doctype { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Text { text } => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            NodeData::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Element {
                name,
                namespace,
                attributes,
            } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attributes {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_attribute(v, out);
                    out.push('"');
                }
                match namespace {
                    Namespace::Html if is_void_element(name) => {
                        out.push('>');
                        continue;
                    }
                    Namespace::Svg if doc.children(key).is_empty() => {
                        out.push_str("/>");
                        continue;
                    }
                    _ => out.push('>'),
                }
                let raw = *namespace == Namespace::Html && is_rawtext_element(name);
                stack.push(Step::Close(key));
                push_children(doc, key, raw, &mut stack);
            }
        }
    }
}
