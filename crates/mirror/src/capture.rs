//! Turning live tree changes into [`MutationRecord`]s.
//!
//! A [`RawMutation`] refers to nodes by key in the source document; capture
//! replaces every key with a [`NodeSnapshot`] whose path is computed against
//! the source tree as it is at capture time. Callers decide when that is (see
//! [`crate::Recorder`]).

use std::collections::BTreeMap;

use html::{Document, Namespace, NodeKey, NodeType, compute_path};

use crate::config::CaptureConfig;
use crate::snapshot::{MutationKind, MutationRecord, NodeKind, NodeSnapshot, StyleSheetSnapshot};

/// A change as observed on the source document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMutation {
    pub kind: MutationKind,
    pub target: NodeKey,
    pub added_nodes: Vec<NodeKey>,
    pub removed_nodes: Vec<NodeKey>,
    pub previous_sibling: Option<NodeKey>,
    pub next_sibling: Option<NodeKey>,
    pub attribute_name: Option<String>,
    pub attribute_namespace: Option<String>,
}

impl RawMutation {
    pub fn new(kind: MutationKind, target: NodeKey) -> Self {
        Self {
            kind,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            attribute_namespace: None,
        }
    }
}

/// Where a node's associated style sheet comes from.
pub trait StyleSheetSource {
    fn style_sheet(&self, doc: &Document, key: NodeKey) -> Option<StyleSheetSnapshot>;
}

/// Never reports a sheet.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStyleSheets;

impl StyleSheetSource for NoStyleSheets {
    fn style_sheet(&self, _doc: &Document, _key: NodeKey) -> Option<StyleSheetSnapshot> {
        None
    }
}

/// Sheets of connected HTML `<style>` elements, one rule per top-level
/// block or `;`-terminated at-rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineStyleSheets;

impl StyleSheetSource for InlineStyleSheets {
    fn style_sheet(&self, doc: &Document, key: NodeKey) -> Option<StyleSheetSnapshot> {
        if doc.namespace(key) != Some(Namespace::Html)
            || !doc.is_element_named(key, "style")
            || !doc.is_attached(key)
        {
            return None;
        }
        let text = doc.text_content(key);
        Some(StyleSheetSnapshot::from_rule_texts(split_rules(&text)))
    }
}

/// Splits style sheet text into rule texts without interpreting them.
///
/// Braces inside strings and comments do not count; comments are dropped.
pub fn split_rules(input: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    let mut flush = |current: &mut String| {
        let rule = current.trim();
        if !rule.is_empty() {
            rules.push(rule.to_string());
        }
        current.clear();
    };

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '{' => {
                depth += 1;
                current.push(ch);
            }
            '}' => {
                // Stray closers outside any block are dropped.
                if depth == 0 {
                    continue;
                }
                depth -= 1;
                current.push(ch);
                if depth == 0 {
                    flush(&mut current);
                }
            }
            ';' if depth == 0 => {
                current.push(ch);
                flush(&mut current);
            }
            _ => current.push(ch),
        }
    }
    // Unterminated trailing block.
    flush(&mut current);
    rules
}

/// Records snapshots of source nodes according to a [`CaptureConfig`].
#[derive(Clone, Debug, Default)]
pub struct Capture<S = InlineStyleSheets> {
    config: CaptureConfig,
    sheets: S,
}

impl<S: StyleSheetSource> Capture<S> {
    pub fn new(config: CaptureConfig, sheets: S) -> Self {
        Self { config, sheets }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn sheet_source(&self) -> &dyn StyleSheetSource {
        if self.config.capture_style_sheets {
            &self.sheets
        } else {
            &NoStyleSheets
        }
    }

    pub fn snapshot_node(&self, doc: &Document, key: NodeKey, is_added: bool) -> NodeSnapshot {
        snapshot_node(doc, key, is_added, self.sheet_source())
    }

    pub fn serialize_mutation(&self, doc: &Document, raw: &RawMutation) -> MutationRecord {
        serialize_mutation(doc, raw, self.sheet_source())
    }
}

fn node_kind(doc: &Document, key: NodeKey) -> NodeKind {
    match doc.node_type(key) {
        Some(NodeType::Element) => NodeKind::Element,
        Some(NodeType::Text) => NodeKind::Text,
        Some(NodeType::Comment) => NodeKind::Comment,
        Some(NodeType::Document) => NodeKind::Document,
        Some(NodeType::DocumentType) => NodeKind::Doctype,
        None => NodeKind::Unknown,
    }
}

/// Snapshot of one node. `is_added` nodes also carry their child markup.
pub fn snapshot_node(
    doc: &Document,
    key: NodeKey,
    is_added: bool,
    sheets: &dyn StyleSheetSource,
) -> NodeSnapshot {
    let kind = node_kind(doc, key);
    let name = match kind {
        NodeKind::Element => doc.local_name(key).unwrap_or_default().to_string(),
        NodeKind::Text => "text()".to_string(),
        NodeKind::Comment => "comment()".to_string(),
        _ => doc.node_name(key).unwrap_or_default().into_owned(),
    };
    let attributes: BTreeMap<String, String> = doc
        .attributes(key)
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    NodeSnapshot {
        kind,
        tag_name: (kind == NodeKind::Element).then(|| name.clone()),
        name,
        value: doc.text(key).map(str::to_string),
        attributes: Some(attributes),
        path: compute_path(doc, key),
        inner_markup: (is_added && kind == NodeKind::Element).then(|| doc.inner_markup(key)),
        style_sheet: sheets.style_sheet(doc, key),
    }
}

pub fn serialize_mutation(
    doc: &Document,
    raw: &RawMutation,
    sheets: &dyn StyleSheetSource,
) -> MutationRecord {
    let snapshot = |key: NodeKey, is_added: bool| snapshot_node(doc, key, is_added, sheets);
    MutationRecord {
        kind: raw.kind,
        target: Some(snapshot(raw.target, false)),
        added_nodes: raw.added_nodes.iter().map(|k| snapshot(*k, true)).collect(),
        removed_nodes: raw.removed_nodes.iter().map(|k| snapshot(*k, false)).collect(),
        previous_sibling: raw.previous_sibling.map(|k| snapshot(k, false)),
        next_sibling: raw.next_sibling.map(|k| snapshot(k, false)),
        attribute_name: raw.attribute_name.clone(),
        attribute_namespace: raw.attribute_namespace.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::parse_document;

    fn body_child(doc: &Document, index: usize) -> NodeKey {
        doc.children(doc.body().unwrap())[index]
    }

    #[test]
    fn appended_span_is_serialized_with_markup_and_index() {
        let mut doc = parse_document("<div id=a><span>x</span></div>");
        let div = body_child(&doc, 0);
        let span = doc.create_element("span");
        let text = doc.create_text("y");
        doc.append_child(span, text).unwrap();
        doc.append_child(div, span).unwrap();

        let raw = RawMutation {
            added_nodes: vec![span],
            previous_sibling: doc.previous_sibling(span),
            ..RawMutation::new(MutationKind::ChildListChange, div)
        };
        let record = serialize_mutation(&doc, &raw, &InlineStyleSheets);

        let target = record.target.as_ref().unwrap();
        assert_eq!(target.path, "/html/body/div");
        assert_eq!(target.inner_markup, None);
        assert_eq!(target.attributes.as_ref().unwrap()["id"], "a");

        let added = &record.added_nodes[0];
        assert_eq!(added.kind, NodeKind::Element);
        assert!(added.path.ends_with("span[2]"));
        assert_eq!(added.tag_name.as_deref(), Some("span"));
        assert_eq!(added.inner_markup.as_deref(), Some("y"));
        assert_eq!(added.value, None);

        assert_eq!(
            record.previous_sibling.unwrap().path,
            "/html/body/div/span[1]"
        );
    }

    #[test]
    fn character_data_snapshots_carry_value() {
        let doc = parse_document("<p>hello<!--note--></p>");
        let p = body_child(&doc, 0);
        let text = doc.children(p)[0];
        let comment = doc.children(p)[1];

        let snapshot = snapshot_node(&doc, text, true, &NoStyleSheets);
        assert_eq!(snapshot.name, "text()");
        assert_eq!(snapshot.value.as_deref(), Some("hello"));
        assert_eq!(snapshot.tag_name, None);
        assert_eq!(snapshot.inner_markup, None);
        assert_eq!(snapshot.attributes, Some(BTreeMap::new()));

        let snapshot = snapshot_node(&doc, comment, false, &NoStyleSheets);
        assert_eq!(snapshot.kind, NodeKind::Comment);
        assert_eq!(snapshot.path, "/html/body/p/comment()");
    }

    #[test]
    fn connected_style_elements_expose_their_rules() {
        let mut doc = parse_document(
            "<style>a { color: red; } @import url(x.css); b{}</style><div></div>",
        );
        let style = doc.first_child(doc.head().unwrap()).unwrap();
        let sheet = InlineStyleSheets.style_sheet(&doc, style).unwrap();
        let rules: Vec<_> = sheet.css_rules.iter().map(|r| r.css_text.as_str()).collect();
        assert_eq!(rules, vec!["a { color: red; }", "@import url(x.css);", "b{}"]);

        let div = body_child(&doc, 0);
        assert_eq!(InlineStyleSheets.style_sheet(&doc, div), None);

        doc.detach(style).unwrap();
        assert_eq!(InlineStyleSheets.style_sheet(&doc, style), None);
    }

    #[test]
    fn capture_config_can_disable_sheets() {
        let doc = parse_document("<style>a{}</style>");
        let style = doc.first_child(doc.head().unwrap()).unwrap();
        let capture = Capture::new(
            CaptureConfig {
                capture_style_sheets: false,
            },
            InlineStyleSheets,
        );
        assert_eq!(capture.snapshot_node(&doc, style, false).style_sheet, None);
        let capture = Capture::<InlineStyleSheets>::default();
        assert!(capture.snapshot_node(&doc, style, false).style_sheet.is_some());
    }

    #[test]
    fn split_rules_respects_nesting_strings_and_comments() {
        let rules = split_rules(
            "/* lead */ @media (x) { a { b: c } d { e: f } }\n\
             p::after { content: \"}\"; } } ",
        );
        assert_eq!(
            rules,
            vec![
                "@media (x) { a { b: c } d { e: f } }",
                "p::after { content: \"}\"; }",
            ]
        );
        assert!(split_rules("  ").is_empty());
        assert_eq!(split_rules("a { b: c"), vec!["a { b: c"]);
    }
}
