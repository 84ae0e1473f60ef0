//! Transport-safe mutation records.
//!
//! Nodes are referenced only by their path plus an inline copy of what the
//! replay side needs to rebuild or locate them. Field names are the JSON wire
//! contract (camelCase).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Document,
    Doctype,
    /// Any kind this version does not know; never constructible on replay.
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
    pub css_text: String,
}

/// Opaque rule texts of one style sheet, in sheet order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSheetSnapshot {
    pub css_rules: Vec<StyleRule>,
}

impl StyleSheetSnapshot {
    pub fn from_rule_texts<I, T>(rules: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            css_rules: rules
                .into_iter()
                .map(|r| StyleRule { css_text: r.into() })
                .collect(),
        }
    }
}

/// One node as it looked when the mutation was captured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub kind: NodeKind,
    /// Tag name for elements, `text()` / `comment()` otherwise.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// Character data of text and comment nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub path: String,
    /// Full child markup; only on added nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_markup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_sheet: Option<StyleSheetSnapshot>,
}

impl NodeSnapshot {
    fn bare(kind: NodeKind, name: &str, path: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            tag_name: None,
            value: None,
            attributes: Some(BTreeMap::new()),
            path: path.to_string(),
            inner_markup: None,
            style_sheet: None,
        }
    }

    pub fn element(tag: &str, path: &str) -> Self {
        Self {
            tag_name: Some(tag.to_string()),
            ..Self::bare(NodeKind::Element, tag, path)
        }
    }

    pub fn text(value: &str, path: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::bare(NodeKind::Text, "text()", path)
        }
    }

    pub fn comment(value: &str, path: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::bare(NodeKind::Comment, "comment()", path)
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_inner_markup(mut self, markup: &str) -> Self {
        self.inner_markup = Some(markup.to_string());
        self
    }

    pub fn with_style_sheet(mut self, sheet: StyleSheetSnapshot) -> Self {
        self.style_sheet = Some(sheet);
        self
    }

    pub fn is_element_named(&self, name: &str) -> bool {
        self.kind == NodeKind::Element
            && self
                .tag_name
                .as_deref()
                .is_some_and(|tag| tag.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    ChildListChange,
    AttributeChange,
    TextChange,
    #[serde(other)]
    Unknown,
}

/// One captured structural, attribute or text change.
///
/// `added_nodes` and `removed_nodes` are in replay order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    pub kind: MutationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeSnapshot>,
    #[serde(default)]
    pub added_nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub removed_nodes: Vec<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_sibling: Option<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sibling: Option<NodeSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_namespace: Option<String>,
}

impl MutationRecord {
    pub fn new(kind: MutationKind, target: NodeSnapshot) -> Self {
        Self {
            kind,
            target: Some(target),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            attribute_namespace: None,
        }
    }

    pub fn child_list(target: NodeSnapshot) -> Self {
        Self::new(MutationKind::ChildListChange, target)
    }

    pub fn attribute(target: NodeSnapshot, name: &str) -> Self {
        Self {
            attribute_name: Some(name.to_string()),
            ..Self::new(MutationKind::AttributeChange, target)
        }
    }

    pub fn text(target: NodeSnapshot) -> Self {
        Self::new(MutationKind::TextChange, target)
    }

    pub fn with_previous(mut self, sibling: NodeSnapshot) -> Self {
        self.previous_sibling = Some(sibling);
        self
    }

    pub fn with_next(mut self, sibling: NodeSnapshot) -> Self {
        self.next_sibling = Some(sibling);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        let record = MutationRecord {
            added_nodes: vec![
                NodeSnapshot::element("span", "/html/body/div/span[2]").with_inner_markup("y"),
            ],
            previous_sibling: Some(NodeSnapshot::element("span", "/html/body/div/span[1]")),
            ..MutationRecord::child_list(
                NodeSnapshot::element("div", "/html/body/div").with_attribute("id", "a"),
            )
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "childListChange");
        assert_eq!(json["target"]["tagName"], "div");
        assert_eq!(json["target"]["attributes"]["id"], "a");
        assert_eq!(json["addedNodes"][0]["innerMarkup"], "y");
        assert_eq!(json["previousSibling"]["path"], "/html/body/div/span[1]");
        assert!(json["addedNodes"][0].get("value").is_none());
        assert!(json.get("nextSibling").is_none());
    }

    #[test]
    fn style_sheet_uses_css_rules_shape() {
        let node = NodeSnapshot::element("style", "/html/head/style")
            .with_style_sheet(StyleSheetSnapshot::from_rule_texts(["a { color: red; }"]));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json["styleSheet"],
            serde_json::json!({ "cssRules": [{ "cssText": "a { color: red; }" }] })
        );
    }

    #[test]
    fn unknown_kinds_decode_instead_of_failing() {
        let record: MutationRecord = serde_json::from_str(
            r#"{ "kind": "subtreeModified", "target": { "kind": "cdata", "path": "/x" } }"#,
        )
        .unwrap();
        assert_eq!(record.kind, MutationKind::Unknown);
        let target = record.target.unwrap();
        assert_eq!(target.kind, NodeKind::Unknown);
        assert_eq!(target.attributes, None);
        assert!(record.added_nodes.is_empty());
    }
}
