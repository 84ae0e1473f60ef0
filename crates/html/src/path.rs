//! Positional node addressing.
//!
//! A path names a node by the chain of child steps from the document node,
//! e.g. `/html/body/div[2]/text()`. The `[n]` suffix is only written when a
//! sibling with the same node name exists, so a path stays short but still
//! picks exactly one node in a tree with the same shape.
//!
//! Resolution is an XPath-style single-node query restricted to absolute
//! child steps. Anything it cannot parse resolves to `None`.

use crate::dom::{Document, Namespace, NodeKey, NodeType};

/// Computes the path of `key` within its tree.
///
/// Walks up while the node is an element, text or comment; a detached subtree
/// therefore yields a path rooted at its detached top node (`/span`).
/// Returns an empty string when `key` itself does not qualify.
pub fn compute_path(doc: &Document, key: NodeKey) -> String {
    let mut parts = Vec::new();
    let mut current = Some(key);
    while let Some(node) = current {
        let label = match doc.node_type(node) {
            Some(NodeType::Element) => doc.local_name(node).unwrap_or_default(),
            Some(NodeType::Text) => "text()",
            Some(NodeType::Comment) => "comment()",
            _ => break,
        };
        let Some(name) = doc.node_name(node) else {
            break;
        };

        let preceding = doc
            .preceding_siblings(node)
            .iter()
            .filter(|s| {
                doc.node_type(**s) != Some(NodeType::DocumentType)
                    && doc.node_name(**s).as_deref() == Some(name.as_ref())
            })
            .count();
        let has_following = doc
            .following_siblings(node)
            .iter()
            .any(|s| doc.node_name(*s).as_deref() == Some(name.as_ref()));

        if preceding > 0 || has_following {
            parts.push(format!("{label}[{}]", preceding + 1));
        } else {
            parts.push(label.to_string());
        }
        current = doc.parent(node);
    }

    if parts.is_empty() {
        return String::new();
    }
    parts.reverse();
    let mut path = String::with_capacity(parts.iter().map(|p| p.len() + 1).sum());
    for part in parts {
        path.push('/');
        path.push_str(&part);
    }
    path
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeTest {
    /// Element with this local name.
    Name(String),
    /// `*`: any element.
    AnyElement,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `node()`
    AnyNode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathStep {
    pub test: NodeTest,
    /// 1-based position among the matching children of one context node.
    pub position: Option<usize>,
}

/// Parses an absolute child-axis path. `None` on any syntax error.
pub fn parse_path(path: &str) -> Option<Vec<PathStep>> {
    let rest = path.strip_prefix('/')?;
    rest.split('/').map(parse_step).collect()
}

fn parse_step(step: &str) -> Option<PathStep> {
    let (test, predicate) = match step.find('[') {
        Some(open) => (&step[..open], Some(&step[open..])),
        None => (step, None),
    };

    let test = match test {
        "text()" => NodeTest::Text,
        "comment()" => NodeTest::Comment,
        "node()" => NodeTest::AnyNode,
        "*" => NodeTest::AnyElement,
        name if is_valid_name(name) => NodeTest::Name(name.to_string()),
        _ => return None,
    };

    let position = match predicate {
        None => None,
        Some(predicate) => {
            let digits = predicate.strip_prefix('[')?.strip_suffix(']')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(digits.parse::<usize>().ok()?)
        }
    };
    Some(PathStep { test, position })
}

// Looser than XML names: the tokenizer accepts tags such as `<1x>`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

/// The `[n]` suffix of the last step, if it has one.
pub fn trailing_index(path: &str) -> Option<usize> {
    let digits = path.strip_suffix(']')?;
    let open = digits.rfind('[')?;
    let digits = &digits[open + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn matches_test(doc: &Document, key: NodeKey, test: &NodeTest) -> bool {
    match test {
        NodeTest::AnyNode => true,
        NodeTest::Text => doc.node_type(key) == Some(NodeType::Text),
        NodeTest::Comment => doc.node_type(key) == Some(NodeType::Comment),
        NodeTest::AnyElement => doc.node_type(key) == Some(NodeType::Element),
        NodeTest::Name(name) => match (doc.local_name(key), doc.namespace(key)) {
            (Some(local), Some(Namespace::Html)) => local.eq_ignore_ascii_case(name),
            (Some(local), Some(_)) => local == name,
            _ => false,
        },
    }
}

/// Returns the first node in document order matched by `path`, or `None`
/// when the path is malformed or matches nothing.
pub fn resolve_path(doc: &Document, path: &str) -> Option<NodeKey> {
    let Some(steps) = parse_path(path) else {
        log::trace!(target: "html.path", "malformed path {path:?}");
        return None;
    };

    let mut context = vec![doc.root()];
    for step in &steps {
        let mut next = Vec::new();
        for node in &context {
            let mut matching = doc
                .children(*node)
                .iter()
                .copied()
                .filter(|c| matches_test(doc, *c, &step.test));
            match step.position {
                Some(n) => next.extend(n.checked_sub(1).and_then(|i| matching.nth(i))),
                None => next.extend(matching),
            }
        }
        if next.is_empty() {
            return None;
        }
        // Contexts are in document order and have disjoint children, so
        // `next` is in document order as well.
        context = next;
    }
    context.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_document;

    fn body_child(doc: &Document, index: usize) -> NodeKey {
        doc.children(doc.body().unwrap())[index]
    }

    #[test]
    fn sole_node_of_its_name_has_no_index() {
        let doc = parse_document("<div id=a><span>x</span></div>");
        let div = body_child(&doc, 0);
        assert_eq!(compute_path(&doc, div), "/html/body/div");
        let span = doc.first_child(div).unwrap();
        assert_eq!(compute_path(&doc, span), "/html/body/div/span");
        let text = doc.first_child(span).unwrap();
        assert_eq!(compute_path(&doc, text), "/html/body/div/span/text()");
    }

    #[test]
    fn same_named_siblings_get_indexes() {
        let doc = parse_document("<p>a</p><div></div><p>b</p><!--c--><p>c</p>");
        let paths: Vec<_> = doc
            .children(doc.body().unwrap())
            .iter()
            .map(|c| compute_path(&doc, *c))
            .collect();
        assert_eq!(
            paths,
            vec![
                "/html/body/p[1]",
                "/html/body/div",
                "/html/body/p[2]",
                "/html/body/comment()",
                "/html/body/p[3]",
            ]
        );
    }

    #[test]
    fn first_of_several_is_indexed_because_of_following_sibling() {
        let doc = parse_document("<ul><li>a</li><li>b</li></ul>");
        let ul = body_child(&doc, 0);
        let first = doc.first_child(ul).unwrap();
        assert_eq!(compute_path(&doc, first), "/html/body/ul/li[1]");
    }

    #[test]
    fn doctype_is_never_counted() {
        let mut doc = Document::new();
        let root = doc.root();
        let doctype = doc.create_doctype("HTML");
        let html = doc.create_element("html");
        doc.append_child(root, doctype).unwrap();
        doc.append_child(root, html).unwrap();
        assert_eq!(compute_path(&doc, html), "/html");
        assert_eq!(compute_path(&doc, root), "");
    }

    #[test]
    fn detached_subtree_paths_start_at_the_detached_root() {
        let mut doc = parse_document("<div><span>x</span></div>");
        let div = body_child(&doc, 0);
        let span = doc.first_child(div).unwrap();
        doc.detach(span).unwrap();
        assert_eq!(compute_path(&doc, span), "/span");
    }

    #[test]
    fn every_node_round_trips() {
        let doc = parse_document(
            "<!DOCTYPE html><html><head><title>t</title></head><body>\
             <div>a<b>1</b>b<b>2</b><!--x--><i>c</i>d</div><div><svg><rect></rect><rect></rect></svg></div>\
             </body></html>",
        );
        for node in doc.descendants(doc.root()) {
            if !matches!(
                doc.node_type(node),
                Some(NodeType::Element | NodeType::Text | NodeType::Comment)
            ) {
                continue;
            }
            let path = compute_path(&doc, node);
            assert_eq!(resolve_path(&doc, &path), Some(node), "path {path}");
        }
    }

    #[test]
    fn unindexed_step_picks_first_in_document_order() {
        let doc = parse_document("<div><span>a</span></div><div><span>b</span></div>");
        let found = resolve_path(&doc, "/html/body/div/span").unwrap();
        assert_eq!(doc.text_content(found), "a");
        let found = resolve_path(&doc, "/html/body/div[2]/span").unwrap();
        assert_eq!(doc.text_content(found), "b");
    }

    #[test]
    fn malformed_or_missing_paths_resolve_to_none() {
        let doc = parse_document("<div></div>");
        for path in [
            "",
            "html/body",
            "/",
            "/html//body",
            "/html/body/div[",
            "/html/body/div[0]",
            "/html/body/div[x]",
            "/html/body/div[1",
            "/html/body/d!v",
            "/html/body/div[2]",
            "/html/body/section",
        ] {
            assert_eq!(resolve_path(&doc, path), None, "path {path:?}");
        }
    }

    #[test]
    fn name_tests_ignore_case_for_html_elements() {
        let doc = parse_document("<div></div>");
        assert_eq!(
            resolve_path(&doc, "/HTML/Body/DIV"),
            Some(body_child(&doc, 0))
        );
    }

    #[test]
    fn trailing_index_reads_the_last_step_only() {
        assert_eq!(trailing_index("/html/body/span[2]"), Some(2));
        assert_eq!(trailing_index("/html/body/li[12]"), Some(12));
        assert_eq!(trailing_index("/html/body[1]/span"), None);
        assert_eq!(trailing_index("/html/body/text()[3]"), Some(3));
        assert_eq!(trailing_index("/html/body/span[]"), None);
    }
}
