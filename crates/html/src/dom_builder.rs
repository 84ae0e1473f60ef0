use crate::dom::{Document, DomError, Namespace, NodeKey, NodeType};
use crate::tokenizer::tokenize;
use crate::types::{Token, TokenStream};

/// Parses a whole document and guarantees the `html > head + body` skeleton,
/// so paths such as `/html/body/div` exist for any input.
pub fn parse_document(input: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    let stream = tokenize(input);
    build_into(&mut doc, root, &stream, true);
    ensure_skeleton(&mut doc);
    doc
}

/// Parses `markup` and appends the resulting nodes to `parent`.
pub fn parse_fragment_into(
    doc: &mut Document,
    parent: NodeKey,
    markup: &str,
) -> Result<(), DomError> {
    match doc.node_type(parent) {
        Some(NodeType::Element) | Some(NodeType::Document) => {}
        Some(_) => return Err(DomError::NotAContainer(parent)),
        None => return Err(DomError::UnknownNode(parent)),
    }
    let stream = tokenize(markup);
    build_into(doc, parent, &stream, false);
    Ok(())
}

impl Document {
    /// `Element.innerHTML` assignment: drops the current children and parses
    /// `markup` in their place.
    pub fn set_inner_markup(&mut self, key: NodeKey, markup: &str) -> Result<(), DomError> {
        if self.node_type(key) != Some(NodeType::Element) {
            return Err(if self.contains(key) {
                DomError::NotAnElement(key)
            } else {
                DomError::UnknownNode(key)
            });
        }
        self.remove_all_children(key)?;
        parse_fragment_into(self, key, markup)
    }
}

fn child_namespace(doc: &Document, parent: NodeKey, name: &str) -> Namespace {
    if name == "svg" {
        return Namespace::Svg;
    }
    match doc.namespace(parent) {
        Some(Namespace::Svg) if !doc.is_element_named(parent, "foreignobject") => Namespace::Svg,
        _ => Namespace::Html,
    }
}

fn build_into(doc: &mut Document, base: NodeKey, stream: &TokenStream, allow_doctype: bool) {
    let atoms = stream.atoms();
    let mut open_elements: Vec<NodeKey> = Vec::new();

    for token in stream.tokens() {
        let parent = open_elements.last().copied().unwrap_or(base);
        let created = match token {
            Token::Doctype(name) => {
                if !allow_doctype || !open_elements.is_empty() {
                    continue;
                }
                doc.create_doctype(name)
            }
            Token::Comment(text) => doc.create_comment(text),
            Token::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                doc.create_text(text)
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let name = atoms.resolve(*name);
                let namespace = child_namespace(doc, parent, name);
                let element = doc.create_element_ns(namespace, name);
                for (attr, value) in attributes {
                    let attr = atoms.resolve(*attr);
                    if doc.attribute(element, attr).is_some() {
                        // First occurrence wins, as in HTML parsing.
                        continue;
                    }
                    if let Err(err) =
                        doc.set_attribute(element, attr, value.as_deref().unwrap_or(""))
                    {
                        log::trace!(target: "html.builder", "attribute dropped: {err}");
                    }
                }
                if !*self_closing {
                    open_elements.push(element);
                }
                element
            }
            Token::EndTag(name) => {
                let target = atoms.resolve(*name);
                if let Some(pos) = open_elements
                    .iter()
                    .rposition(|open| doc.is_element_named(*open, target))
                {
                    open_elements.truncate(pos);
                }
                continue;
            }
        };
        if let Err(err) = doc.append_child(parent, created) {
            log::trace!(target: "html.builder", "node dropped: {err}");
        }
    }
}

fn is_metadata_element(doc: &Document, key: NodeKey) -> bool {
    ["title", "meta", "link", "style", "script", "base"]
        .iter()
        .any(|name| doc.is_element_named(key, name))
}

fn is_whitespace_text(doc: &Document, key: NodeKey) -> bool {
    doc.node_type(key) == Some(NodeType::Text)
        && doc.text(key).is_some_and(|t| t.trim().is_empty())
}

/// Moves stray content into `html > head + body`, creating missing pieces.
fn ensure_skeleton(doc: &mut Document) {
    if let Err(err) = try_ensure_skeleton(doc) {
        log::warn!(target: "html.builder", "could not normalize document skeleton: {err}");
    }
}

fn try_ensure_skeleton(doc: &mut Document) -> Result<(), DomError> {
    let root = doc.root();
    let html = match doc
        .children(root)
        .iter()
        .copied()
        .find(|c| doc.is_element_named(*c, "html"))
    {
        Some(html) => html,
        None => {
            let html = doc.create_element("html");
            doc.append_child(root, html)?;
            html
        }
    };

    // Root level keeps the doctype, the html element and comments that come
    // before any content.
    let stray: Vec<_> = doc
        .children(root)
        .iter()
        .copied()
        .filter(|c| *c != html && doc.node_type(*c) != Some(NodeType::DocumentType))
        .collect();

    let head = match doc
        .children(html)
        .iter()
        .copied()
        .find(|c| doc.is_element_named(*c, "head"))
    {
        Some(head) => head,
        None => {
            let head = doc.create_element("head");
            let first = doc.first_child(html);
            doc.insert_before(html, head, first)?;
            head
        }
    };
    let body = match doc
        .children(html)
        .iter()
        .copied()
        .find(|c| doc.is_element_named(*c, "body"))
    {
        Some(body) => body,
        None => {
            let body = doc.create_element("body");
            doc.append_child(html, body)?;
            body
        }
    };

    // (node, appeared before body)
    let body_index = doc.index_in_parent(body).unwrap_or(usize::MAX);
    let mut pending: Vec<(NodeKey, bool)> = stray.into_iter().map(|n| (n, true)).collect();
    pending.extend(
        doc.children(html)
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != head && **c != body)
            .map(|(i, c)| (*c, i < body_index)),
    );

    let mut before_body = Vec::new();
    let mut after_body = Vec::new();
    for (node, is_before) in pending {
        let nothing_placed = before_body.is_empty() && after_body.is_empty();
        let at_root = doc.parent(node) == Some(root);
        if at_root && nothing_placed && doc.node_type(node) == Some(NodeType::Comment) {
            continue;
        }
        if is_whitespace_text(doc, node) && nothing_placed {
            doc.detach(node)?;
        } else if is_before && before_body.is_empty() && is_metadata_element(doc, node) {
            doc.append_child(head, node)?;
        } else if is_before {
            before_body.push(node);
        } else {
            after_body.push(node);
        }
    }

    let first_body_child = doc.first_child(body);
    for node in before_body {
        doc.insert_before(body, node, first_body_child)?;
    }
    for node in after_body {
        doc.append_child(body, node)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(doc: &Document, parent: NodeKey) -> Vec<String> {
        doc.children(parent)
            .iter()
            .map(|c| doc.node_name(*c).unwrap_or_default().into_owned())
            .collect()
    }

    #[test]
    fn parse_document_keeps_explicit_skeleton() {
        let doc = parse_document(
            "<!DOCTYPE html><html><head><title>t</title></head><body><div id=a><span>x</span></div></body></html>",
        );
        assert_eq!(names(&doc, doc.root()), vec!["html", "HTML"]);
        let body = doc.body().unwrap();
        assert_eq!(names(&doc, body), vec!["DIV"]);
        let div = doc.first_child(body).unwrap();
        assert_eq!(doc.attribute(div, "id"), Some("a"));
        assert_eq!(doc.text_content(div), "x");
    }

    #[test]
    fn parse_document_synthesizes_missing_skeleton() {
        let doc = parse_document("<title>t</title><p>one</p>\n<p>two</p>");
        let html = doc.document_element().unwrap();
        assert_eq!(names(&doc, html), vec!["HEAD", "BODY"]);
        assert_eq!(names(&doc, doc.head().unwrap()), vec!["TITLE"]);
        assert_eq!(names(&doc, doc.body().unwrap()), vec!["P", "#text", "P"]);
    }

    #[test]
    fn root_comments_stay_at_root_only_before_content() {
        let doc = parse_document("<!--lead--><p>a</p><!--mid--><p>b</p>");
        assert_eq!(names(&doc, doc.root()), vec!["#comment", "HTML"]);
        assert_eq!(
            names(&doc, doc.body().unwrap()),
            vec!["P", "#comment", "P"]
        );
        let mid = doc.children(doc.body().unwrap())[1];
        assert_eq!(doc.text(mid), Some("mid"));
    }

    #[test]
    fn svg_subtrees_use_the_svg_namespace() {
        let doc = parse_document("<svg><rect width=1></rect><foreignobject><p>x</p></foreignobject></svg>");
        let svg = doc.first_child(doc.body().unwrap()).unwrap();
        assert_eq!(doc.namespace(svg), Some(Namespace::Svg));
        let rect = doc.first_child(svg).unwrap();
        assert_eq!(doc.namespace(rect), Some(Namespace::Svg));
        let foreign = doc.children(svg)[1];
        let p = doc.first_child(foreign).unwrap();
        assert_eq!(doc.namespace(p), Some(Namespace::Html));
    }

    #[test]
    fn unmatched_end_tags_do_not_close_open_elements() {
        let doc = parse_document("<div><span>a</b>b</span></div>");
        let div = doc.first_child(doc.body().unwrap()).unwrap();
        let span = doc.first_child(div).unwrap();
        assert_eq!(doc.text_content(span), "ab");
    }

    #[test]
    fn set_inner_markup_replaces_children() {
        let mut doc = parse_document("<div><i>old</i></div>");
        let div = doc.first_child(doc.body().unwrap()).unwrap();
        doc.set_inner_markup(div, "new <b>bold</b><!--c-->").unwrap();
        assert_eq!(names(&doc, div), vec!["#text", "B", "#comment"]);
        let text = doc.first_child(div).unwrap();
        assert_eq!(
            doc.set_inner_markup(text, "x"),
            Err(DomError::NotAnElement(text))
        );
    }
}
