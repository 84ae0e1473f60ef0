use html::{Document, DomError, Namespace, NodeKey, NodeType, parse_fragment_into};

use crate::capture::{Capture, InlineStyleSheets, RawMutation, StyleSheetSource};
use crate::snapshot::{MutationKind, MutationRecord};

/// Wraps a source document and records every change made through it on the
/// connected tree, in mutation order.
///
/// Removed nodes and sibling anchors are captured before the change, added
/// nodes and attribute/text targets after it, so each record replays against
/// a destination that matches the source as it was just before the change.
/// Changes to detached nodes are not recorded; they show up in the snapshot
/// of the node once it is inserted.
pub struct Recorder<S = InlineStyleSheets> {
    doc: Document,
    capture: Capture<S>,
    records: Vec<MutationRecord>,
}

impl Recorder {
    pub fn new(doc: Document) -> Self {
        Self::with_capture(doc, Capture::default())
    }
}

impl<S: StyleSheetSource> Recorder<S> {
    pub fn with_capture(doc: Document, capture: Capture<S>) -> Self {
        Self {
            doc,
            capture,
            records: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn into_parts(self) -> (Document, Vec<MutationRecord>) {
        (self.doc, self.records)
    }

    pub fn create_element(&mut self, name: &str) -> NodeKey {
        self.doc.create_element(name)
    }

    pub fn create_text(&mut self, text: &str) -> NodeKey {
        self.doc.create_text(text)
    }

    pub fn create_comment(&mut self, text: &str) -> NodeKey {
        self.doc.create_comment(text)
    }

    fn push(&mut self, record: MutationRecord) {
        log::trace!(
            target: "mirror.recorder",
            "record {:?} on {}",
            record.kind,
            record.target.as_ref().map_or("", |t| t.path.as_str())
        );
        self.records.push(record);
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        child: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), DomError> {
        self.doc.check_insert_before(parent, child, reference)?;
        let reference = match reference {
            Some(r) if r == child => self.doc.next_sibling(child),
            other => other,
        };

        if let Some(old_parent) = self.doc.parent(child) {
            if self.doc.is_attached(old_parent) {
                self.remove_child(old_parent, child)?;
            } else {
                self.doc.detach(child)?;
            }
        }

        if !self.doc.is_attached(parent) {
            return self.doc.insert_before(parent, child, reference);
        }

        let raw = RawMutation {
            previous_sibling: match reference {
                Some(r) => self.doc.previous_sibling(r),
                None => self.doc.last_child(parent),
            },
            next_sibling: reference,
            ..RawMutation::new(MutationKind::ChildListChange, parent)
        };
        let mut record = self.capture.serialize_mutation(&self.doc, &raw);
        self.doc.insert_before(parent, child, reference)?;
        record
            .added_nodes
            .push(self.capture.snapshot_node(&self.doc, child, true));
        self.push(record);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), DomError> {
        if self.doc.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        if !self.doc.is_attached(parent) {
            return self.doc.remove_child(parent, child);
        }
        let raw = RawMutation {
            removed_nodes: vec![child],
            previous_sibling: self.doc.previous_sibling(child),
            next_sibling: self.doc.next_sibling(child),
            ..RawMutation::new(MutationKind::ChildListChange, parent)
        };
        let record = self.capture.serialize_mutation(&self.doc, &raw);
        self.doc.remove_child(parent, child)?;
        self.push(record);
        Ok(())
    }

    pub fn set_attribute(&mut self, key: NodeKey, name: &str, value: &str) -> Result<(), DomError> {
        self.doc.set_attribute(key, name, value)?;
        self.record_attribute(key, name);
        Ok(())
    }

    /// Records nothing when the attribute was not present.
    pub fn remove_attribute(&mut self, key: NodeKey, name: &str) -> Result<bool, DomError> {
        let removed = self.doc.remove_attribute(key, name)?;
        if removed {
            self.record_attribute(key, name);
        }
        Ok(removed)
    }

    fn record_attribute(&mut self, key: NodeKey, name: &str) {
        if !self.doc.is_attached(key) {
            return;
        }
        // Same normalization the document applies to stored names.
        let name = match self.doc.namespace(key) {
            Some(Namespace::Html) => name.to_ascii_lowercase(),
            _ => name.to_string(),
        };
        let raw = RawMutation {
            attribute_name: Some(name),
            ..RawMutation::new(MutationKind::AttributeChange, key)
        };
        let record = self.capture.serialize_mutation(&self.doc, &raw);
        self.push(record);
    }

    /// Character data is changed in place. Element content is replaced by a
    /// single text node, recorded as removals followed by one addition.
    pub fn set_text(&mut self, key: NodeKey, value: &str) -> Result<(), DomError> {
        match self.doc.node_type(key) {
            Some(NodeType::Text | NodeType::Comment) => {
                self.doc.set_text_content(key, value)?;
                if self.doc.is_attached(key) {
                    let raw = RawMutation::new(MutationKind::TextChange, key);
                    let record = self.capture.serialize_mutation(&self.doc, &raw);
                    self.push(record);
                }
                Ok(())
            }
            Some(NodeType::Element) => {
                self.remove_children(key)?;
                if !value.is_empty() {
                    let text = self.doc.create_text(value);
                    self.append_child(key, text)?;
                }
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement(key)),
            None => Err(DomError::UnknownNode(key)),
        }
    }

    /// Replaces the children of `key` with parsed `markup`, one record per
    /// removed and added child.
    pub fn set_inner_markup(&mut self, key: NodeKey, markup: &str) -> Result<(), DomError> {
        if self.doc.node_type(key) != Some(NodeType::Element) {
            return Err(DomError::NotAnElement(key));
        }
        self.remove_children(key)?;
        let scratch = self.doc.create_element("template");
        parse_fragment_into(&mut self.doc, scratch, markup)?;
        for child in self.doc.children(scratch).to_vec() {
            self.append_child(key, child)?;
        }
        Ok(())
    }

    fn remove_children(&mut self, key: NodeKey) -> Result<(), DomError> {
        while let Some(child) = self.doc.first_child(key) {
            self.remove_child(key, child)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::parse_document;

    #[test]
    fn append_records_anchor_before_and_added_node_after() {
        let doc = parse_document("<div id=a><span>x</span></div>");
        let mut recorder = Recorder::new(doc);
        let div = recorder.document().first_child(recorder.document().body().unwrap()).unwrap();
        let span = recorder.create_element("span");
        let text = recorder.create_text("y");
        recorder.append_child(span, text).unwrap();
        assert!(recorder.records().is_empty());

        recorder.append_child(div, span).unwrap();
        let records = recorder.take_records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, MutationKind::ChildListChange);
        assert_eq!(record.target.as_ref().unwrap().path, "/html/body/div");
        assert_eq!(
            record.previous_sibling.as_ref().unwrap().path,
            "/html/body/div/span"
        );
        assert_eq!(record.next_sibling, None);
        assert_eq!(record.added_nodes[0].path, "/html/body/div/span[2]");
        assert_eq!(record.added_nodes[0].inner_markup.as_deref(), Some("y"));
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn moving_an_attached_node_records_removal_then_addition() {
        let doc = parse_document("<p>a</p><p>b</p>");
        let mut recorder = Recorder::new(doc);
        let body = recorder.document().body().unwrap();
        let first = recorder.document().children(body)[0];
        recorder.append_child(body, first).unwrap();

        let (doc, records) = recorder.into_parts();
        assert_eq!(doc.inner_markup(body), "<p>b</p><p>a</p>");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].removed_nodes[0].path, "/html/body/p[1]");
        assert_eq!(records[1].added_nodes[0].path, "/html/body/p[2]");
        assert_eq!(
            records[1].previous_sibling.as_ref().unwrap().path,
            "/html/body/p"
        );
    }

    #[test]
    fn attribute_records_use_stored_name_and_skip_absent_removals() {
        let doc = parse_document("<div></div>");
        let mut recorder = Recorder::new(doc);
        let div = recorder.document().first_child(recorder.document().body().unwrap()).unwrap();
        recorder.set_attribute(div, "Title", "t").unwrap();
        assert!(!recorder.remove_attribute(div, "missing").unwrap());
        assert!(recorder.remove_attribute(div, "title").unwrap());

        let records = recorder.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attribute_name.as_deref(), Some("title"));
        assert_eq!(
            records[0].target.as_ref().unwrap().attributes.as_ref().unwrap()["title"],
            "t"
        );
        assert!(records[1].target.as_ref().unwrap().attributes.as_ref().unwrap().is_empty());
    }

    #[test]
    fn set_text_on_character_data_and_elements() {
        let doc = parse_document("<p>old</p><div><i>a</i></div>");
        let mut recorder = Recorder::new(doc);
        let body = recorder.document().body().unwrap();
        let p = recorder.document().children(body)[0];
        let div = recorder.document().children(body)[1];
        let text = recorder.document().first_child(p).unwrap();

        recorder.set_text(text, "new").unwrap();
        recorder.set_text(div, "plain").unwrap();
        let records = recorder.take_records();
        let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MutationKind::TextChange,
                MutationKind::ChildListChange,
                MutationKind::ChildListChange,
            ]
        );
        assert_eq!(records[0].target.as_ref().unwrap().value.as_deref(), Some("new"));
        assert_eq!(records[1].removed_nodes[0].path, "/html/body/div/i");
        assert_eq!(records[2].added_nodes[0].path, "/html/body/div/text()");
    }

    #[test]
    fn detached_changes_are_not_recorded() {
        let doc = parse_document("");
        let mut recorder = Recorder::new(doc);
        let ul = recorder.create_element("ul");
        let li = recorder.create_element("li");
        recorder.append_child(ul, li).unwrap();
        recorder.set_attribute(li, "class", "x").unwrap();
        recorder.set_inner_markup(li, "<b>1</b>").unwrap();
        assert!(recorder.records().is_empty());
    }

    #[test]
    fn invalid_insertions_leave_no_records() {
        let doc = parse_document("<div><span></span></div><p></p>");
        let mut recorder = Recorder::new(doc);
        let body = recorder.document().body().unwrap();
        let div = recorder.document().children(body)[0];
        let p = recorder.document().children(body)[1];
        let span = recorder.document().first_child(div).unwrap();

        assert_eq!(
            recorder.insert_before(div, p, Some(p)),
            Err(DomError::NotAChild {
                parent: div,
                child: p
            })
        );
        assert!(matches!(
            recorder.append_child(span, div),
            Err(DomError::HierarchyCycle { .. })
        ));
        assert!(recorder.records().is_empty());
    }
}
