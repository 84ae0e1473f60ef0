#![allow(dead_code)]

use html::{Document, NodeKey, parse_document};
use mirror::{MutationRecord, ReplayEngine};

/// Sends records through their JSON form, like a real transport would.
pub fn over_the_wire(records: &[MutationRecord]) -> Vec<MutationRecord> {
    let json = serde_json::to_string(records).expect("records serialize");
    serde_json::from_str(&json).expect("records deserialize")
}

/// Parses `base` and replays `records` onto it.
pub fn replay_onto(base: &str, records: &[MutationRecord]) -> (Document, ReplayEngine) {
    let mut doc = parse_document(base);
    let mut engine = ReplayEngine::default();
    engine
        .apply_all(&mut doc, &over_the_wire(records))
        .expect("records replay");
    (doc, engine)
}

pub fn body_child(doc: &Document, index: usize) -> NodeKey {
    doc.children(doc.body().expect("body"))[index]
}

pub fn body_markup(doc: &Document) -> String {
    doc.inner_markup(doc.body().expect("body"))
}
