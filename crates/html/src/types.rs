use std::collections::HashMap;
use std::sync::Arc;

/// Interned tag/attribute name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct AtomId(pub u32);

/// Per-stream name table. ASCII letters are folded to lowercase on intern.
#[derive(Debug, Default)]
pub(crate) struct AtomTable {
    atoms: Vec<Arc<str>>,
    map: HashMap<Arc<str>, AtomId>,
}

impl AtomTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn intern_ascii_lowercase(&mut self, name: &str) -> AtomId {
        let folded: Arc<str> = if name.bytes().any(|b| b.is_ascii_uppercase()) {
            Arc::from(name.to_ascii_lowercase())
        } else {
            Arc::from(name)
        };
        if let Some(id) = self.map.get(&folded) {
            return *id;
        }
        let id = AtomId(self.atoms.len() as u32);
        self.atoms.push(Arc::clone(&folded));
        self.map.insert(folded, id);
        id
    }

    /// Panics on an id from another table; ids never cross streams.
    pub(crate) fn resolve(&self, id: AtomId) -> &str {
        &self.atoms[id.0 as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Doctype(String),
    StartTag {
        name: AtomId,
        attributes: Vec<(AtomId, Option<String>)>,
        self_closing: bool,
    },
    EndTag(AtomId),
    Comment(String),
    Text(String),
}

#[derive(Debug)]
pub(crate) struct TokenStream {
    tokens: Vec<Token>,
    atoms: AtomTable,
}

impl TokenStream {
    pub(crate) fn new(tokens: Vec<Token>, atoms: AtomTable) -> Self {
        Self { tokens, atoms }
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub(crate) fn atoms(&self) -> &AtomTable {
        &self.atoms
    }
}
