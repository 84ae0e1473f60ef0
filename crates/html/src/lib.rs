//! Arena document with markup parsing, serialization and positional node
//! addressing.

pub mod path;

mod dom;
mod dom_builder;
mod entities;
mod serialize;
mod tokenizer;
mod types;

pub use crate::dom::{Document, DomError, Namespace, NodeData, NodeKey, NodeType};
pub use crate::dom_builder::{parse_document, parse_fragment_into};
pub use crate::path::{compute_path, resolve_path, trailing_index};
