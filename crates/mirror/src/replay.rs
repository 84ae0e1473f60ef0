//! Applying [`MutationRecord`]s to a destination document.
//!
//! Nodes are located by path only. Because the destination may have drifted
//! from the source, removal and insertion each try an ordered list of
//! strategies and use the first one that works. A record whose target cannot
//! be found is skipped; only malformed records are errors.

use html::{Document, Namespace, NodeKey, NodeType, resolve_path, trailing_index};

use crate::config::ReplayConfig;
use crate::error::{BatchError, ReplayError};
use crate::registry::StyleSheetRegistry;
use crate::snapshot::{MutationKind, MutationRecord, NodeKind, NodeSnapshot};

/// Tag names created in the SVG namespace when added.
pub const SVG_TAGS: &[&str] = &[
    "svg", "circle", "ellipse", "line", "path", "polygon", "polyline", "rect",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The target path matched nothing.
    Skipped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Destination-side anchors of a child-list record, resolved once per record.
#[derive(Clone, Copy, Debug, Default)]
struct Anchors {
    previous: Option<NodeKey>,
    next: Option<NodeKey>,
}

struct RemovalContext<'a> {
    target: NodeKey,
    target_path: &'a str,
    removed: &'a NodeSnapshot,
    anchors: Anchors,
    relative_prefix: &'a str,
}

type RemovalStrategy = fn(&Document, &RemovalContext<'_>) -> Option<NodeKey>;

const REMOVAL_STRATEGIES: [(&str, RemovalStrategy); 3] = [
    ("own path", remove_by_own_path),
    ("path relative to target", remove_by_relative_path),
    ("position next to anchor", remove_by_position),
];

fn remove_by_own_path(doc: &Document, ctx: &RemovalContext<'_>) -> Option<NodeKey> {
    resolve_path(doc, &ctx.removed.path)
}

fn remove_by_relative_path(doc: &Document, ctx: &RemovalContext<'_>) -> Option<NodeKey> {
    let path = &ctx.removed.path;
    if path.is_empty() || path.starts_with(ctx.relative_prefix) {
        return None;
    }
    resolve_path(doc, &format!("{}{}", ctx.target_path, path))
}

fn remove_by_position(doc: &Document, ctx: &RemovalContext<'_>) -> Option<NodeKey> {
    let candidate = match (ctx.anchors.previous, ctx.anchors.next) {
        (Some(previous), _) => doc.next_sibling(previous),
        (None, Some(next)) => doc.previous_sibling(next),
        (None, None) => doc.first_child(ctx.target),
    }?;
    // The anchor may sit under another parent in a drifted tree.
    (doc.parent(candidate) == Some(ctx.target)).then_some(candidate)
}

struct InsertionContext<'a> {
    target: NodeKey,
    added: &'a NodeSnapshot,
    anchors: Anchors,
}

/// `Some(reference)` inserts before `reference`, `None` appends.
type InsertionPoint = Option<NodeKey>;
type InsertionStrategy = fn(&Document, &InsertionContext<'_>) -> Option<InsertionPoint>;

const INSERTION_STRATEGIES: [(&str, InsertionStrategy); 4] = [
    ("after previous sibling", insert_after_previous),
    ("before next sibling", insert_before_next),
    ("path index", insert_at_path_index),
    ("append", append_at_end),
];

fn insert_after_previous(doc: &Document, ctx: &InsertionContext<'_>) -> Option<InsertionPoint> {
    let previous = ctx.anchors.previous?;
    (doc.parent(previous) == Some(ctx.target)).then(|| doc.next_sibling(previous))
}

fn insert_before_next(doc: &Document, ctx: &InsertionContext<'_>) -> Option<InsertionPoint> {
    let next = ctx.anchors.next?;
    (doc.parent(next) == Some(ctx.target)).then_some(Some(next))
}

/// Before the n-th existing child of the same kind, or appended when there
/// are fewer.
fn insert_at_path_index(doc: &Document, ctx: &InsertionContext<'_>) -> Option<InsertionPoint> {
    let index = trailing_index(&ctx.added.path)?;
    let same_kind = |child: &&NodeKey| match ctx.added.kind {
        NodeKind::Text => doc.node_type(**child) == Some(NodeType::Text),
        NodeKind::Comment => doc.node_type(**child) == Some(NodeType::Comment),
        _ => ctx
            .added
            .tag_name
            .as_deref()
            .is_some_and(|tag| doc.is_element_named(**child, tag)),
    };
    let reference = index
        .checked_sub(1)
        .and_then(|i| doc.children(ctx.target).iter().filter(same_kind).nth(i))
        .copied();
    Some(reference)
}

fn append_at_end(_doc: &Document, _ctx: &InsertionContext<'_>) -> Option<InsertionPoint> {
    Some(None)
}

fn element_namespace(tag: &str) -> Namespace {
    if SVG_TAGS.iter().any(|svg| svg.eq_ignore_ascii_case(tag)) {
        Namespace::Svg
    } else {
        Namespace::Html
    }
}

fn target_snapshot(record: &MutationRecord) -> Result<&NodeSnapshot, ReplayError> {
    let target = record.target.as_ref().ok_or(ReplayError::MissingTarget)?;
    if target.path.is_empty() {
        return Err(ReplayError::MissingTargetPath);
    }
    Ok(target)
}

fn resolve_anchor(doc: &Document, anchor: Option<&NodeSnapshot>) -> Option<NodeKey> {
    anchor.and_then(|a| resolve_path(doc, &a.path))
}

/// Replays records onto a destination document and tracks the style sheets
/// of the nodes it adds and removes.
#[derive(Clone, Debug, Default)]
pub struct ReplayEngine {
    config: ReplayConfig,
    registry: StyleSheetRegistry,
}

impl ReplayEngine {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            registry: StyleSheetRegistry::new(),
        }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn registry(&self) -> &StyleSheetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StyleSheetRegistry {
        &mut self.registry
    }

    /// Applies one record.
    ///
    /// Changes made before an error are kept; there is no rollback.
    pub fn apply(
        &mut self,
        doc: &mut Document,
        record: &MutationRecord,
    ) -> Result<Outcome, ReplayError> {
        match record.kind {
            MutationKind::ChildListChange => self.apply_child_list(doc, record),
            MutationKind::AttributeChange => apply_attribute(doc, record),
            MutationKind::TextChange => apply_text(doc, record),
            MutationKind::Unknown => Err(ReplayError::UnknownMutationKind),
        }
    }

    /// Applies records in order, stopping at the first error.
    pub fn apply_all(
        &mut self,
        doc: &mut Document,
        records: &[MutationRecord],
    ) -> Result<ReplayStats, BatchError> {
        let mut stats = ReplayStats::default();
        for (index, record) in records.iter().enumerate() {
            match self.apply(doc, record) {
                Ok(Outcome::Applied) => stats.applied += 1,
                Ok(Outcome::Skipped) => stats.skipped += 1,
                Err(source) => return Err(BatchError { index, source }),
            }
        }
        Ok(stats)
    }

    fn apply_child_list(
        &mut self,
        doc: &mut Document,
        record: &MutationRecord,
    ) -> Result<Outcome, ReplayError> {
        let target_snapshot = target_snapshot(record)?;
        let Some(target) = resolve_path(doc, &target_snapshot.path) else {
            log::debug!(
                target: "mirror.replay",
                "skip child list change: no node at {}",
                target_snapshot.path
            );
            return Ok(Outcome::Skipped);
        };

        let anchors = Anchors {
            previous: resolve_anchor(doc, record.previous_sibling.as_ref()),
            next: resolve_anchor(doc, record.next_sibling.as_ref()),
        };

        let relative_prefix = self.config.relative_removal_prefix.clone();
        for removed in &record.removed_nodes {
            let ctx = RemovalContext {
                target,
                target_path: &target_snapshot.path,
                removed,
                anchors,
                relative_prefix: &relative_prefix,
            };
            self.remove_node(doc, &ctx)?;
        }
        for added in &record.added_nodes {
            let ctx = InsertionContext {
                target,
                added,
                anchors,
            };
            self.add_node(doc, &ctx)?;
        }
        Ok(Outcome::Applied)
    }

    fn remove_node(
        &mut self,
        doc: &mut Document,
        ctx: &RemovalContext<'_>,
    ) -> Result<(), ReplayError> {
        if let Some(sheet) = &ctx.removed.style_sheet {
            self.registry.unregister(sheet);
        }
        for (strategy, locate) in REMOVAL_STRATEGIES {
            if let Some(node) = locate(doc, ctx) {
                log::trace!(
                    target: "mirror.replay",
                    "remove {} by {strategy}",
                    ctx.removed.path
                );
                doc.detach(node)?;
                return Ok(());
            }
        }
        log::debug!(
            target: "mirror.replay",
            "skip removal: {} not found under {}",
            ctx.removed.path,
            ctx.target_path
        );
        Ok(())
    }

    fn add_node(&mut self, doc: &mut Document, ctx: &InsertionContext<'_>) -> Result<(), ReplayError> {
        let added = ctx.added;
        let existing = if self.config.reconcile_duplicates {
            resolve_path(doc, &added.path)
        } else {
            None
        };

        let node = build_node(doc, added)?;
        if let Some(sheet) = &added.style_sheet {
            self.registry.register(sheet.clone());
        }

        for (strategy, place) in INSERTION_STRATEGIES {
            if let Some(reference) = place(doc, ctx) {
                log::trace!(target: "mirror.replay", "insert {} by {strategy}", added.path);
                doc.insert_before(ctx.target, node, reference)?;
                break;
            }
        }

        if let Some(existing) = existing {
            let replaces = doc.is_equal_node(existing, node)
                || (self.config.body_replaces_existing && added.is_element_named("body"));
            if replaces && existing != node {
                log::debug!(
                    target: "mirror.replay",
                    "drop node previously at {}",
                    added.path
                );
                doc.detach(existing)?;
            }
        }
        Ok(())
    }
}

fn build_node(doc: &mut Document, added: &NodeSnapshot) -> Result<NodeKey, ReplayError> {
    match added.kind {
        NodeKind::Element => {
            let tag = added
                .tag_name
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ReplayError::MissingTagName {
                    path: added.path.clone(),
                })?;
            let node = doc.create_element_ns(element_namespace(tag), tag);
            for (name, value) in added.attributes.iter().flatten() {
                doc.set_attribute(node, name, value)?;
            }
            doc.set_inner_markup(node, added.inner_markup.as_deref().unwrap_or_default())?;
            Ok(node)
        }
        NodeKind::Text => Ok(doc.create_text(added.value.as_deref().unwrap_or_default())),
        NodeKind::Comment => Ok(doc.create_comment(added.value.as_deref().unwrap_or_default())),
        kind => Err(ReplayError::UnsupportedNodeKind {
            path: added.path.clone(),
            kind,
        }),
    }
}

fn apply_attribute(doc: &mut Document, record: &MutationRecord) -> Result<Outcome, ReplayError> {
    let target = target_snapshot(record)?;
    let attributes = target
        .attributes
        .as_ref()
        .ok_or_else(|| ReplayError::MissingAttributes {
            path: target.path.clone(),
        })?;
    let name = record
        .attribute_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ReplayError::MissingAttributeName {
            path: target.path.clone(),
        })?;

    let Some(node) = resolve_path(doc, &target.path) else {
        log::debug!(
            target: "mirror.replay",
            "skip attribute change: no node at {}",
            target.path
        );
        return Ok(Outcome::Skipped);
    };

    match attributes.get(name) {
        Some(value) => doc.set_attribute(node, name, value)?,
        None => {
            doc.remove_attribute(node, name)?;
        }
    }
    Ok(Outcome::Applied)
}

fn apply_text(doc: &mut Document, record: &MutationRecord) -> Result<Outcome, ReplayError> {
    let target = target_snapshot(record)?;
    let Some(node) = resolve_path(doc, &target.path) else {
        log::debug!(
            target: "mirror.replay",
            "skip text change: no node at {}",
            target.path
        );
        return Ok(Outcome::Skipped);
    };
    doc.set_text_content(node, target.value.as_deref().unwrap_or_default())?;
    Ok(Outcome::Applied)
}
