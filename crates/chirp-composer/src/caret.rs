//! Caret placement over the document tree.
//!
//! Caret moves are an observable side effect of reconciliation. A caret
//! must always resolve to a concrete offset inside a text-bearing leaf; a
//! target that cannot be resolved is a contract violation surfaced as an
//! error, never ignored, since a silently misplaced caret corrupts the
//! editing session.

use crate::tree::{DocTree, NodeId, NodeKind};

/// A caret position: a character offset inside a text-bearing leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

/// Caret placement contract violations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CaretError {
    #[error("cannot place the caret in a node that bears no text")]
    NotTextBearing,
    #[error("cannot descend into an empty container")]
    EmptyContainer,
    #[error("cannot place the caret at a fixed offset inside a line container")]
    ContainerTarget,
    #[error("caret offset {offset} is past the end of the content ({len} chars)")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("node id is no longer in the tree")]
    Stale,
}

/// Place the caret at the end of `node`'s text.
///
/// A line container resolves to its last child; a token element holds the
/// caret in its own content.
pub fn place_at_end(tree: &mut DocTree, node: NodeId) -> Result<(), CaretError> {
    let target = descend(tree, node, Edge::Last)?;
    let len = text_len(tree, target)?;
    tree.set_caret(Some(Caret {
        node: target,
        offset: len,
    }));
    tracing::trace!(target: "chirp::caret", node = ?target, offset = len, "caret at end");
    Ok(())
}

/// Place the caret at a fixed character offset inside `node`.
///
/// Line containers are not a valid target here; the offset names a position
/// in one leaf's content and must not exceed it.
pub fn place_at(tree: &mut DocTree, node: NodeId, offset: usize) -> Result<(), CaretError> {
    if matches!(tree.get(node), Some(NodeKind::LineContainer { .. })) {
        return Err(CaretError::ContainerTarget);
    }
    let len = text_len(tree, node)?;
    if offset > len {
        return Err(CaretError::OffsetOutOfRange { offset, len });
    }
    tree.set_caret(Some(Caret { node, offset }));
    tracing::trace!(target: "chirp::caret", node = ?node, offset, "caret at offset");
    Ok(())
}

/// Place the caret at the beginning of `node`'s text.
///
/// A line container resolves to its first child.
pub fn place_at_start(tree: &mut DocTree, node: NodeId) -> Result<(), CaretError> {
    let target = descend(tree, node, Edge::First)?;
    text_len(tree, target)?;
    tree.set_caret(Some(Caret {
        node: target,
        offset: 0,
    }));
    tracing::trace!(target: "chirp::caret", node = ?target, "caret at start");
    Ok(())
}

enum Edge {
    First,
    Last,
}

fn descend(tree: &DocTree, node: NodeId, edge: Edge) -> Result<NodeId, CaretError> {
    match tree.get(node) {
        Some(NodeKind::LineContainer { children }) => match edge {
            Edge::First => children.first().copied().ok_or(CaretError::EmptyContainer),
            Edge::Last => children.last().copied().ok_or(CaretError::EmptyContainer),
        },
        Some(_) => Ok(node),
        None => Err(CaretError::Stale),
    }
}

fn text_len(tree: &DocTree, id: NodeId) -> Result<usize, CaretError> {
    match tree.get(id) {
        Some(NodeKind::TextRun { content }) | Some(NodeKind::TokenElement { content, .. }) => {
            Ok(content.chars().count())
        }
        Some(_) => Err(CaretError::NotTextBearing),
        None => Err(CaretError::Stale),
    }
}
