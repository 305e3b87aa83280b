//! Arena-backed document tree.
//!
//! The live node graph of a contentEditable host becomes an arena of nodes
//! addressed by stable generational keys. Parent and sibling relationships
//! are derived from each container's child sequence on every query, so
//! splicing nodes mid-walk can never leave a dangling cached pointer.

use slotmap::{SlotMap, new_key_type};

use crate::caret::Caret;
use crate::classify::TokenClass;

new_key_type! {
    /// Stable handle to one node in a [`DocTree`].
    pub struct NodeId;
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// The kind of one document node, matched exhaustively by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Plain text, including the whitespace between tokens.
    TextRun { content: String },
    /// One classified token. Its content is edited as a unit; the class tag
    /// tracks the content on every mutation.
    TokenElement { content: String, class: TokenClass },
    /// One logical line. Children are ordered; each line is reconciled
    /// independently of its siblings.
    LineContainer { children: Vec<NodeId> },
    /// Placeholder for an otherwise-empty line. Exempt from empty-node
    /// cleanup.
    BreakMarker,
}

/// Structural contract violations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node id is no longer in the tree")]
    Stale,
    #[error("node has no parent container")]
    Detached,
    #[error("node does not carry editable text")]
    NotTextBearing,
    #[error("node is not a token element")]
    NotTokenElement,
    #[error("node is not a container")]
    NotContainer,
}

/// Document tree for one composer instance.
///
/// Owns every node and the caret. `&mut` access is the concurrency model:
/// one edit is reconciled to completion before the next can touch the tree.
#[derive(Debug)]
pub struct DocTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    caret: Option<Caret>,
}

impl DocTree {
    /// Create a tree holding one empty root container.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            kind: NodeKind::LineContainer {
                children: Vec::new(),
            },
        });
        Self {
            nodes,
            root,
            caret: None,
        }
    }

    /// The root container.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Node kind, if the id is still live.
    pub fn get(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    /// Whether the id still names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Text content of a text run or token element. `None` for containers
    /// and break markers.
    pub fn leaf_text(&self, id: NodeId) -> Option<&str> {
        match self.get(id)? {
            NodeKind::TextRun { content } | NodeKind::TokenElement { content, .. } => {
                Some(content)
            }
            _ => None,
        }
    }

    /// Concatenated text of the subtree, the `textContent` analogue.
    /// Break markers contribute nothing.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.get(id) {
            Some(NodeKind::TextRun { content }) | Some(NodeKind::TokenElement { content, .. }) => {
                out.push_str(content)
            }
            Some(NodeKind::LineContainer { children }) => {
                for &child in children {
                    self.collect_text(child, out);
                }
            }
            Some(NodeKind::BreakMarker) | None => {}
        }
    }

    /// Total text length of the subtree, in chars.
    pub fn char_len(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(NodeKind::TextRun { content }) | Some(NodeKind::TokenElement { content, .. }) => {
                content.chars().count()
            }
            Some(NodeKind::LineContainer { children }) => {
                children.iter().map(|&c| self.char_len(c)).sum()
            }
            Some(NodeKind::BreakMarker) | None => 0,
        }
    }

    /// Replace a leaf's text content.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(id).ok_or(TreeError::Stale)?;
        match &mut node.kind {
            NodeKind::TextRun { content } | NodeKind::TokenElement { content, .. } => {
                *content = text.into();
                Ok(())
            }
            _ => Err(TreeError::NotTextBearing),
        }
    }

    /// Class tag of a token element.
    pub fn token_class(&self, id: NodeId) -> Option<TokenClass> {
        match self.get(id)? {
            NodeKind::TokenElement { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Update a token element's class tag.
    pub fn set_token_class(&mut self, id: NodeId, class: TokenClass) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(id).ok_or(TreeError::Stale)?;
        match &mut node.kind {
            NodeKind::TokenElement { class: slot, .. } => {
                *slot = class;
                Ok(())
            }
            _ => Err(TreeError::NotTokenElement),
        }
    }

    /// Owning container of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of a container, in order. Empty for leaves.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(NodeKind::LineContainer { children }) => children,
            _ => &[],
        }
    }

    /// Sibling before `id`, derived from the parent's child sequence.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let idx = siblings.iter().position(|&c| c == id)?;
        idx.checked_sub(1).map(|i| siblings[i])
    }

    /// Sibling after `id`, derived from the parent's child sequence.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let idx = siblings.iter().position(|&c| c == id)?;
        siblings.get(idx + 1).copied()
    }

    /// Create a detached text run.
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            kind: NodeKind::TextRun {
                content: content.into(),
            },
        })
    }

    /// Create a detached token element. Starts plain; classification is the
    /// reconciler's job.
    pub fn create_token(&mut self, content: impl Into<String>) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            kind: NodeKind::TokenElement {
                content: content.into(),
                class: TokenClass::Plain,
            },
        })
    }

    /// Create a detached, empty line container.
    pub fn create_line(&mut self) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            kind: NodeKind::LineContainer {
                children: Vec::new(),
            },
        })
    }

    /// Create a detached break marker.
    pub fn create_break(&mut self) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            kind: NodeKind::BreakMarker,
        })
    }

    /// Append `child` to a container, detaching it from any current parent
    /// first.
    pub fn push_child(&mut self, container: NodeId, child: NodeId) -> Result<(), TreeError> {
        if self.parent(child).is_some() {
            self.detach(child)?;
        }
        let end = self.children(container).len();
        self.attach_at(container, child, end)
    }

    /// Insert `node` immediately after `reference` under the same parent.
    pub fn insert_after(&mut self, node: NodeId, reference: NodeId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(node) {
            return Err(TreeError::Stale);
        }
        if self.parent(node).is_some() {
            self.detach(node)?;
        }
        let parent = self.parent(reference).ok_or(TreeError::Detached)?;
        let idx = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or(TreeError::Detached)?;
        self.attach_at(parent, node, idx + 1)
    }

    fn attach_at(&mut self, container: NodeId, child: NodeId, at: usize) -> Result<(), TreeError> {
        match self.get(container) {
            Some(NodeKind::LineContainer { .. }) => {}
            Some(_) => return Err(TreeError::NotContainer),
            None => return Err(TreeError::Stale),
        }
        self.nodes.get_mut(child).ok_or(TreeError::Stale)?.parent = Some(container);
        let Some(node) = self.nodes.get_mut(container) else {
            return Err(TreeError::Stale);
        };
        let NodeKind::LineContainer { children } = &mut node.kind else {
            return Err(TreeError::NotContainer);
        };
        children.insert(at.min(children.len()), child);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = self.parent(id).ok_or(TreeError::Detached)?;
        let Some(node) = self.nodes.get_mut(parent) else {
            return Err(TreeError::Stale);
        };
        if let NodeKind::LineContainer { children } = &mut node.kind {
            children.retain(|&c| c != id);
        }
        self.nodes.get_mut(id).ok_or(TreeError::Stale)?.parent = None;
        Ok(())
    }

    /// Remove a node and any children from the tree entirely. A caret
    /// inside the removed subtree is cleared.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::Stale);
        }
        if self.parent(id).is_some() {
            self.detach(id)?;
        }
        if let Some(caret) = self.caret {
            if self.subtree_contains(id, caret.node) {
                tracing::trace!(
                    target: "chirp::tree",
                    node = ?id,
                    "removed subtree held the caret; clearing it"
                );
                self.caret = None;
            }
        }
        self.remove_subtree(id);
        Ok(())
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove_subtree(child);
        }
        self.nodes.remove(id);
    }

    fn subtree_contains(&self, root: NodeId, target: NodeId) -> bool {
        root == target
            || self
                .children(root)
                .iter()
                .any(|&c| self.subtree_contains(c, target))
    }

    /// Current caret, if one is set.
    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    /// Record the caret. `None` clears it.
    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.caret = caret;
    }

    /// Node the current selection is anchored in.
    pub fn caret_anchor_node(&self) -> Option<NodeId> {
        self.caret.map(|c| c.node)
    }
}

impl Default for DocTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_follow_child_order() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let a = tree.create_text("a");
        let b = tree.create_text("b");
        let c = tree.create_text("c");
        for id in [a, b, c] {
            tree.push_child(root, id).unwrap();
        }

        assert_eq!(tree.prev_sibling(a), None);
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.next_sibling(b), Some(c));
        assert_eq!(tree.next_sibling(c), None);
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn insert_after_splices_in_order() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let a = tree.create_text("a");
        let c = tree.create_text("c");
        tree.push_child(root, a).unwrap();
        tree.push_child(root, c).unwrap();

        let b = tree.create_text("b");
        tree.insert_after(b, a).unwrap();
        assert_eq!(tree.children(root), &[a, b, c]);
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn insert_after_detached_reference_is_an_error() {
        let mut tree = DocTree::new();
        let floating = tree.create_text("x");
        let other = tree.create_text("y");
        assert_eq!(tree.insert_after(other, floating), Err(TreeError::Detached));
    }

    #[test]
    fn text_of_concatenates_leaves_and_skips_breaks() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let line = tree.create_line();
        tree.push_child(root, line).unwrap();
        let hello = tree.create_token("hello");
        let gap = tree.create_text(" ");
        let world = tree.create_token("world");
        for id in [hello, gap, world] {
            tree.push_child(line, id).unwrap();
        }
        let empty_line = tree.create_line();
        tree.push_child(root, empty_line).unwrap();
        let br = tree.create_break();
        tree.push_child(empty_line, br).unwrap();

        assert_eq!(tree.text_of(root), "hello world");
        assert_eq!(tree.char_len(root), 11);
    }

    #[test]
    fn char_len_counts_chars_not_bytes() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let run = tree.create_text("héllo");
        tree.push_child(root, run).unwrap();
        assert_eq!(tree.char_len(root), 5);
    }

    #[test]
    fn set_text_rejects_containers() {
        let mut tree = DocTree::new();
        let root = tree.root();
        assert_eq!(tree.set_text(root, "x"), Err(TreeError::NotTextBearing));
    }

    #[test]
    fn remove_clears_caret_inside_subtree() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let line = tree.create_line();
        tree.push_child(root, line).unwrap();
        let run = tree.create_text("abc");
        tree.push_child(line, run).unwrap();
        tree.set_caret(Some(Caret {
            node: run,
            offset: 2,
        }));

        tree.remove(line).unwrap();
        assert_eq!(tree.caret(), None);
        assert!(!tree.contains(line));
        assert!(!tree.contains(run));
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn remove_keeps_unrelated_caret() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let keep = tree.create_text("keep");
        let drop = tree.create_text("drop");
        tree.push_child(root, keep).unwrap();
        tree.push_child(root, drop).unwrap();
        tree.set_caret(Some(Caret {
            node: keep,
            offset: 4,
        }));

        tree.remove(drop).unwrap();
        assert_eq!(tree.caret_anchor_node(), Some(keep));
    }

    #[test]
    fn token_class_roundtrip() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let el = tree.create_token("#rust");
        tree.push_child(root, el).unwrap();
        assert_eq!(tree.token_class(el), Some(TokenClass::Plain));

        tree.set_token_class(el, TokenClass::Hashtag).unwrap();
        assert_eq!(tree.token_class(el), Some(TokenClass::Hashtag));

        let run = tree.create_text("x");
        assert_eq!(
            tree.set_token_class(run, TokenClass::Url),
            Err(TreeError::NotTokenElement)
        );
    }
}
