//! Tree reconciliation: the incremental tokenizer pass.
//!
//! One pass walks a changed subtree and restores the token structure:
//! every maximal non-blank run of characters ends up wrapped in exactly one
//! classified token element, the whitespace between tokens stays in plain
//! text runs, and the caret lands at the edit point. The pass is
//! idempotent in effect: re-running it over a stabilized line changes
//! nothing and leaves the caret alone.

use std::sync::OnceLock;

use regex::Regex;

use crate::caret::{self, CaretError};
use crate::classify::ClassifierRules;
use crate::tree::{DocTree, NodeId, NodeKind, TreeError};

/// Errors from one reconciliation pass.
///
/// Split and merge fallbacks are ordinary control flow; an error here means
/// the tree or caret contract was violated.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Caret(#[from] CaretError),
}

/// Nothing but whitespace.
fn blank_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*$").unwrap())
}

/// First token, one gap, optional trailing token.
fn two_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+)(\s+)(\S*)$").unwrap())
}

/// Leading blanks, one token, trailing blanks.
fn one_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)(\S+)(\s*)$").unwrap())
}

/// Leading blanks, first token, first gap, multi-token remainder.
fn leading_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^(\s*)(\S+)(\s+)(\S.*)$").unwrap())
}

fn has_blank_start(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_whitespace)
}

fn has_blank_end(s: &str) -> bool {
    s.chars().next_back().is_some_and(char::is_whitespace)
}

/// Walks a changed subtree and restores the token structure.
///
/// Borrows the classification table bound to the composer at creation; one
/// instance serves one pass.
pub struct Reconciler<'r> {
    rules: &'r ClassifierRules,
}

impl<'r> Reconciler<'r> {
    pub fn new(rules: &'r ClassifierRules) -> Self {
        Self { rules }
    }

    /// Run one pass over `container`'s children, recursing into nested
    /// lines.
    pub fn reconcile(&self, tree: &mut DocTree, container: NodeId) -> Result<(), ReconcileError> {
        // The walk mutates the live child list; iterate an owned snapshot
        // of the ids taken before the first mutation.
        let snapshot = tree.children(container).to_vec();
        tracing::trace!(
            target: "chirp::reconcile",
            container = ?container,
            children = snapshot.len(),
            "reconciling container"
        );
        enum Step {
            Recurse,
            Skip,
            Element,
            TextRun,
        }
        for id in snapshot {
            let step = match tree.get(id) {
                // Removed by an earlier step of this pass.
                None => continue,
                Some(NodeKind::LineContainer { .. }) => Step::Recurse,
                Some(NodeKind::BreakMarker) => Step::Skip,
                Some(NodeKind::TokenElement { .. }) => Step::Element,
                Some(NodeKind::TextRun { .. }) => Step::TextRun,
            };
            match step {
                // Each line is analyzed on its own; tokens never merge
                // across line boundaries.
                Step::Recurse => self.reconcile(tree, id)?,
                // The empty-line placeholder stays exactly as it is.
                Step::Skip => {}
                Step::Element => self.reconcile_element(tree, id)?,
                Step::TextRun => self.reconcile_text_run(tree, id)?,
            }
        }
        Ok(())
    }

    /// A token element whose content picked up a blank is split back into
    /// token + gap (+ token); otherwise its class tag is refreshed in
    /// place. An element left with no content is dropped.
    fn reconcile_element(&self, tree: &mut DocTree, el: NodeId) -> Result<(), ReconcileError> {
        let content = tree.leaf_text(el).unwrap_or_default().to_owned();
        if content.is_empty() {
            tracing::trace!(target: "chirp::reconcile", el = ?el, "dropping emptied element");
            tree.remove(el)?;
            return Ok(());
        }
        if let Some(caps) = two_token_re().captures(&content) {
            let (first, gap, second) = (&caps[1], &caps[2], &caps[3]);
            tracing::trace!(
                target: "chirp::reconcile",
                el = ?el,
                first,
                second,
                "splitting element at the typed blank"
            );
            tree.set_text(el, first)?;
            self.classify(tree, el)?;
            let gap_run = tree.create_text(gap);
            tree.insert_after(gap_run, el)?;
            if second.is_empty() {
                caret::place_at_end(tree, gap_run)?;
            } else {
                let trailing = tree.create_token(second);
                tree.insert_after(trailing, gap_run)?;
                self.classify(tree, trailing)?;
                caret::place_at_end(tree, trailing)?;
            }
        } else {
            self.classify(tree, el)?;
        }
        Ok(())
    }

    /// The text-run split rule. Blank runs stay untouched; anything else is
    /// partitioned into tokens and gaps, merging into adjacent token
    /// elements at the edges where the content allows it.
    fn reconcile_text_run(&self, tree: &mut DocTree, run: NodeId) -> Result<(), ReconcileError> {
        let content = tree.leaf_text(run).unwrap_or_default().to_owned();
        if blank_re().is_match(&content) {
            return Ok(());
        }
        if let Some(caps) = two_token_re().captures(&content) {
            return self.split_two_tokens(tree, run, &caps[1], &caps[2], &caps[3]);
        }
        if let Some(caps) = one_token_re().captures(&content) {
            return self.split_single_token(tree, run, &caps[1], &caps[2], &caps[3]);
        }
        if let Some(caps) = leading_token_re().captures(&content) {
            return self.split_leading_token(tree, run, &caps[1], &caps[2], &caps[3], &caps[4]);
        }
        tracing::warn!(
            target: "chirp::reconcile",
            content = %content.escape_debug(),
            "text run matched no split shape"
        );
        Ok(())
    }

    /// Run content is `first + gap + second` (second may be empty). The
    /// first token merges left when the preceding element allows it,
    /// otherwise it becomes a fresh element; the gap stays a plain run; a
    /// non-empty second token gets its own element carrying the caret.
    fn split_two_tokens(
        &self,
        tree: &mut DocTree,
        run: NodeId,
        first: &str,
        gap: &str,
        second: &str,
    ) -> Result<(), ReconcileError> {
        let gap_holder;
        if self.try_left_merge(tree, run, first)? {
            tree.set_text(run, gap)?;
            gap_holder = run;
        } else {
            let el = tree.create_token(first);
            tree.insert_after(el, run)?;
            self.classify(tree, el)?;
            let gap_run = tree.create_text(gap);
            tree.insert_after(gap_run, el)?;
            tree.remove(run)?;
            gap_holder = gap_run;
        }
        if second.is_empty() {
            caret::place_at_end(tree, gap_holder)?;
        } else {
            let trailing = tree.create_token(second);
            tree.insert_after(trailing, gap_holder)?;
            self.classify(tree, trailing)?;
            caret::place_at_end(tree, trailing)?;
        }
        Ok(())
    }

    /// Run content is `lead + core + trail` with no internal gap. Leading
    /// blanks shrink the run first; then the core token merges left, merges
    /// right, or wraps, in that order.
    fn split_single_token(
        &self,
        tree: &mut DocTree,
        run: NodeId,
        lead: &str,
        core: &str,
        trail: &str,
    ) -> Result<(), ReconcileError> {
        if lead.is_empty() {
            if self.try_left_merge(tree, run, core)? {
                if trail.is_empty() {
                    tree.remove(run)?;
                } else {
                    tree.set_text(run, trail)?;
                }
                return Ok(());
            }
        } else {
            tree.set_text(run, lead)?;
        }
        if trail.is_empty() && self.try_right_merge(tree, run, core)? {
            if lead.is_empty() {
                tree.remove(run)?;
            }
            return Ok(());
        }
        // No merge candidate: the token gets its own element.
        let el = tree.create_token(core);
        tree.insert_after(el, run)?;
        if !trail.is_empty() {
            let ws = tree.create_text(trail);
            tree.insert_after(ws, el)?;
        }
        if lead.is_empty() {
            tree.remove(run)?;
        }
        self.classify(tree, el)?;
        caret::place_at_end(tree, el)?;
        Ok(())
    }

    /// Run content holds more than one gap: peel the leading blank, first
    /// token and first gap, then continue on the remainder as its own run.
    fn split_leading_token(
        &self,
        tree: &mut DocTree,
        run: NodeId,
        lead: &str,
        first: &str,
        gap: &str,
        rest: &str,
    ) -> Result<(), ReconcileError> {
        if lead.is_empty() && self.try_left_merge(tree, run, first)? {
            tree.set_text(run, gap)?;
            let rest_run = tree.create_text(rest);
            tree.insert_after(rest_run, run)?;
            return self.reconcile_text_run(tree, rest_run);
        }
        if !lead.is_empty() {
            tree.set_text(run, lead)?;
        }
        let el = tree.create_token(first);
        tree.insert_after(el, run)?;
        self.classify(tree, el)?;
        let gap_run = tree.create_text(gap);
        tree.insert_after(gap_run, el)?;
        let rest_run = tree.create_text(rest);
        tree.insert_after(rest_run, gap_run)?;
        if lead.is_empty() {
            tree.remove(run)?;
        }
        self.reconcile_text_run(tree, rest_run)
    }

    /// Append `token` to the preceding token element if that element's
    /// content has no trailing blank. On success the element is
    /// re-classified and the caret sits at its end.
    fn try_left_merge(
        &self,
        tree: &mut DocTree,
        run: NodeId,
        token: &str,
    ) -> Result<bool, ReconcileError> {
        let Some(prev) = tree.prev_sibling(run) else {
            return Ok(false);
        };
        let Some(NodeKind::TokenElement { content, .. }) = tree.get(prev) else {
            return Ok(false);
        };
        if has_blank_end(content) {
            return Ok(false);
        }
        let merged = format!("{content}{token}");
        tracing::trace!(
            target: "chirp::reconcile",
            into = ?prev,
            token,
            merged = %merged.escape_debug(),
            "merging token into the preceding element"
        );
        tree.set_text(prev, merged)?;
        self.classify(tree, prev)?;
        caret::place_at_end(tree, prev)?;
        Ok(true)
    }

    /// Prepend `token` to the following token element if that element's
    /// content has no leading blank. On success the caret sits right after
    /// the inserted token inside the merged element.
    fn try_right_merge(
        &self,
        tree: &mut DocTree,
        run: NodeId,
        token: &str,
    ) -> Result<bool, ReconcileError> {
        let Some(next) = tree.next_sibling(run) else {
            return Ok(false);
        };
        let Some(NodeKind::TokenElement { content, .. }) = tree.get(next) else {
            return Ok(false);
        };
        if has_blank_start(content) {
            return Ok(false);
        }
        let merged = format!("{token}{content}");
        tracing::trace!(
            target: "chirp::reconcile",
            into = ?next,
            token,
            merged = %merged.escape_debug(),
            "merging token into the following element"
        );
        tree.set_text(next, merged)?;
        self.classify(tree, next)?;
        caret::place_at(tree, next, token.chars().count())?;
        Ok(true)
    }

    fn classify(&self, tree: &mut DocTree, el: NodeId) -> Result<(), ReconcileError> {
        let class = self.rules.classify(tree.leaf_text(el).unwrap_or_default());
        tree.set_token_class(el, class)?;
        Ok(())
    }
}
