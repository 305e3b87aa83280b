//! Composer entry points: the trigger interface bound to one editor
//! instance.

use serde::{Deserialize, Serialize};

use crate::classify::ClassifierRules;
use crate::reconcile::{ReconcileError, Reconciler};
use crate::tree::{DocTree, NodeId};

/// Default character limit for one status.
pub const MAX_CHARS: usize = 140;

/// Composer configuration, fixed at composer creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Maximum number of characters a status may hold.
    pub max_chars: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_chars: MAX_CHARS,
        }
    }
}

/// One composer bound to one document tree's lifecycle.
///
/// The classification table and configuration are bound at construction and
/// immutable afterwards. The host calls [`Composer::on_content_changed`]
/// once per raw text-insertion event, after the native insertion has
/// settled (browser hosts defer to the next turn of the event loop for
/// exactly this reason).
#[derive(Debug)]
pub struct Composer {
    config: ComposerConfig,
    rules: ClassifierRules,
}

impl Composer {
    pub fn new(rules: ClassifierRules) -> Self {
        Self::with_config(ComposerConfig::default(), rules)
    }

    pub fn with_config(config: ComposerConfig, rules: ClassifierRules) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Run one reconciliation pass over the edited subtree. Synchronous;
    /// the pass runs to completion before returning.
    pub fn on_content_changed(
        &self,
        tree: &mut DocTree,
        root: NodeId,
    ) -> Result<(), ReconcileError> {
        tracing::debug!(target: "chirp::composer", root = ?root, "content changed");
        Reconciler::new(&self.rules).reconcile(tree, root)
    }

    /// Characters left under the configured limit; negative once the text
    /// runs over.
    pub fn remaining_chars(&self, tree: &DocTree, root: NodeId) -> i64 {
        remaining_character_budget(tree, root, self.config.max_chars)
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(ClassifierRules::standard())
    }
}

/// Characters left under `max_chars` given the container's total text
/// length, for a caller-owned counter display.
pub fn remaining_character_budget(tree: &DocTree, root: NodeId, max_chars: usize) -> i64 {
    max_chars as i64 - tree.char_len(root) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_subtracts_total_text_length() {
        let mut tree = DocTree::new();
        let root = tree.root();
        let run = tree.create_text("this status is exactly 37 characters.");
        tree.push_child(root, run).unwrap();

        assert_eq!(remaining_character_budget(&tree, root, 140), 103);
    }

    #[test]
    fn budget_survives_reconciliation() {
        let composer = Composer::default();
        let mut tree = DocTree::new();
        let root = tree.root();
        let run = tree.create_text("this status is exactly 37 characters.");
        tree.push_child(root, run).unwrap();

        composer.on_content_changed(&mut tree, root).unwrap();
        assert_eq!(composer.remaining_chars(&tree, root), 103);
    }

    #[test]
    fn budget_goes_negative_past_the_limit() {
        let composer = Composer::default();
        let mut tree = DocTree::new();
        let root = tree.root();
        let run = tree.create_text("x".repeat(150));
        tree.push_child(root, run).unwrap();

        assert_eq!(composer.remaining_chars(&tree, root), -10);
    }

    #[test]
    fn custom_limit_is_respected() {
        let composer = Composer::with_config(
            ComposerConfig { max_chars: 280 },
            ClassifierRules::standard(),
        );
        let mut tree = DocTree::new();
        let root = tree.root();
        let run = tree.create_text("short");
        tree.push_child(root, run).unwrap();

        assert_eq!(composer.remaining_chars(&tree, root), 275);
    }
}
