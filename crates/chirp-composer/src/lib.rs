//! chirp-composer: incremental rich-text tokenizer for a status composer.
//!
//! This crate provides:
//! - `DocTree` - arena-backed document tree (text runs, token elements,
//!   line containers) with a caret slot
//! - `ClassifierRules` - ordered pattern table deciding a token's class
//! - `Reconciler` - the per-edit pass that splits, merges and re-labels
//!   nodes so every word ends up wrapped in exactly one classified token
//!   element, and that moves the caret to the edit point
//! - `Composer` - the entry points a host calls per edit event
//!
//! The host owns event delivery: it calls
//! [`Composer::on_content_changed`] once per raw text-insertion event,
//! after the native insertion has settled.

pub mod caret;
pub mod classify;
pub mod composer;
pub mod reconcile;
pub mod tree;


pub use caret::{Caret, CaretError};
pub use classify::{ClassifierRules, TokenClass};
pub use composer::{Composer, ComposerConfig, MAX_CHARS, remaining_character_budget};
pub use reconcile::{ReconcileError, Reconciler};
pub use tree::{DocTree, NodeId, NodeKind, TreeError};
