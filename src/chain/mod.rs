//! Ordered revision chain.
//!
//! Migrations declare only their own revision and the revision they follow.
//! This module turns those pairwise declarations into a single linear
//! history, rejecting duplicates, dangling references, cycles and branches.
//!
//! # Overview
//!
//! - Each `ChainNode` carries explicit predecessor and successor links
//! - `OrderedChain` owns every node, keyed by revision, plus the `head`
//! - Links are identifiers, never owning pointers, so a chain can be
//!   checked for corruption independently of how it was built
//! - A chain is always rebuilt from scratch; it is never patched

mod node;
mod ordered;

pub use node::ChainNode;
pub use ordered::OrderedChain;

use thiserror::Error;

/// Structural errors raised while building or checking a chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Duplicate revision in the migration sequence: {0}")]
    DuplicateIdentifier(String),

    #[error("Migration {revision} declares down revision {down_revision}, which is missing from the sequence")]
    MissingPredecessor {
        revision: String,
        down_revision: String,
    },

    #[error("Cycle detected in the migration sequence ({0})")]
    CycleDetected(String),

    #[error("Consistency error: node references are not consistent at {0}")]
    InconsistentLinks(String),

    #[error("Consistency error: {0} has no successor but is not the head")]
    DetachedNode(String),

    #[error("Consistency error: expected exactly one root node, found {0}")]
    RootCount(usize),

    #[error("Consistency error: walk from head did not reach a root within {0} steps")]
    Unterminated(usize),

    #[error("Consistency error: only {reached} of {total} nodes are reachable from head")]
    Unreachable { reached: usize, total: usize },

    #[error("Consistency error: chain has nodes but no head")]
    MissingHead,
}
