use std::fmt;
use std::hash::{Hash, Hasher};

/// One migration's position in history.
///
/// Neighbours are referenced by revision; the owning `OrderedChain` resolves
/// them. Nodes compare and hash by revision only.
#[derive(Debug, Clone)]
pub struct ChainNode {
    id: String,
    predecessor: Option<String>,
    successor: Option<String>,
}

impl ChainNode {
    /// Create an unlinked node.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            predecessor: None,
            successor: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Revision this node follows, `None` for the first migration in history.
    pub fn predecessor(&self) -> Option<&str> {
        self.predecessor.as_deref()
    }

    /// Revision that follows this node, `None` for the head.
    pub fn successor(&self) -> Option<&str> {
        self.successor.as_deref()
    }

    pub(super) fn set_predecessor(&mut self, predecessor: Option<String>) {
        self.predecessor = predecessor;
    }

    pub(super) fn set_successor(&mut self, successor: Option<String>) {
        self.successor = successor;
    }
}

impl PartialEq for ChainNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChainNode {}

impl Hash for ChainNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ChainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
