use super::node::ChainNode;
use super::ChainError;
use std::collections::HashMap;

/// Linear migration history resolved from `(revision, down_revision)` pairs.
///
/// `head` is the most recently created revision; the root is the single node
/// without a predecessor. Navigation walks backwards from `head`, the forward
/// links are kept as a mirror so corruption can be detected.
#[derive(Debug, Clone, Default)]
pub struct OrderedChain {
    nodes: HashMap<String, ChainNode>,
    head: Option<String>,
}

impl OrderedChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh chain from declared `(revision, down_revision)` pairs.
    ///
    /// A `None` down revision marks the first migration in history. Any
    /// structural problem found after linking is reported as
    /// [`ChainError::CycleDetected`]; no partial chain is returned.
    pub fn build_from_pairs<I, K, V>(pairs: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut nodes: HashMap<String, ChainNode> = HashMap::new();
        let mut declared: Vec<(String, Option<String>)> = Vec::new();

        for (revision, down_revision) in pairs {
            let revision = revision.into();
            if nodes.contains_key(&revision) {
                return Err(ChainError::DuplicateIdentifier(revision));
            }
            nodes.insert(revision.clone(), ChainNode::new(revision.clone()));
            declared.push((revision, down_revision.map(Into::into)));
        }

        for (revision, down_revision) in declared {
            let Some(down_revision) = down_revision else {
                continue;
            };

            match nodes.get_mut(&down_revision) {
                Some(previous) => previous.set_successor(Some(revision.clone())),
                None => {
                    return Err(ChainError::MissingPredecessor {
                        revision,
                        down_revision,
                    })
                }
            }
            if let Some(node) = nodes.get_mut(&revision) {
                node.set_predecessor(Some(down_revision));
            }
        }

        let head = nodes
            .values()
            .find(|node| node.successor().is_none())
            .map(|node| node.id().to_string());

        let chain = Self { nodes, head };
        chain
            .check_consistency()
            .map_err(|e| ChainError::CycleDetected(e.to_string()))?;

        Ok(chain)
    }

    /// The most recently created revision.
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a revision after the current head and make it the new head.
    pub fn add(&mut self, id: impl Into<String>) -> Result<(), ChainError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(ChainError::DuplicateIdentifier(id));
        }

        let mut node = ChainNode::new(id.clone());
        if let Some(previous_head) = self.head.take() {
            if let Some(previous) = self.nodes.get_mut(&previous_head) {
                previous.set_successor(Some(id.clone()));
            }
            node.set_predecessor(Some(previous_head));
        }

        self.nodes.insert(id.clone(), node);
        self.head = Some(id);
        Ok(())
    }

    /// Find a node by scanning backwards from head.
    pub fn find(&self, id: &str) -> Option<&ChainNode> {
        self.walk_from(self.head.as_deref())
            .find(|node| node.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Revision immediately after `id`.
    pub fn successor_of(&self, id: &str) -> Option<&str> {
        self.find(id).and_then(ChainNode::successor)
    }

    /// Revision immediately before `id`.
    pub fn predecessor_of(&self, id: &str) -> Option<&str> {
        self.find(id).and_then(ChainNode::predecessor)
    }

    /// Revisions strictly after `from_exclusive` up to and including
    /// `to_inclusive` (head when `None`), oldest first.
    ///
    /// When `from_exclusive` is never reached the whole prefix down to the
    /// root is returned, so callers should pass a known member or `None`.
    pub fn range(&self, from_exclusive: Option<&str>, to_inclusive: Option<&str>) -> Vec<String> {
        let end = match to_inclusive {
            Some(id) => self.find(id).map(ChainNode::id),
            None => self.head.as_deref(),
        };

        let mut revisions: Vec<String> = self
            .walk_from(end)
            .take_while(|node| Some(node.id()) != from_exclusive)
            .map(|node| node.id().to_string())
            .collect();

        revisions.reverse();
        revisions
    }

    /// All revisions, oldest first.
    pub fn revisions(&self) -> Vec<String> {
        self.range(None, None)
    }

    /// Walk from head through predecessor links, verifying back links,
    /// termination at a single root, and that every node is reachable.
    pub fn check_consistency(&self) -> Result<(), ChainError> {
        let Some(head) = self.head.as_deref() else {
            return if self.nodes.is_empty() {
                Ok(())
            } else {
                Err(ChainError::MissingHead)
            };
        };

        let mut current = self.nodes.get(head).ok_or(ChainError::MissingHead)?;
        if current.successor().is_some() {
            return Err(ChainError::InconsistentLinks(head.to_string()));
        }

        let total = self.nodes.len();
        let mut reached = 1;

        while let Some(previous_id) = current.predecessor() {
            let previous = self
                .nodes
                .get(previous_id)
                .ok_or_else(|| ChainError::InconsistentLinks(current.id().to_string()))?;

            if previous.successor() != Some(current.id()) {
                return Err(ChainError::InconsistentLinks(previous.id().to_string()));
            }

            reached += 1;
            if reached > total {
                return Err(ChainError::Unterminated(total));
            }
            current = previous;
        }

        if reached != total {
            return Err(ChainError::Unreachable { reached, total });
        }

        Ok(())
    }

    /// Check every node's links independently of the walk from head.
    pub fn check_node_consistency(&self) -> Result<(), ChainError> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let head = self.head.as_deref().ok_or(ChainError::MissingHead)?;

        let mut roots = 0;
        for node in self.nodes.values() {
            if node.successor().is_none() && node.id() != head {
                return Err(ChainError::DetachedNode(node.id().to_string()));
            }

            if let Some(successor) = node.successor() {
                let linked_back = self
                    .nodes
                    .get(successor)
                    .is_some_and(|next| next.predecessor() == Some(node.id()));
                if !linked_back {
                    return Err(ChainError::InconsistentLinks(node.id().to_string()));
                }
            }

            match node.predecessor() {
                Some(predecessor) => {
                    let linked_forward = self
                        .nodes
                        .get(predecessor)
                        .is_some_and(|previous| previous.successor() == Some(node.id()));
                    if !linked_forward {
                        return Err(ChainError::InconsistentLinks(node.id().to_string()));
                    }
                }
                None => roots += 1,
            }
        }

        if roots != 1 {
            return Err(ChainError::RootCount(roots));
        }
        Ok(())
    }

    /// Nodes from `start` back towards the root, bounded by the node count so
    /// a corrupted chain cannot loop forever.
    fn walk_from(&self, start: Option<&str>) -> impl Iterator<Item = &ChainNode> + '_ {
        let mut current = start.and_then(|id| self.nodes.get(id));
        let mut remaining = self.nodes.len();

        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let node = current?;
            remaining -= 1;
            current = node.predecessor().and_then(|id| self.nodes.get(id));
            Some(node)
        })
    }

    #[cfg(test)]
    fn node_mut(&mut self, id: &str) -> &mut ChainNode {
        self.nodes.get_mut(id).expect("node should exist")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_node_chain() -> OrderedChain {
        let mut chain = OrderedChain::new();
        for id in ["node1", "node2", "node3", "node4", "node5"] {
            chain.add(id).unwrap();
        }
        chain
    }

    fn pairs(raw: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
        raw.iter()
            .map(|(id, prev)| (id.to_string(), prev.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_find() {
        let chain = five_node_chain();
        assert_eq!(chain.find("node3").map(ChainNode::id), Some("node3"));
        assert!(chain.find("missing").is_none());
        assert!(chain.contains("node1"));
    }

    #[test]
    fn test_successor_and_predecessor() {
        let chain = five_node_chain();
        assert_eq!(chain.successor_of("node3"), Some("node4"));
        assert_eq!(chain.predecessor_of("node3"), Some("node2"));
        assert_eq!(chain.predecessor_of("node1"), None);
        assert_eq!(chain.successor_of("node5"), None);
        assert_eq!(chain.successor_of("missing"), None);
    }

    #[test]
    fn test_range_from_head_is_empty() {
        let chain = five_node_chain();
        assert!(chain.range(chain.head(), None).is_empty());
    }

    #[test]
    fn test_range_after_member() {
        let chain = five_node_chain();
        assert_eq!(chain.range(Some("node2"), None), vec!["node3", "node4", "node5"]);
    }

    #[test]
    fn test_range_with_explicit_end() {
        let chain = five_node_chain();
        assert_eq!(chain.range(Some("node1"), Some("node3")), vec!["node2", "node3"]);
        assert!(chain.range(Some("node1"), Some("missing")).is_empty());
    }

    #[test]
    fn test_range_unknown_start_returns_full_prefix() {
        let chain = five_node_chain();
        assert_eq!(chain.range(Some("unknown"), None).len(), 5);
        assert_eq!(chain.range(None, None), chain.revisions());
    }

    #[test]
    fn test_add_moves_head() {
        let mut chain = five_node_chain();
        chain.add("node6").unwrap();
        assert_eq!(chain.head(), Some("node6"));
        assert_eq!(chain.predecessor_of("node6"), Some("node5"));
        assert_eq!(chain.successor_of("node5"), Some("node6"));
    }

    #[test]
    fn test_add_duplicate_fails() {
        let mut chain = five_node_chain();
        assert_eq!(
            chain.add("node3"),
            Err(ChainError::DuplicateIdentifier("node3".to_string()))
        );
        assert_eq!(chain.head(), Some("node5"));
    }

    #[test]
    fn test_build_from_pairs() {
        let chain = OrderedChain::build_from_pairs(pairs(&[
            ("node3", Some("node2")),
            ("node1", None),
            ("node5", Some("node4")),
            ("node2", Some("node1")),
            ("node4", Some("node3")),
        ]))
        .unwrap();

        assert_eq!(chain.head(), Some("node5"));
        assert_eq!(chain.revisions(), vec!["node1", "node2", "node3", "node4", "node5"]);
        assert!(chain.check_consistency().is_ok());
        assert!(chain.check_node_consistency().is_ok());
    }

    #[test]
    fn test_build_from_empty_pairs() {
        let chain = OrderedChain::build_from_pairs(Vec::<(String, Option<String>)>::new()).unwrap();
        assert!(chain.is_empty());
        assert!(chain.head().is_none());
    }

    #[test]
    fn test_build_duplicate_revision() {
        let result = OrderedChain::build_from_pairs(pairs(&[
            ("a", None),
            ("b", Some("a")),
            ("b", Some("a")),
        ]));
        assert_eq!(result.unwrap_err(), ChainError::DuplicateIdentifier("b".to_string()));
    }

    #[test]
    fn test_build_missing_predecessor() {
        let result = OrderedChain::build_from_pairs(pairs(&[("a", None), ("b", Some("zzz"))]));
        assert_eq!(
            result.unwrap_err(),
            ChainError::MissingPredecessor {
                revision: "b".to_string(),
                down_revision: "zzz".to_string(),
            }
        );
    }

    #[test]
    fn test_build_cycle() {
        let result = OrderedChain::build_from_pairs(pairs(&[
            ("migration2", Some("migration1")),
            ("migration1", Some("migration3")),
            ("migration3", Some("migration4")),
            ("migration4", Some("migration2")),
        ]));
        assert!(matches!(result, Err(ChainError::CycleDetected(_))));
    }

    #[test]
    fn test_build_self_reference() {
        let result = OrderedChain::build_from_pairs(pairs(&[("a", Some("a"))]));
        assert!(matches!(result, Err(ChainError::CycleDetected(_))));
    }

    #[test]
    fn test_build_branch() {
        let result = OrderedChain::build_from_pairs(pairs(&[
            ("a", None),
            ("b", Some("a")),
            ("c", Some("a")),
        ]));
        assert!(matches!(result, Err(ChainError::CycleDetected(_))));
    }

    #[test]
    fn test_build_two_roots() {
        let result = OrderedChain::build_from_pairs(pairs(&[
            ("a", None),
            ("b", Some("a")),
            ("c", None),
        ]));
        assert!(matches!(result, Err(ChainError::CycleDetected(_))));
    }

    #[test]
    fn test_build_detached_cycle() {
        let result = OrderedChain::build_from_pairs(pairs(&[
            ("a", None),
            ("b", Some("a")),
            ("c", Some("d")),
            ("d", Some("c")),
        ]));
        assert!(matches!(result, Err(ChainError::CycleDetected(_))));
    }

    #[test]
    fn test_check_consistency_missing_successor() {
        let mut chain = five_node_chain();
        chain.node_mut("node3").set_successor(None);
        assert!(matches!(
            chain.check_consistency(),
            Err(ChainError::InconsistentLinks(_))
        ));
    }

    #[test]
    fn test_check_consistency_wrong_successor() {
        let mut chain = five_node_chain();
        chain.node_mut("node3").set_successor(Some("node5".to_string()));
        assert!(matches!(
            chain.check_consistency(),
            Err(ChainError::InconsistentLinks(_))
        ));
    }

    #[test]
    fn test_check_consistency_unreachable_node() {
        let mut chain = five_node_chain();
        chain.node_mut("node3").set_predecessor(None);
        chain.node_mut("node2").set_successor(None);
        assert_eq!(
            chain.check_consistency(),
            Err(ChainError::Unreachable { reached: 3, total: 5 })
        );
    }

    #[test]
    fn test_check_node_consistency_missing_successor() {
        let mut chain = five_node_chain();
        chain.node_mut("node3").set_successor(None);
        assert!(chain.check_node_consistency().is_err());
    }

    #[test]
    fn test_check_node_consistency_no_root() {
        let mut chain = five_node_chain();
        chain.node_mut("node1").set_predecessor(Some("node5".to_string()));
        assert_eq!(
            chain.check_node_consistency(),
            Err(ChainError::InconsistentLinks("node1".to_string()))
        );
    }

    #[test]
    fn test_check_node_consistency_multiple_roots() {
        let mut chain = five_node_chain();
        chain.node_mut("node4").set_predecessor(None);
        assert_eq!(
            chain.check_node_consistency(),
            Err(ChainError::InconsistentLinks("node3".to_string()))
        );
    }

    #[test]
    fn test_check_node_consistency_crossed_links() {
        let mut chain = five_node_chain();
        chain.node_mut("node4").set_predecessor(Some("node3".to_string()));
        chain.node_mut("node3").set_successor(Some("node2".to_string()));
        assert!(matches!(
            chain.check_node_consistency(),
            Err(ChainError::InconsistentLinks(_))
        ));
    }

    #[test]
    fn test_find_terminates_on_corrupted_loop() {
        let mut chain = five_node_chain();
        chain.node_mut("node1").set_predecessor(Some("node5".to_string()));
        assert!(chain.find("missing").is_none());
        assert_eq!(chain.range(Some("missing"), None).len(), 5);
    }
}
