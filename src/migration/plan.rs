//! Work computation: which migrations a run must execute.

use super::types::{EngineError, MigrationDirection};
use crate::chain::OrderedChain;

/// The work a run has to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkPlan {
    /// Nothing to do.
    Nothing,
    /// Apply `pending` oldest first.
    Upgrade { pending: Vec<String> },
    /// Revert `revert`, then record `new_marker` (possibly none).
    Downgrade {
        revert: String,
        new_marker: Option<String>,
    },
}

impl WorkPlan {
    pub fn is_empty(&self) -> bool {
        match self {
            WorkPlan::Nothing => true,
            WorkPlan::Upgrade { pending } => pending.is_empty(),
            WorkPlan::Downgrade { .. } => false,
        }
    }

    /// Revisions whose bodies the plan runs, in order.
    pub fn revisions(&self) -> Vec<String> {
        match self {
            WorkPlan::Nothing => Vec::new(),
            WorkPlan::Upgrade { pending } => pending.clone(),
            WorkPlan::Downgrade { revert, .. } => vec![revert.clone()],
        }
    }
}

/// Compute the work for `direction` given the applied marker.
///
/// A marker that names a revision missing from the chain is an error in
/// both directions; it is never silently reset.
pub fn compute_work(
    chain: &OrderedChain,
    direction: MigrationDirection,
    applied: Option<&str>,
) -> Result<WorkPlan, EngineError> {
    if let Some(applied) = applied {
        if !chain.contains(applied) {
            return Err(EngineError::AppliedStateNotInChain(applied.to_string()));
        }
    }

    let plan = match (direction, applied) {
        (MigrationDirection::Upgrade, _) => {
            let pending = chain.range(applied, None);
            if pending.is_empty() {
                WorkPlan::Nothing
            } else {
                WorkPlan::Upgrade { pending }
            }
        }
        (MigrationDirection::Downgrade, None) => WorkPlan::Nothing,
        (MigrationDirection::Downgrade, Some(applied)) => WorkPlan::Downgrade {
            revert: applied.to_string(),
            new_marker: chain.predecessor_of(applied).map(str::to_string),
        },
    };

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> OrderedChain {
        OrderedChain::build_from_pairs(vec![
            ("A", None),
            ("B", Some("A")),
            ("C", Some("B")),
        ])
        .unwrap()
    }

    #[test]
    fn test_upgrade_from_nothing() {
        let plan = compute_work(&abc(), MigrationDirection::Upgrade, None).unwrap();
        assert_eq!(
            plan,
            WorkPlan::Upgrade {
                pending: vec!["A".to_string(), "B".to_string(), "C".to_string()]
            }
        );
    }

    #[test]
    fn test_upgrade_partial() {
        let plan = compute_work(&abc(), MigrationDirection::Upgrade, Some("A")).unwrap();
        assert_eq!(plan.revisions(), vec!["B", "C"]);
    }

    #[test]
    fn test_upgrade_at_head_is_nothing() {
        let plan = compute_work(&abc(), MigrationDirection::Upgrade, Some("C")).unwrap();
        assert_eq!(plan, WorkPlan::Nothing);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_upgrade_empty_chain() {
        let plan = compute_work(&OrderedChain::new(), MigrationDirection::Upgrade, None).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_downgrade_nothing_applied() {
        let plan = compute_work(&abc(), MigrationDirection::Downgrade, None).unwrap();
        assert_eq!(plan, WorkPlan::Nothing);
    }

    #[test]
    fn test_downgrade_moves_to_predecessor() {
        let plan = compute_work(&abc(), MigrationDirection::Downgrade, Some("C")).unwrap();
        assert_eq!(
            plan,
            WorkPlan::Downgrade {
                revert: "C".to_string(),
                new_marker: Some("B".to_string()),
            }
        );
    }

    #[test]
    fn test_downgrade_first_migration_clears_marker() {
        let plan = compute_work(&abc(), MigrationDirection::Downgrade, Some("A")).unwrap();
        assert_eq!(
            plan,
            WorkPlan::Downgrade {
                revert: "A".to_string(),
                new_marker: None,
            }
        );
    }

    #[test]
    fn test_unknown_marker() {
        for direction in [MigrationDirection::Upgrade, MigrationDirection::Downgrade] {
            let err = compute_work(&abc(), direction, Some("X")).unwrap_err();
            assert!(matches!(err, EngineError::AppliedStateNotInChain(ref r) if r == "X"));
        }
    }
}
