use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::record::{HealStatus, HealingRecord};

/// The final outcome of a healing session: a partition of the
/// originally-failing test ids by terminal status, plus the derived commit
/// decision. Serialized as-is for downstream report rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub successfully_healed: BTreeSet<String>,
    pub actual_defects: BTreeSet<String>,
    pub max_attempts_exceeded: BTreeSet<String>,
    pub healed_count: usize,
    pub defect_count: usize,
    pub exceeded_count: usize,
    pub commit_allowed: bool,
}

impl WorkflowResult {
    /// An empty session: nothing failed, commit allowed.
    pub fn empty() -> Self {
        aggregate(&[])
    }
}

/// Partitions healing records into the final workflow result.
///
/// Deterministic and order-independent: the same set of records yields an
/// identical result regardless of input ordering.
pub fn aggregate(records: &[HealingRecord]) -> WorkflowResult {
    let mut healed = BTreeSet::new();
    let mut defects = BTreeSet::new();
    let mut exceeded = BTreeSet::new();

    for record in records {
        let id = record.test_id.clone();
        match record.status {
            HealStatus::SuccessfullyHealed => healed.insert(id),
            HealStatus::ActualDefect => defects.insert(id),
            HealStatus::MaxAttemptsExceeded => exceeded.insert(id),
        };
    }

    let commit_allowed = exceeded.is_empty();

    WorkflowResult {
        healed_count: healed.len(),
        defect_count: defects.len(),
        exceeded_count: exceeded.len(),
        successfully_healed: healed,
        actual_defects: defects,
        max_attempts_exceeded: exceeded,
        commit_allowed,
    }
}

/// The commit gate: commit is allowed if and only if no test exhausted its
/// repair budget. Actual defects do not block commit — the test suite itself
/// is in a consistent state and the defects are tracked for human
/// investigation.
pub fn decide(result: &WorkflowResult) -> bool {
    result.max_attempts_exceeded.is_empty()
}
