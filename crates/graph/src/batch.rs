use std::collections::HashMap;

use caravan_types::{BlockedRef, ExecutionStatus};

use crate::Module;

/// One round of batching: an ordered sequence of concurrently executable
/// batches plus the futures that can never be scheduled this run.
///
/// Transient: recomputed from the module and the current status snapshot
/// after every completed batch, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    /// Each inner vec is a batch; members only depend on futures in strictly
    /// earlier batches or on futures that already succeeded.
    pub batches: Vec<Vec<String>>,

    /// Futures with a failed or timed-out dependency (direct or transitive),
    /// paired with the root-cause dependency.
    pub blocked: Vec<BlockedRef>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total futures scheduled across all batches.
    pub fn scheduled(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

/// Group every schedulable future into the earliest batch whose index is
/// strictly greater than the batch index of each of its unresolved
/// dependencies. Dependencies already SUCCESS are satisfied at batch -1,
/// i.e. excluded entirely; SUCCESS futures themselves are not scheduled.
pub fn compute_batches(
    module: &Module,
    statuses: &HashMap<String, ExecutionStatus>,
) -> BatchPlan {
    // -1 = satisfied/excluded, None (not yet computed) is tracked separately.
    let mut depth: HashMap<&str, Option<i64>> = HashMap::new();
    // future id -> root-cause failed dependency, if blocked.
    let mut poisoned: HashMap<&str, &str> = HashMap::new();

    fn status_of(statuses: &HashMap<String, ExecutionStatus>, id: &str) -> ExecutionStatus {
        statuses
            .get(id)
            .copied()
            .unwrap_or(ExecutionStatus::Unstarted)
    }

    fn resolve<'a>(
        id: &'a str,
        module: &'a Module,
        statuses: &HashMap<String, ExecutionStatus>,
        depth: &mut HashMap<&'a str, Option<i64>>,
        poisoned: &mut HashMap<&'a str, &'a str>,
    ) -> Option<i64> {
        if let Some(d) = depth.get(id) {
            return *d;
        }

        let computed = match status_of(statuses, id) {
            ExecutionStatus::Success => Some(-1),
            ExecutionStatus::Failed | ExecutionStatus::TimedOut => {
                poisoned.insert(id, id);
                None
            }
            _ => {
                let future = match module.get(id) {
                    Some(f) => f,
                    None => return Some(-1),
                };

                let mut max_dep = -1i64;
                let mut blocked_by: Option<&str> = None;
                for dep in future.dependencies() {
                    let dep_key = match module
                        .future_ids()
                        .find(|candidate| *candidate == dep.as_str())
                    {
                        Some(k) => k,
                        None => continue,
                    };
                    match resolve(dep_key, module, statuses, depth, poisoned) {
                        Some(d) => max_dep = max_dep.max(d),
                        None => {
                            // Propagate the root cause upward.
                            blocked_by = poisoned.get(dep_key).copied();
                            break;
                        }
                    }
                }

                match blocked_by {
                    Some(cause) => {
                        poisoned.insert(id, cause);
                        None
                    }
                    None => Some(max_dep + 1),
                }
            }
        };

        depth.insert(id, computed);
        computed
    }

    for id in module.future_ids() {
        resolve(id, module, statuses, &mut depth, &mut poisoned);
    }

    let mut batches: Vec<Vec<String>> = Vec::new();
    for id in module.future_ids() {
        if let Some(Some(d)) = depth.get(id) {
            if *d < 0 {
                continue;
            }
            let index = *d as usize;
            if batches.len() <= index {
                batches.resize_with(index + 1, Vec::new);
            }
            batches[index].push(id.to_string());
        }
    }
    for batch in &mut batches {
        batch.sort();
    }

    let mut blocked: Vec<BlockedRef> = poisoned
        .iter()
        .filter(|(id, cause)| id != cause)
        .map(|(id, cause)| BlockedRef {
            future_id: id.to_string(),
            blocked_by: cause.to_string(),
        })
        .collect();
    blocked.sort_by(|a, b| a.future_id.cmp(&b.future_id));

    BatchPlan { batches, blocked }
}
