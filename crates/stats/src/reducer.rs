use serde::{Deserialize, Serialize};

use stocktake_core::BranchId;
use stocktake_records::{CountStatus, CyclicItem};

/// Group progress status for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Pending,
    InProgress,
    Complete,
}

/// Per-group rollup of counting progress and variance value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total_items: usize,
    pub controlled_items: usize,
    /// Percent complete, rounded to one decimal place.
    pub progress: f64,
    pub status: GroupStatus,
    /// Sum of negative diff values over controlled/adjusted items, in cents.
    pub shortage_value_cents: i64,
    /// Sum of positive diff values over controlled/adjusted items, in cents.
    pub surplus_value_cents: i64,
}

/// Supplies the branch-level group-count goal (configuration collaborator).
///
/// The goal is independent of item counts; it comes from branch
/// configuration. An unset goal must read as 0, not an assumed value.
pub trait GroupGoalSource {
    fn group_goal(&self, branch: BranchId) -> u32;
}

/// Goal source with one fixed value; `FixedGoal(0)` models an unset goal.
#[derive(Debug, Clone, Copy)]
pub struct FixedGoal(pub u32);

impl GroupGoalSource for FixedGoal {
    fn group_goal(&self, _branch: BranchId) -> u32 {
        self.0
    }
}

/// Branch-level rollup.
///
/// Scaled differently from group progress: completed groups over the
/// externally configured goal, not an average of item-level progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchStats {
    pub completed_groups: usize,
    pub group_goal: u32,
    /// Percent of the goal reached, one decimal; 0.0 when the goal is unset.
    pub progress: f64,
}

/// Roll one group's items into progress and value buckets.
///
/// "Controlled" here counts `controlled` and `adjusted` items (both have a
/// confirmed count). Pending items never contribute to the value buckets.
pub fn reduce_group(items: &[CyclicItem]) -> GroupStats {
    let total = items.len();
    let mut controlled = 0usize;
    let mut shortage_value_cents = 0i64;
    let mut surplus_value_cents = 0i64;

    for item in items {
        match item.status() {
            CountStatus::Controlled | CountStatus::Adjusted => {
                controlled += 1;
                if let Some(diff) = item.record.diff() {
                    if diff.value_cents < 0 {
                        shortage_value_cents += diff.value_cents;
                    } else if diff.value_cents > 0 {
                        surplus_value_cents += diff.value_cents;
                    }
                }
            }
            CountStatus::Pending => {}
        }
    }

    let progress = if total == 0 {
        0.0
    } else {
        round1(controlled as f64 / total as f64 * 100.0)
    };

    let status = if controlled == total && total > 0 {
        GroupStatus::Complete
    } else if controlled > 0 {
        GroupStatus::InProgress
    } else {
        GroupStatus::Pending
    };

    GroupStats {
        total_items: total,
        controlled_items: controlled,
        progress,
        status,
        shortage_value_cents,
        surplus_value_cents,
    }
}

/// Roll per-group stats into the branch figure against the configured goal.
pub fn reduce_branch(
    branch: BranchId,
    groups: &[GroupStats],
    goals: &dyn GroupGoalSource,
) -> BranchStats {
    let completed = groups
        .iter()
        .filter(|g| g.status == GroupStatus::Complete)
        .count();
    let goal = goals.group_goal(branch);

    let progress = if goal == 0 {
        0.0
    } else {
        round1(completed as f64 / goal as f64 * 100.0)
    };

    BranchStats {
        completed_groups: completed,
        group_goal: goal,
        progress,
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocktake_core::Ean;
    use stocktake_records::InventoryRecord;

    fn item(ean: &str, system: i64, cost: i64) -> CyclicItem {
        CyclicItem::new(InventoryRecord::new(Ean::new(ean), ean.to_string(), system, cost))
    }

    fn controlled(ean: &str, system: i64, counted: i64, cost: i64) -> CyclicItem {
        let mut it = item(ean, system, cost);
        it.set_quantity(counted).unwrap();
        it
    }

    #[test]
    fn progress_is_rounded_to_one_decimal() {
        // 1 of 3 controlled = 33.333...% → 33.3.
        let items = vec![
            controlled("1", 5, 5, 10),
            item("2", 5, 10),
            item("3", 5, 10),
        ];
        let stats = reduce_group(&items);
        assert_eq!(stats.progress, 33.3);
        assert_eq!(stats.status, GroupStatus::InProgress);
    }

    #[test]
    fn all_controlled_is_complete() {
        let items = vec![controlled("1", 5, 5, 10), controlled("2", 3, 3, 10)];
        let stats = reduce_group(&items);
        assert_eq!(stats.progress, 100.0);
        assert_eq!(stats.status, GroupStatus::Complete);
    }

    #[test]
    fn empty_group_is_pending_not_complete() {
        let stats = reduce_group(&[]);
        assert_eq!(stats.progress, 0.0);
        assert_eq!(stats.status, GroupStatus::Pending);
        assert_eq!(stats.total_items, 0);
    }

    #[test]
    fn value_buckets_ignore_pending_items() {
        let mut pending_with_count = item("3", 10, 100);
        pending_with_count.set_quantity(2).unwrap();
        pending_with_count.revert().unwrap(); // back to pending, count cleared

        let items = vec![
            controlled("1", 10, 7, 100),  // shortage: -300
            controlled("2", 10, 12, 100), // surplus: +200
            pending_with_count,
        ];
        let stats = reduce_group(&items);
        assert_eq!(stats.shortage_value_cents, -300);
        assert_eq!(stats.surplus_value_cents, 200);
    }

    #[test]
    fn branch_progress_scales_by_goal() {
        let complete = GroupStats {
            total_items: 1,
            controlled_items: 1,
            progress: 100.0,
            status: GroupStatus::Complete,
            shortage_value_cents: 0,
            surplus_value_cents: 0,
        };
        let groups = vec![complete.clone(), complete];
        let stats = reduce_branch(BranchId::new(), &groups, &FixedGoal(8));
        assert_eq!(stats.completed_groups, 2);
        assert_eq!(stats.progress, 25.0);
    }

    #[test]
    fn unset_goal_reports_zero_progress() {
        let complete = GroupStats {
            total_items: 1,
            controlled_items: 1,
            progress: 100.0,
            status: GroupStatus::Complete,
            shortage_value_cents: 0,
            surplus_value_cents: 0,
        };
        let stats = reduce_branch(BranchId::new(), &[complete], &FixedGoal(0));
        assert_eq!(stats.progress, 0.0);
        assert_eq!(stats.group_goal, 0);
    }
}
