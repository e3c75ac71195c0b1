use std::ops::{Add, AddAssign};
use std::time::Duration;

use crate::models::{Hive, Task, TaskStatus};
use crate::pool::reduce_chunked;

/// Summary counts over a set of hives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HiveStatistics {
    pub total: usize,
    pub healthy: usize,
    pub needs_attention: usize,
    pub queenless: usize,
    /// Hives with honey below 20%.
    pub low_honey: usize,
}

impl HiveStatistics {
    /// Counts one contiguous slice of hives.
    pub fn of(hives: &[Hive]) -> Self {
        hives.iter().fold(Self { total: hives.len(), ..Self::default() }, |mut acc, hive| {
            acc.healthy += usize::from(hive.healthy);
            acc.needs_attention += usize::from(hive.needs_attention);
            acc.queenless += usize::from(hive.queenless);
            acc.low_honey += usize::from(hive.is_low_on_honey());
            acc
        })
    }
}

impl AddAssign for HiveStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.healthy += rhs.healthy;
        self.needs_attention += rhs.needs_attention;
        self.queenless += rhs.queenless;
        self.low_honey += rhs.low_honey;
    }
}

impl Add for HiveStatistics {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Summary counts over a set of tasks.
///
/// `overdue` adds up two things: tasks whose stored status is `Overdue`, and
/// tasks that are late right now (past due and not completed). A task that is
/// both is counted twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStatistics {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl TaskStatistics {
    /// Counts one contiguous slice of tasks.
    pub fn of(tasks: &[Task]) -> Self {
        let mut stats = Self { total: tasks.len(), ..Self::default() };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Overdue => stats.overdue += 1,
            }
            if task.is_overdue() {
                stats.overdue += 1;
            }
        }
        stats
    }
}

impl AddAssign for TaskStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.pending += rhs.pending;
        self.completed += rhs.completed;
        self.overdue += rhs.overdue;
    }
}

impl Add for TaskStatistics {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Counts `hives` in parallel.
///
/// `parallelism` is clamped to the number of available cores. The result
/// does not depend on it.
pub fn hive_statistics(hives: Vec<Hive>, parallelism: usize, grace: Duration) -> HiveStatistics {
    reduce_chunked(hives, parallelism, grace, HiveStatistics::of)
}

/// Counts `tasks` in parallel. See [`TaskStatistics`] for how `overdue` is
/// counted.
pub fn task_statistics(tasks: Vec<Task>, parallelism: usize, grace: Duration) -> TaskStatistics {
    reduce_chunked(tasks, parallelism, grace, TaskStatistics::of)
}
