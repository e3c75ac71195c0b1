use chrono::{Duration as Days, Local};
use hivekeep::config::available_parallelism;
use hivekeep::models::{Hive, Task, TaskKind, TaskStatus};
use hivekeep::pool::{chunk_ranges, clamp_parallelism, reduce_chunked};
use hivekeep::stats::{hive_statistics, task_statistics, HiveStatistics, TaskStatistics};
use std::thread;
use std::time::{Duration, Instant};

const GRACE: Duration = Duration::from_secs(60);

fn mixed_hives(n: u32) -> Vec<Hive> {
    (1..=n)
        .map(|id| Hive::new(id, id % 2 == 0, id % 3 == 0, id % 5 == 0, f64::from(id % 40)))
        .collect()
}

fn mixed_tasks(n: u32) -> Vec<Task> {
    let today = Local::now().date_naive();
    (1..=n)
        .map(|id| {
            let due = if id % 4 == 0 { today - Days::days(3) } else { today + Days::days(3) };
            let mut task = Task::new(id, format!("Task {}", id), TaskKind::Other, 1, today - Days::days(10), due);
            if id % 7 == 0 {
                task.status = TaskStatus::Completed;
            }
            task
        })
        .collect()
}

#[test]
fn test_healthy_fleet() {
    let hives: Vec<Hive> = (1..=10).map(|id| Hive::new(id, true, false, false, 75.0)).collect();
    let stats = hive_statistics(hives, 4, GRACE);
    assert_eq!(
        stats,
        HiveStatistics { total: 10, healthy: 10, needs_attention: 0, queenless: 0, low_honey: 0 }
    );
}

#[test]
fn test_low_honey_threshold_is_exclusive() {
    let hives = vec![
        Hive::new(1, true, false, false, 19.9),
        Hive::new(2, true, false, false, 20.0),
        Hive::new(3, true, false, false, 0.0),
    ];
    assert_eq!(hive_statistics(hives, 2, GRACE).low_honey, 2);
}

#[test]
fn test_late_task_counts_overdue_twice() {
    let today = Local::now().date_naive();
    let task = Task::new(1, "Late", TaskKind::FeedHive, 1, today - Days::days(14), today - Days::days(7));
    assert_eq!(task.status, TaskStatus::Overdue);

    let stats = task_statistics(vec![task], 1, GRACE);
    assert_eq!(stats, TaskStatistics { total: 1, pending: 0, completed: 0, overdue: 2 });
}

#[test]
fn test_completed_task_is_never_late() {
    let today = Local::now().date_naive();
    let mut task = Task::new(1, "Done", TaskKind::FeedHive, 1, today - Days::days(14), today - Days::days(7));
    task.status = TaskStatus::Completed;

    let stats = task_statistics(vec![task], 1, GRACE);
    assert_eq!(stats, TaskStatistics { total: 1, pending: 0, completed: 1, overdue: 0 });
}

#[test]
fn test_pending_task_past_due_counts_once() {
    let today = Local::now().date_naive();
    let mut task = Task::new(1, "Slipped", TaskKind::Other, 1, today - Days::days(3), today + Days::days(1));
    task.due = today - Days::days(1);

    let stats = task_statistics(vec![task], 1, GRACE);
    assert_eq!(stats, TaskStatistics { total: 1, pending: 1, completed: 0, overdue: 1 });
}

#[test]
fn test_result_does_not_depend_on_parallelism() {
    let hives = mixed_hives(103);
    let tasks = mixed_tasks(97);
    let expected_hives = HiveStatistics::of(&hives);
    let expected_tasks = TaskStatistics::of(&tasks);

    for p in [1, 2, 3, 7, available_parallelism(), 0, 1000] {
        assert_eq!(hive_statistics(hives.clone(), p, GRACE), expected_hives, "hives with p = {}", p);
        assert_eq!(task_statistics(tasks.clone(), p, GRACE), expected_tasks, "tasks with p = {}", p);
    }
    assert_eq!(expected_hives.total, 103);
    assert_eq!(expected_tasks.total, 97);
}

#[test]
fn test_empty_input() {
    assert_eq!(hive_statistics(Vec::new(), 4, GRACE), HiveStatistics::default());
    assert_eq!(task_statistics(Vec::new(), 4, GRACE), TaskStatistics::default());
}

#[test]
fn test_more_workers_than_items() {
    let stats = hive_statistics(mixed_hives(2), 64, GRACE);
    assert_eq!(stats.total, 2);
}

#[test]
fn test_panicking_chunk_counts_as_zero() {
    let items: Vec<u32> = (0..100).collect();
    let first_chunk = chunk_ranges(100, clamp_parallelism(4))[0].len();

    let total = reduce_chunked(items, 4, GRACE, |chunk: &[u32]| {
        if chunk[0] == 0 {
            panic!("bad chunk");
        }
        chunk.len()
    });
    assert_eq!(total, 100 - first_chunk);
}

#[test]
fn test_grace_period_abandons_slow_chunks() {
    let items: Vec<u32> = (0..4).collect();
    let started = Instant::now();

    let total = reduce_chunked(items, 4, Duration::from_millis(100), |chunk: &[u32]| {
        if chunk.contains(&0) {
            thread::sleep(Duration::from_secs(2));
        }
        chunk.len()
    });

    assert!(total < 4);
    assert!(started.elapsed() < Duration::from_millis(1500));
}
