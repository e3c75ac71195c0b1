use chrono::{Duration, Local, NaiveDate};
use hivekeep::models::{Assignment, Hive, Role, Task, TaskKind, TaskStatus, User};

fn task_due(due: NaiveDate) -> Task {
    Task::new(1, "Inspect", TaskKind::InspectHive, 3, Local::now().date_naive(), due)
}

#[test]
fn test_new_task_status_follows_due_date() {
    let today = Local::now().date_naive();
    assert_eq!(task_due(today + Duration::days(1)).status, TaskStatus::Pending);
    assert_eq!(task_due(today).status, TaskStatus::Pending);
    assert_eq!(task_due(today - Duration::days(1)).status, TaskStatus::Overdue);
}

#[test]
fn test_is_overdue_on() {
    let due = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let mut task = task_due(due);
    assert!(!task.is_overdue_on(due));
    assert!(task.is_overdue_on(due + Duration::days(1)));
    task.status = TaskStatus::Completed;
    assert!(!task.is_overdue_on(due + Duration::days(1)));
}

#[test]
fn test_assignment_is_exclusive() {
    let mut alice = User::new(1, "Alice", "alice@example.com", "a", Role::Admin);
    let mut bob = User::new(2, "Bob", "bob@example.com", "b", Role::Employee);
    let mut task = task_due(Local::now().date_naive() + Duration::days(3));

    assert_eq!(alice.assign_task(&mut task), Assignment::Assigned);
    assert_eq!(bob.assign_task(&mut task), Assignment::Conflict { owner: 1 });
    assert_eq!(task.assigned_to, Some(1));
    assert!(bob.assigned_tasks.is_empty());

    // Re-assigning to the current owner does not duplicate the entry.
    assert_eq!(alice.assign_task(&mut task), Assignment::Assigned);
    assert_eq!(alice.assigned_tasks, vec![1]);
}

#[test]
fn test_complete_clears_assignment() {
    let mut alice = User::new(1, "Alice", "alice@example.com", "a", Role::Employee);
    let mut bob = User::new(2, "Bob", "bob@example.com", "b", Role::Employee);
    let mut task = task_due(Local::now().date_naive() + Duration::days(3));
    let _ = alice.assign_task(&mut task);

    alice.complete_task(&mut task);
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(!task.is_assigned());
    assert!(alice.assigned_tasks.is_empty());
    assert_eq!(bob.assign_task(&mut task), Assignment::Assigned);
}

#[test]
fn test_authenticate() {
    let user = User::new(1, "Alice", "alice@example.com", "secret", Role::Employee);
    assert!(user.authenticate("secret"));
    assert!(!user.authenticate("Secret"));
    assert!(!user.authenticate(""));
}

#[test]
fn test_low_honey() {
    assert!(Hive::new(1, true, false, false, 19.99).is_low_on_honey());
    assert!(!Hive::new(1, true, false, false, 20.0).is_low_on_honey());
}
