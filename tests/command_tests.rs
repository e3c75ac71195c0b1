use hivekeep::audit::{MemoryAuditLog, NullAuditLog};
use hivekeep::commands::*;
use hivekeep::models::{Assignment, Hive, Role, Task, TaskKind, TaskStatus, User};
use hivekeep::repository::Repository;
use hivekeep::session::start_background_load;
use hivekeep::storage::SnapshotStore;
use hivekeep::Error;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Runs `f` against a freshly seeded repository in its own temp directory.
fn with_test_repo<F>(f: F)
where
    F: FnOnce(&Repository, &MemoryAuditLog),
{
    let dir = tempfile::tempdir().unwrap();
    let audit = Arc::new(MemoryAuditLog::new());
    let repo = Repository::open(SnapshotStore::new(dir.path().join("data.json")), audit.clone());
    f(&repo, &audit);
}

fn admin(repo: &Repository) -> User {
    repo.user_by_email("admin@example.com").unwrap()
}

fn employee(repo: &Repository) -> User {
    repo.user_by_email("employee@example.com").unwrap()
}

#[test]
fn test_login() {
    with_test_repo(|repo, audit| {
        let user = cmd_login(repo, None, "employee@example.com", "emp123", TIMEOUT, true).unwrap();
        assert_eq!(user.role, Role::Employee);
        assert!(audit.contains("User 2 (Employee User): Logged in as Employee"));

        assert!(cmd_login(repo, None, "employee@example.com", "wrong", TIMEOUT, true).is_none());
        assert!(cmd_login(repo, None, "nobody@example.com", "emp123", TIMEOUT, true).is_none());
        assert!(audit.contains("SYSTEM: Failed login attempt for nobody@example.com"));
    });
}

#[test]
fn test_login_waits_for_background_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    // First run writes the sample snapshot.
    drop(Repository::open(SnapshotStore::new(&path), Arc::new(NullAuditLog)));

    let repo = Arc::new(Repository::empty(SnapshotStore::new(&path), Arc::new(MemoryAuditLog::new())));
    let load = start_background_load(Arc::clone(&repo));
    let user = cmd_login(&repo, Some(&load), "admin@example.com", "admin123", TIMEOUT, true);
    assert!(load.is_finished());
    assert_eq!(user.map(|u| u.id), Some(1));
}

#[test]
fn test_add_tasks_for_several_hives() {
    with_test_repo(|repo, _| {
        let ids = cmd_task_add(repo, &admin(repo), "Check brood".into(), TaskKind::InspectHive, vec![3, 99, 4], None, true);
        assert_eq!(ids, vec![6, 7]);

        let task = repo.task(6).unwrap();
        assert_eq!(task.hive_id, 3);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_to.is_none());
        assert_eq!(repo.task(7).unwrap().hive_id, 4);
    });
}

#[test]
fn test_add_task_with_bad_input() {
    with_test_repo(|repo, _| {
        let a = admin(repo);
        assert!(cmd_task_add(repo, &a, "x".into(), TaskKind::Other, vec![42], None, true).is_empty());
        assert!(cmd_task_add(repo, &a, "x".into(), TaskKind::Other, vec![1], Some("next week".into()), true).is_empty());
        assert_eq!(repo.tasks().len(), 5);

        let ids = cmd_task_add(repo, &a, "x".into(), TaskKind::Other, vec![1], Some("2001-01-01".into()), true);
        assert_eq!(repo.task(ids[0]).unwrap().status, TaskStatus::Overdue);
    });
}

#[test]
fn test_employee_cannot_administer() {
    with_test_repo(|repo, audit| {
        let e = employee(repo);
        assert!(cmd_task_add(repo, &e, "x".into(), TaskKind::Other, vec![1], None, true).is_empty());
        assert!(cmd_task_assign(repo, &e, 1, 2, true).is_none());
        assert!(cmd_user_add(repo, &e, "Eve".into(), "eve@example.com".into(), "pw".into(), Role::Admin, true).is_none());
        cmd_hive_add(repo, &e, Hive::new(11, true, false, false, 50.0), true);
        cmd_user_remove(repo, &e, 1, true);

        assert_eq!(repo.tasks().len(), 5);
        assert_eq!(repo.users().len(), 2);
        assert!(repo.hive(11).is_none());
        assert!(audit.contains("User 2 (Employee User): Denied - create tasks"));
    });
}

#[test]
fn test_hive_add_and_edit() {
    with_test_repo(|repo, _| {
        let a = admin(repo);
        cmd_hive_add(repo, &a, Hive::new(11, true, false, false, 50.0), true);
        cmd_hive_add(repo, &a, Hive::new(11, false, true, true, 1.0), true);
        assert_eq!(repo.hive(11), Some(Hive::new(11, true, false, false, 50.0)));

        cmd_hive_edit(repo, &employee(repo), 11, None, Some(true), None, Some(12.0), true);
        let hive = repo.hive(11).unwrap();
        assert!(hive.healthy && hive.needs_attention);
        assert!(hive.is_low_on_honey());
    });
}

#[test]
fn test_assign_and_conflict() {
    with_test_repo(|repo, _| {
        let a = admin(repo);
        let ids = cmd_task_add(repo, &a, "Feed".into(), TaskKind::FeedHive, vec![5], None, true);
        let id = ids[0];

        assert_eq!(cmd_task_assign(repo, &a, id, 2, true), Some(Assignment::Assigned));
        assert_eq!(repo.task(id).unwrap().assigned_to, Some(2));
        assert!(employee(repo).assigned_tasks.contains(&id));

        // Already held by the employee.
        assert_eq!(cmd_task_assign(repo, &a, id, 1, true), Some(Assignment::Conflict { owner: 2 }));
        assert_eq!(repo.task(id).unwrap().assigned_to, Some(2));
        assert!(!admin(repo).assigned_tasks.contains(&id));

        assert!(cmd_task_assign(repo, &a, 999, 2, true).is_none());
        assert!(cmd_task_assign(repo, &a, id, 999, true).is_none());
    });
}

#[test]
fn test_complete_only_own_tasks() {
    with_test_repo(|repo, _| {
        let e = employee(repo);
        // Sample tasks 2 and 4 belong to the employee, 1 to the admin.
        assert_eq!(cmd_task_complete(repo, &e, vec![2, 1, 42, 4], true), 2);

        for id in [2, 4] {
            let task = repo.task(id).unwrap();
            assert_eq!(task.status, TaskStatus::Completed);
            assert!(task.assigned_to.is_none());
        }
        assert_eq!(repo.task(1).unwrap().status, TaskStatus::Pending);
        assert!(employee(repo).assigned_tasks.is_empty());
    });
}

#[test]
fn test_edit_to_completed_releases_assignee() {
    with_test_repo(|repo, _| {
        // Sample task 2 belongs to the employee.
        cmd_task_edit(repo, &admin(repo), 2, None, None, Some(TaskStatus::Completed), None, true);

        let task = repo.task(2).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.assigned_to, None);
        assert_eq!(employee(repo).assigned_tasks, vec![4]);
    });
}

#[test]
fn test_edit_task_fields() {
    with_test_repo(|repo, _| {
        let a = admin(repo);
        cmd_task_edit(repo, &a, 1, Some("Requeen".into()), Some(TaskKind::AcquireQueen), None, Some("2030-06-01".into()), true);
        let task = repo.task(1).unwrap();
        assert_eq!(task.description, "Requeen");
        assert_eq!(task.kind, TaskKind::AcquireQueen);
        assert_eq!(task.due.to_string(), "2030-06-01");
        assert_eq!(task.assigned_to, Some(1));

        cmd_task_edit(repo, &a, 1, Some("Ignored".into()), None, None, Some("soon".into()), true);
        assert_eq!(repo.task(1).unwrap().description, "Requeen");
        cmd_task_edit(repo, &employee(repo), 1, Some("Nope".into()), None, None, None, true);
        assert_eq!(repo.task(1).unwrap().description, "Requeen");
    });
}

#[test]
fn test_add_task_when_ids_run_out() {
    with_test_repo(|repo, _| {
        let today = repo.task(1).unwrap().created;
        repo.add_task(Task::new(u32::MAX, "Edge", TaskKind::Other, 1, today, today));

        let ids = cmd_task_add(repo, &admin(repo), "Feed".into(), TaskKind::FeedHive, vec![1, 2], None, true);
        assert!(ids.is_empty());
        assert_eq!(repo.tasks().len(), 6);
    });
}

#[test]
fn test_completed_task_can_be_reassigned() {
    with_test_repo(|repo, _| {
        assert_eq!(cmd_task_complete(repo, &employee(repo), vec![2], true), 1);
        assert_eq!(cmd_task_assign(repo, &admin(repo), 2, 1, true), Some(Assignment::Assigned));
    });
}

#[test]
fn test_user_add_and_remove() {
    with_test_repo(|repo, _| {
        let a = admin(repo);
        let id = cmd_user_add(repo, &a, "Nia".into(), "nia@example.com".into(), "pw".into(), Role::Employee, true).unwrap();
        assert_eq!(id, 3);
        assert!(cmd_user_add(repo, &a, "Nia again".into(), "nia@example.com".into(), "pw".into(), Role::Employee, true).is_none());
        assert!(cmd_login(repo, None, "nia@example.com", "pw", TIMEOUT, true).is_some());

        cmd_user_remove(repo, &a, id, true);
        assert!(repo.user(id).is_none());
    });
}

#[test]
fn test_report_submit_and_remove() {
    with_test_repo(|repo, audit| {
        let e = employee(repo);
        assert!(cmd_report_submit(repo, &e, "   ".into(), vec![], vec![], true).is_none());

        let id = cmd_report_submit(repo, &e, "Hive 3 is quiet".into(), vec![3, 77], vec![2, 88], true).unwrap();
        assert_eq!(id, 1);
        let report = repo.report(id).unwrap();
        assert_eq!(report.author_id, 2);
        assert_eq!(report.author_name, "Employee User");
        assert_eq!(report.related_hives, vec![3]);
        assert_eq!(report.related_tasks, vec![2]);
        assert_eq!(cmd_report_submit(repo, &e, "Again".into(), vec![], vec![], true), Some(2));

        cmd_report_remove(repo, &e, id, true);
        assert!(repo.report(id).is_some());
        cmd_report_remove(repo, &admin(repo), id, true);
        assert!(repo.report(id).is_none());
        assert!(audit.contains("User 1 (Admin User): Deleted report - Report ID: 1"));
    });
}

#[test]
fn test_reload_restores_saved_state() {
    with_test_repo(|repo, _| {
        cmd_task_complete(repo, &employee(repo), vec![2], true);
        cmd_reload(repo, true);
        assert_eq!(repo.task(2).unwrap().status, TaskStatus::Completed);
        assert_eq!(repo.users().len(), 2);
    });
}

#[test]
fn test_parse_due() {
    assert_eq!(parse_due("2025-03-09").unwrap().to_string(), "2025-03-09");
    assert!(matches!(parse_due("09/03/2025"), Err(Error::InvalidInput(_))));
}
