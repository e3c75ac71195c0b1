use chrono::{Duration, NaiveDate};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use std::time::Duration as StdDuration;

use crate::error::{Error, Result};
use crate::models::{today, Assignment, Hive, HiveId, Report, ReportId, Role, Task, TaskId, TaskKind, TaskStatus, User, UserId};
use crate::repository::Repository;
use crate::session::{authenticate, LoadHandle};
use crate::stats::{hive_statistics, task_statistics};

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Parses a `YYYY-MM-DD` due date.
pub fn parse_due(due: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(due.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidInput(format!("due date '{}': {}. Use YYYY-MM-DD", due, e)))
}

/// True if `actor` holds the admin role. Otherwise reports the refusal.
fn require_admin(repo: &Repository, actor: &User, what: &str, silent: bool) -> bool {
    if actor.role == Role::Admin {
        return true;
    }
    if !silent { eprintln!("Only admins can {}.", what); }
    repo.audit().user(actor.id, &actor.name, &format!("Denied - {}", what));
    false
}

/// Logs a user in, waiting for a background load if one is still running.
pub fn cmd_login(repo: &Repository, load: Option<&LoadHandle>, email: &str, password: &str, timeout: StdDuration, silent: bool) -> Option<User> {
    match authenticate(repo, load, email, password, timeout) {
        Some(user) => {
            if !silent { println!("Login successful! Welcome, {} ({:?}).", user.name, user.role); }
            repo.audit().user(user.id, &user.name, &format!("Logged in as {:?}", user.role));
            Some(user)
        }
        None => {
            if !silent { eprintln!("Invalid email or password."); }
            repo.audit().system(&format!("Failed login attempt for {}", email));
            None
        }
    }
}

/// Lists all hives.
pub fn cmd_hive_list(repo: &Repository) {
    let hives = repo.hives();
    if hives.is_empty() {
        println!("No hives found.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![bold("ID"), bold("Healthy"), bold("Needs Attention"), bold("Queenless"), bold("Honey")]);
    for h in hives {
        let honey_color = if h.is_low_on_honey() { Color::Red } else { Color::Reset };
        table.add_row(vec![
            Cell::new(h.id),
            Cell::new(yes_no(h.healthy)).fg(if h.healthy { Color::Green } else { Color::Red }),
            Cell::new(yes_no(h.needs_attention)),
            Cell::new(yes_no(h.queenless)),
            Cell::new(format!("{:.1}%", h.honey_level)).fg(honey_color),
        ]);
    }
    println!("{table}");
}

/// Creates a hive. Refuses to overwrite an existing id.
pub fn cmd_hive_add(repo: &Repository, actor: &User, hive: Hive, silent: bool) {
    if !require_admin(repo, actor, "create hives", silent) {
        return;
    }
    let id = hive.id;
    if repo.hive(id).is_some() {
        if !silent { eprintln!("Hive with ID {} already exists.", id); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to create hive - Hive already exists, ID: {}", id));
        return;
    }
    let action = format!(
        "Created new hive - ID: {}, Healthy: {}, Needs Attention: {}, Queenless: {}, Honey Level: {}",
        id, hive.healthy, hive.needs_attention, hive.queenless, hive.honey_level
    );
    repo.add_hive(hive);
    if !silent { println!("Hive created (id = {})", id); }
    repo.audit().user(actor.id, &actor.name, &action);
}

/// Changes any subset of a hive's fields.
pub fn cmd_hive_edit(repo: &Repository, actor: &User, id: HiveId, healthy: Option<bool>, needs_attention: Option<bool>, queenless: Option<bool>, honey_level: Option<f64>, silent: bool) {
    let Some(mut hive) = repo.hive(id) else {
        if !silent { eprintln!("Hive {} not found.", id); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to edit hive - Hive not found, ID: {}", id));
        return;
    };
    if let Some(v) = healthy { hive.healthy = v; }
    if let Some(v) = needs_attention { hive.needs_attention = v; }
    if let Some(v) = queenless { hive.queenless = v; }
    if let Some(v) = honey_level { hive.honey_level = v; }
    repo.update_hive(hive);
    if !silent { println!("Hive {} updated.", id); }
    repo.audit().user(actor.id, &actor.name, &format!("Updated hive - Hive ID: {}", id));
}

fn status_cell(task: &Task) -> Cell {
    let color = match task.status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::Pending if task.is_overdue() => Color::Red,
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::Overdue => Color::Red,
    };
    Cell::new(format!("{:?}", task.status)).fg(color)
}

fn print_tasks(tasks: Vec<Task>) {
    let today = today();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            bold("ID"),
            bold("Description"),
            bold("Type"),
            bold("Hive"),
            bold("Due"),
            bold("Time Left"),
            bold("Assigned"),
            bold("Status"),
        ]);
    for t in tasks {
        let days_left = (t.due - today).num_days();
        let time_left = if days_left < 0 {
            format!("{}d overdue", days_left.abs())
        } else if days_left == 0 {
            "Today".to_string()
        } else {
            format!("{}d", days_left)
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.description),
            Cell::new(format!("{:?}", t.kind)),
            Cell::new(t.hive_id),
            Cell::new(t.due),
            Cell::new(time_left).fg(if t.is_overdue() { Color::Red } else { Color::Reset }),
            Cell::new(t.assigned_to.map_or_else(|| "-".to_string(), |u| u.to_string())),
            status_cell(&t),
        ]);
    }
    println!("{table}");
}

/// Lists tasks. Completed ones are hidden unless `all` is set.
pub fn cmd_task_list(repo: &Repository, all: bool) {
    let mut tasks = repo.tasks();
    if !all {
        tasks.retain(|t| t.status != TaskStatus::Completed);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    print_tasks(tasks);
}

/// Lists the tasks currently assigned to `actor`.
pub fn cmd_my_tasks(repo: &Repository, actor: &User) {
    let user = repo.user(actor.id).unwrap_or_else(|| actor.clone());
    let tasks: Vec<Task> = user.assigned_tasks.iter().filter_map(|id| repo.task(*id)).collect();
    if tasks.is_empty() {
        println!("You have no assigned tasks.");
        repo.audit().user(user.id, &user.name, "Viewed own tasks - No assigned tasks");
        return;
    }
    let count = tasks.len();
    print_tasks(tasks);
    repo.audit().user(user.id, &user.name, &format!("Viewed own tasks - Count: {}", count));
}

/// Creates one task per hive in `hives`, with consecutive ids.
///
/// Unknown hive ids are skipped. The due date defaults to a week from today.
pub fn cmd_task_add(repo: &Repository, actor: &User, description: String, kind: TaskKind, hives: Vec<HiveId>, due: Option<String>, silent: bool) -> Vec<TaskId> {
    if !require_admin(repo, actor, "create tasks", silent) {
        return Vec::new();
    }
    let created = today();
    let due = match due {
        Some(d) => match parse_due(&d) {
            Ok(d) => d,
            Err(e) => {
                if !silent { eprintln!("{}", e); }
                return Vec::new();
            }
        },
        None => created + Duration::days(7),
    };

    let valid: Vec<HiveId> = hives
        .into_iter()
        .filter(|id| {
            let found = repo.hive(*id).is_some();
            if !found && !silent { println!("Warning: Hive with ID {} not found, skipping...", id); }
            found
        })
        .collect();
    if valid.is_empty() {
        if !silent { eprintln!("No valid hive IDs provided. Task creation cancelled."); }
        return Vec::new();
    }

    let mut created_ids = Vec::new();
    for hive_id in valid {
        let id = match repo.add_task_with(|id| Task::new(id, description.clone(), kind, hive_id, created, due)) {
            Ok(id) => id,
            Err(e) => {
                if !silent { eprintln!("Task for hive {} not created: {}", hive_id, e); }
                break;
            }
        };
        if !silent { println!("Task added (id = {}) for hive {}", id, hive_id); }
        repo.audit().user(
            actor.id,
            &actor.name,
            &format!("Created new task - ID: {}, Description: {}, Type: {:?}, Hive ID: {}", id, description, kind, hive_id),
        );
        created_ids.push(id);
    }
    created_ids
}

/// Edits an existing task's details.
///
/// Setting the status to `Completed` also releases the task from its
/// assignee.
pub fn cmd_task_edit(repo: &Repository, actor: &User, id: TaskId, description: Option<String>, kind: Option<TaskKind>, status: Option<TaskStatus>, due: Option<String>, silent: bool) {
    if !require_admin(repo, actor, "edit tasks", silent) {
        return;
    }
    let Some(mut task) = repo.task(id) else {
        if !silent { eprintln!("Task {} not found.", id); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to edit task - Task not found, ID: {}", id));
        return;
    };
    if let Some(d) = due {
        match parse_due(&d) {
            Ok(date) => task.due = date,
            Err(e) => {
                if !silent { eprintln!("{}", e); }
                return;
            }
        }
    }
    if let Some(d) = description { task.description = d; }
    if let Some(k) = kind { task.kind = k; }
    if let Some(s) = status { task.status = s; }
    repo.update_task(task);
    if !silent { println!("Task {} updated.", id); }
    repo.audit().user(actor.id, &actor.name, &format!("Updated task - Task ID: {}", id));
}

/// Assigns a task to a user.
///
/// A task that already belongs to someone else is left alone with a warning.
pub fn cmd_task_assign(repo: &Repository, actor: &User, task_id: TaskId, user_id: UserId, silent: bool) -> Option<Assignment> {
    if !require_admin(repo, actor, "assign tasks", silent) {
        return None;
    }
    if repo.task(task_id).is_none() {
        if !silent { eprintln!("Task {} not found.", task_id); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to assign task - Task not found, ID: {}", task_id));
        return None;
    }
    if repo.user(user_id).is_none() {
        if !silent { eprintln!("User {} not found.", user_id); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to assign task - User not found, ID: {}", user_id));
        return None;
    }

    let outcome = repo.assign_task(task_id, user_id)?;
    match outcome {
        Assignment::Assigned => {
            if !silent { println!("Task {} assigned to user {}.", task_id, user_id); }
            repo.audit().user(actor.id, &actor.name, &format!("Assigned task - Task ID: {} to User ID: {}", task_id, user_id));
        }
        Assignment::Conflict { owner } => {
            if !silent { eprintln!("Warning: Task #{} is already assigned to another user ({}).", task_id, owner); }
            repo.audit().user(actor.id, &actor.name, &format!("Assignment rejected - Task ID: {} already held by User ID: {}", task_id, owner));
        }
    }
    Some(outcome)
}

/// Completes tasks on behalf of `actor`.
///
/// Ids that don't exist or aren't assigned to the actor are skipped.
/// Returns how many tasks were completed.
pub fn cmd_task_complete(repo: &Repository, actor: &User, ids: Vec<TaskId>, silent: bool) -> usize {
    let Some(user) = repo.user(actor.id) else {
        if !silent { eprintln!("User {} not found.", actor.id); }
        return 0;
    };
    let mut completed = 0;
    for id in ids {
        let Some(mut task) = repo.task(id) else {
            if !silent { println!("Warning: Task with ID {} not found, skipping...", id); }
            continue;
        };
        if task.assigned_to != Some(user.id) {
            if !silent { println!("Warning: Task {} is not assigned to you. Skipping...", id); }
            continue;
        }
        task.status = TaskStatus::Completed;
        repo.update_task(task);
        completed += 1;
        if !silent { println!("Task {} marked as completed.", id); }
        repo.audit().user(user.id, &user.name, &format!("Completed task - Task ID: {}", id));
    }
    if !silent { println!("Completed {} task(s).", completed); }
    completed
}

/// Lists all users.
pub fn cmd_user_list(repo: &Repository) {
    let users = repo.users();
    if users.is_empty() {
        println!("No users found.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![bold("ID"), bold("Name"), bold("Email"), bold("Role"), bold("Tasks")]);
    for u in users {
        table.add_row(vec![
            Cell::new(u.id),
            Cell::new(&u.name),
            Cell::new(&u.email),
            Cell::new(format!("{:?}", u.role)),
            Cell::new(u.assigned_tasks.len()),
        ]);
    }
    println!("{table}");
}

/// Creates a user with the next free id. Refuses a duplicate email.
pub fn cmd_user_add(repo: &Repository, actor: &User, name: String, email: String, password: String, role: Role, silent: bool) -> Option<UserId> {
    if !require_admin(repo, actor, "create users", silent) {
        return None;
    }
    if repo.user_by_email(&email).is_some() {
        if !silent { eprintln!("User with email {} already exists.", email); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to create user - Email already exists: {}", email));
        return None;
    }
    let id = match repo.add_user_with(|id| User::new(id, name.clone(), email.clone(), password, role)) {
        Ok(id) => id,
        Err(e) => {
            if !silent { eprintln!("User not created: {}", e); }
            return None;
        }
    };
    let action = format!("Created new user - ID: {}, Name: {}, Email: {}, Role: {:?}", id, name, email, role);
    if !silent { println!("User created (id = {})", id); }
    repo.audit().user(actor.id, &actor.name, &action);
    Some(id)
}

pub fn cmd_user_remove(repo: &Repository, actor: &User, id: UserId, silent: bool) {
    if !require_admin(repo, actor, "remove users", silent) {
        return;
    }
    if repo.user(id).is_none() {
        if !silent { eprintln!("User {} not found.", id); }
        return;
    }
    repo.remove_user(id);
    if !silent { println!("User {} removed.", id); }
    repo.audit().user(actor.id, &actor.name, &format!("Removed user - User ID: {}", id));
}

/// Lists every report, oldest id first.
pub fn cmd_report_list(repo: &Repository) {
    let reports = repo.reports();
    if reports.is_empty() {
        println!("No reports found.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![bold("ID"), bold("Author"), bold("Created"), bold("Content"), bold("Hives"), bold("Tasks")]);
    for r in reports {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.author_name),
            Cell::new(r.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&r.content),
            Cell::new(join_ids(&r.related_hives)),
            Cell::new(join_ids(&r.related_tasks)),
        ]);
    }
    println!("{table}");
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

/// Files a report written by `actor`.
///
/// Related ids that don't exist are dropped. The report id is allocated and
/// inserted atomically.
pub fn cmd_report_submit(repo: &Repository, actor: &User, content: String, hives: Vec<HiveId>, tasks: Vec<TaskId>, silent: bool) -> Option<ReportId> {
    let content = content.trim().to_string();
    if content.is_empty() {
        if !silent { eprintln!("Report content cannot be empty."); }
        repo.audit().user(actor.id, &actor.name, "Attempted to submit empty report");
        return None;
    }
    let hives: Vec<HiveId> = hives
        .into_iter()
        .filter(|id| {
            let found = repo.hive(*id).is_some();
            if !found && !silent { println!("Warning: Hive with ID {} not found, skipping...", id); }
            found
        })
        .collect();
    let tasks: Vec<TaskId> = tasks
        .into_iter()
        .filter(|id| {
            let found = repo.task(*id).is_some();
            if !found && !silent { println!("Warning: Task with ID {} not found, skipping...", id); }
            found
        })
        .collect();

    let action = format!("Submitted report - Content: {}, Related Hives: {:?}, Related Tasks: {:?}", content, hives, tasks);
    let id = match repo.submit_report(|id| Report::new(id, actor, content, hives, tasks)) {
        Ok(id) => id,
        Err(e) => {
            if !silent { eprintln!("Report not submitted: {}", e); }
            repo.audit().user(actor.id, &actor.name, &format!("Report submission failed - {}", e));
            return None;
        }
    };
    if !silent { println!("Report submitted (id = {})", id); }
    repo.audit().user(actor.id, &actor.name, &action);
    Some(id)
}

pub fn cmd_report_remove(repo: &Repository, actor: &User, id: ReportId, silent: bool) {
    if !require_admin(repo, actor, "delete reports", silent) {
        return;
    }
    if repo.remove_report(id).is_none() {
        if !silent { eprintln!("Report {} not found.", id); }
        repo.audit().user(actor.id, &actor.name, &format!("Attempted to delete report - Report not found, ID: {}", id));
        return;
    }
    if !silent { println!("Report {} removed.", id); }
    repo.audit().user(actor.id, &actor.name, &format!("Deleted report - Report ID: {}", id));
}

/// Prints hive statistics computed on `threads` workers.
pub fn cmd_stats_hives(repo: &Repository, threads: usize, grace: StdDuration) {
    let stats = hive_statistics(repo.hives(), threads, grace);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![bold("Metric"), bold("Hives")]);
    table.add_row(vec![Cell::new("Total"), Cell::new(stats.total)]);
    table.add_row(vec![Cell::new("Healthy"), Cell::new(stats.healthy).fg(Color::Green)]);
    table.add_row(vec![Cell::new("Needs attention"), Cell::new(stats.needs_attention).fg(Color::Yellow)]);
    table.add_row(vec![Cell::new("Queenless"), Cell::new(stats.queenless).fg(Color::Red)]);
    table.add_row(vec![Cell::new("Low honey (<20%)"), Cell::new(stats.low_honey).fg(Color::Red)]);
    println!("{table}");
}

/// Prints task statistics computed on `threads` workers.
pub fn cmd_stats_tasks(repo: &Repository, threads: usize, grace: StdDuration) {
    let stats = task_statistics(repo.tasks(), threads, grace);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![bold("Metric"), bold("Tasks")]);
    table.add_row(vec![Cell::new("Total"), Cell::new(stats.total)]);
    table.add_row(vec![Cell::new("Pending"), Cell::new(stats.pending).fg(Color::Yellow)]);
    table.add_row(vec![Cell::new("Completed"), Cell::new(stats.completed).fg(Color::Green)]);
    table.add_row(vec![Cell::new("Overdue"), Cell::new(stats.overdue).fg(Color::Red)]);
    println!("{table}");
}

/// Re-reads the snapshot from disk.
pub fn cmd_reload(repo: &Repository, silent: bool) {
    repo.reload();
    if !silent {
        println!(
            "Reloaded: {} hives, {} tasks, {} users, {} reports.",
            repo.hives().len(),
            repo.tasks().len(),
            repo.users().len(),
            repo.reports().len()
        );
    }
}
