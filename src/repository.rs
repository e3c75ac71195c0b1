//! In-memory record store with write-through snapshot persistence.
//!
//! All four collections sit behind one reader-writer lock. Reads clone out
//! of it; every mutation holds the write lock until the snapshot has been
//! written, so no reader sees a half-applied change and no two mutations
//! interleave. Audit lines are emitted only after the lock is released.

use chrono::Duration;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit::AuditSink;
use crate::error::{Error, Result};
use crate::models::{today, Assignment, Hive, HiveId, Report, ReportId, Role, Snapshot, Task, TaskId, TaskKind, TaskStatus, User, UserId};
use crate::storage::SnapshotStore;

#[derive(Debug, Default)]
struct Collections {
    hives: BTreeMap<HiveId, Hive>,
    tasks: BTreeMap<TaskId, Task>,
    users: BTreeMap<UserId, User>,
    reports: BTreeMap<ReportId, Report>,
}

/// `max(existing ids) + 1`, or 1 when `map` is empty. `None` once the id
/// space is used up.
fn next_id<V>(map: &BTreeMap<u32, V>) -> Option<u32> {
    map.keys().next_back().map_or(Some(1), |max| max.checked_add(1))
}

impl Collections {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            hives: snapshot.hives.into_iter().map(|h| (h.id, h)).collect(),
            tasks: snapshot.tasks.into_iter().map(|t| (t.id, t)).collect(),
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            reports: snapshot.reports.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            hives: self.hives.values().cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            users: self.users.values().cloned().collect(),
            reports: self.reports.values().cloned().collect(),
        }
    }

    fn clear(&mut self) {
        self.hives.clear();
        self.tasks.clear();
        self.users.clear();
        self.reports.clear();
    }

    fn is_empty(&self) -> bool {
        self.hives.is_empty() && self.tasks.is_empty() && self.users.is_empty() && self.reports.is_empty()
    }

    fn summary(&self) -> String {
        format!(
            "Users: {}, Hives: {}, Tasks: {}, Reports: {}",
            self.users.len(),
            self.hives.len(),
            self.tasks.len(),
            self.reports.len()
        )
    }

    /// Settles a completed task: it loses its assignee and drops off the
    /// assignee's list.
    fn settle(&mut self, task: &mut Task) {
        if task.status != TaskStatus::Completed {
            return;
        }
        if let Some(owner) = task.assigned_to {
            match self.users.get_mut(&owner) {
                Some(user) => user.complete_task(task),
                None => task.assigned_to = None,
            }
        }
    }

    /// First-run data set: one admin, one employee, ten healthy hives and
    /// five inspection tasks split between the two users.
    fn sample() -> Self {
        let mut admin = User::new(1, "Admin User", "admin@example.com", "admin123", Role::Admin);
        let mut employee = User::new(2, "Employee User", "employee@example.com", "emp123", Role::Employee);

        let hives = (1..=10).map(|id| (id, Hive::new(id, true, false, false, 75.0))).collect();

        let created = today();
        let due = created + Duration::days(7);
        let mut tasks = BTreeMap::new();
        for id in 1..=5 {
            let mut task = Task::new(id, format!("Sample Task {}", id), TaskKind::InspectHive, (id % 10) + 1, created, due);
            let owner = if id % 2 == 1 { &mut admin } else { &mut employee };
            let _ = owner.assign_task(&mut task);
            tasks.insert(id, task);
        }

        let users = [(admin.id, admin), (employee.id, employee)].into_iter().collect();
        Self { hives, tasks, users, reports: BTreeMap::new() }
    }
}

/// The single source of truth for hives, tasks, users and reports.
pub struct Repository {
    state: RwLock<Collections>,
    store: SnapshotStore,
    audit: Arc<dyn AuditSink>,
}

impl Repository {
    /// Creates a repository and loads it synchronously.
    ///
    /// If no snapshot can be loaded, sample data is installed and saved.
    pub fn open(store: SnapshotStore, audit: Arc<dyn AuditSink>) -> Self {
        let repo = Self::empty(store, audit);
        repo.load_initial();
        repo.audit.system("Repository initialized");
        repo
    }

    /// Creates a repository with nothing loaded. Pair with
    /// [`Repository::load_initial`], usually on a background thread.
    pub fn empty(store: SnapshotStore, audit: Arc<dyn AuditSink>) -> Self {
        Self { state: RwLock::new(Collections::default()), store, audit }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    /// Startup load.
    ///
    /// The file is read without holding the repository lock. A missing,
    /// unreadable or locked snapshot falls back to sample data, which is
    /// saved right away.
    pub fn load_initial(&self) {
        match self.store.load() {
            Ok(Some(snapshot)) => {
                let summary = {
                    let mut state = self.state.write();
                    *state = Collections::from_snapshot(snapshot);
                    state.summary()
                };
                info!(path = %self.store.path().display(), %summary, "snapshot loaded");
                self.audit.system(&format!("Data loaded from file - {}", summary));
            }
            Ok(None) => {
                debug!(path = %self.store.path().display(), "no snapshot, seeding sample data");
                self.seed();
            }
            Err(e @ Error::Locked { .. }) => {
                warn!(error = %e, "could not read snapshot");
                if self.state.read().is_empty() {
                    self.seed();
                }
                self.audit.system("Could not acquire file lock for reading");
            }
            Err(e) => {
                warn!(error = %e, "could not read snapshot, seeding sample data");
                self.seed();
                self.audit.system(&format!("Error loading data from file, initialized with sample data: {}", e));
            }
        }
    }

    fn seed(&self) {
        self.mutate(|state| {
            *state = Collections::sample();
            ((), "Sample data initialized".to_string())
        });
    }

    /// Replaces memory with the on-disk snapshot.
    ///
    /// The collections are cleared first. If the snapshot is missing or
    /// cannot be read, the repository is left empty; sample data is never
    /// synthesized here.
    pub fn reload(&self) {
        let outcome = {
            let mut state = self.state.write();
            state.clear();
            match self.store.load() {
                Ok(Some(snapshot)) => {
                    *state = Collections::from_snapshot(snapshot);
                    Ok(Some(state.summary()))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        };
        match outcome {
            Ok(Some(summary)) => {
                debug!(%summary, "snapshot reloaded");
                self.audit.system(&format!("Data reloaded from file - {}", summary));
            }
            Ok(None) => {
                warn!(path = %self.store.path().display(), "snapshot missing on reload, repository is now empty");
                self.audit.system("Snapshot missing during reload");
            }
            Err(e @ Error::Locked { .. }) => {
                warn!(error = %e, "reload skipped");
                self.audit.system("Could not acquire file lock for reading during reload");
            }
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.audit.system(&format!("Error reloading data from file: {}", e));
            }
        }
    }

    /// Runs `action` under the write lock and saves the result before the
    /// lock is released. Save failures are logged, never returned.
    fn mutate<R>(&self, action: impl FnOnce(&mut Collections) -> (R, String)) -> R {
        let (out, message, saved) = {
            let mut state = self.state.write();
            let (out, message) = action(&mut state);
            let saved = self.store.save(&state.snapshot());
            (out, message, saved)
        };
        self.audit.system(&message);
        match saved {
            Ok(()) => self.audit.system("Data saved to file"),
            Err(e @ Error::Locked { .. }) => {
                warn!(error = %e, "snapshot not saved");
                self.audit.system("Could not acquire file lock for writing");
            }
            Err(e) => {
                warn!(error = %e, "snapshot not saved");
                self.audit.system(&format!("Error saving data to file: {}", e));
            }
        }
        out
    }

    // Hives

    pub fn hive(&self, id: HiveId) -> Option<Hive> {
        self.state.read().hives.get(&id).cloned()
    }

    pub fn hives(&self) -> Vec<Hive> {
        self.state.read().hives.values().cloned().collect()
    }

    pub fn add_hive(&self, hive: Hive) {
        self.mutate(|state| {
            let msg = format!("Hive added - ID: {}", hive.id);
            state.hives.insert(hive.id, hive);
            ((), msg)
        })
    }

    pub fn update_hive(&self, hive: Hive) {
        self.mutate(|state| {
            let msg = format!("Hive updated - ID: {}", hive.id);
            state.hives.insert(hive.id, hive);
            ((), msg)
        })
    }

    // Tasks

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.state.read().tasks.get(&id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().tasks.values().cloned().collect()
    }

    /// Inserts or replaces a task. A completed task is detached from its
    /// assignee in the same critical section.
    pub fn add_task(&self, mut task: Task) {
        self.mutate(|state| {
            state.settle(&mut task);
            let msg = format!("Task added - ID: {}, Description: {}", task.id, task.description);
            state.tasks.insert(task.id, task);
            ((), msg)
        })
    }

    /// Allocates the next task id and inserts the task built from it in one
    /// critical section.
    pub fn add_task_with(&self, build: impl FnOnce(TaskId) -> Task) -> Result<TaskId> {
        self.mutate(|state| match next_id(&state.tasks) {
            Some(id) => {
                let mut task = build(id);
                task.id = id;
                state.settle(&mut task);
                let msg = format!("Task added - ID: {}, Description: {}", id, task.description);
                state.tasks.insert(id, task);
                (Ok(id), msg)
            }
            None => (Err(Error::IdsExhausted("task")), "Task rejected - No task IDs left".to_string()),
        })
    }

    /// Replaces a task. See [`Repository::add_task`].
    pub fn update_task(&self, mut task: Task) {
        self.mutate(|state| {
            state.settle(&mut task);
            let msg = format!("Task updated - ID: {}", task.id);
            state.tasks.insert(task.id, task);
            ((), msg)
        })
    }

    /// Binds a task to a user, writing both in one critical section.
    ///
    /// Returns `None` if either record does not exist. A task held by someone
    /// else is left untouched and reported as a conflict.
    pub fn assign_task(&self, task_id: TaskId, user_id: UserId) -> Option<Assignment> {
        self.mutate(|state| {
            let Collections { tasks, users, .. } = state;
            match (tasks.get_mut(&task_id), users.get_mut(&user_id)) {
                (Some(task), Some(user)) => {
                    let outcome = user.assign_task(task);
                    let msg = match outcome {
                        Assignment::Assigned => format!("Task assigned - Task ID: {}, User ID: {}", task_id, user_id),
                        Assignment::Conflict { owner } => {
                            format!("Task assignment refused - Task ID: {} held by User ID: {}", task_id, owner)
                        }
                    };
                    (Some(outcome), msg)
                }
                _ => (None, format!("Task assignment skipped - Task ID: {}, User ID: {}", task_id, user_id)),
            }
        })
    }

    // Users

    pub fn user(&self, id: UserId) -> Option<User> {
        self.state.read().users.get(&id).cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.state.read().users.values().cloned().collect()
    }

    /// First user (in id order) whose email matches exactly.
    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.state.read().users.values().find(|u| u.email == email).cloned()
    }

    pub fn add_user(&self, user: User) {
        self.mutate(|state| {
            let msg = format!("User added - ID: {}, Name: {}", user.id, user.name);
            state.users.insert(user.id, user);
            ((), msg)
        })
    }

    /// Allocates the next user id and inserts the user built from it in one
    /// critical section.
    pub fn add_user_with(&self, build: impl FnOnce(UserId) -> User) -> Result<UserId> {
        self.mutate(|state| match next_id(&state.users) {
            Some(id) => {
                let mut user = build(id);
                user.id = id;
                let msg = format!("User added - ID: {}, Name: {}", id, user.name);
                state.users.insert(id, user);
                (Ok(id), msg)
            }
            None => (Err(Error::IdsExhausted("user")), "User rejected - No user IDs left".to_string()),
        })
    }

    pub fn update_user(&self, user: User) {
        self.mutate(|state| {
            let msg = format!("User updated - ID: {}", user.id);
            state.users.insert(user.id, user);
            ((), msg)
        })
    }

    /// Removes a user, returning it if it existed. The snapshot is saved
    /// either way.
    pub fn remove_user(&self, id: UserId) -> Option<User> {
        self.mutate(|state| (state.users.remove(&id), format!("User removed - ID: {}", id)))
    }

    // Reports

    pub fn report(&self, id: ReportId) -> Option<Report> {
        self.state.read().reports.get(&id).cloned()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.state.read().reports.values().cloned().collect()
    }

    pub fn add_report(&self, report: Report) {
        self.mutate(|state| {
            let msg = format!("Report added - ID: {}, User: {}", report.id, report.author_name);
            state.reports.insert(report.id, report);
            ((), msg)
        })
    }

    pub fn update_report(&self, report: Report) {
        self.mutate(|state| {
            let msg = format!("Report updated - ID: {}", report.id);
            state.reports.insert(report.id, report);
            ((), msg)
        })
    }

    pub fn remove_report(&self, id: ReportId) -> Option<Report> {
        self.mutate(|state| (state.reports.remove(&id), format!("Report removed - ID: {}", id)))
    }

    /// `max(existing ids) + 1`, or 1 when there are no reports.
    ///
    /// This only peeks: two callers may see the same value before either
    /// inserts. Use [`Repository::submit_report`] when that matters. Fails
    /// with [`Error::IdsExhausted`] once `ReportId::MAX` is taken.
    pub fn next_report_id(&self) -> Result<ReportId> {
        next_id(&self.state.read().reports).ok_or(Error::IdsExhausted("report"))
    }

    /// Allocates the next report id and inserts the report built from it in
    /// one critical section.
    pub fn submit_report(&self, build: impl FnOnce(ReportId) -> Report) -> Result<ReportId> {
        self.mutate(|state| match next_id(&state.reports) {
            Some(id) => {
                let mut report = build(id);
                report.id = id;
                let msg = format!("Report added - ID: {}, User: {}", id, report.author_name);
                state.reports.insert(id, report);
                (Ok(id), msg)
            }
            None => (Err(Error::IdsExhausted("report")), "Report rejected - No report IDs left".to_string()),
        })
    }

    /// Copy of the full state, as it would be written to disk.
    pub fn snapshot(&self) -> Snapshot {
        self.state.read().snapshot()
    }
}
