use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type HiveId = u32;
pub type TaskId = u32;
pub type UserId = u32;
pub type ReportId = u32;

/// Honey level (percent) below which a hive is counted as low on honey.
pub const LOW_HONEY_THRESHOLD: f64 = 20.0;

/// A single beehive in the fleet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Hive {
    /// Caller-assigned unique identifier.
    pub id: HiveId,
    /// Whether the colony is healthy.
    pub healthy: bool,
    /// Whether someone should look at the hive soon.
    pub needs_attention: bool,
    /// Whether the colony has lost its queen.
    pub queenless: bool,
    /// Honey stores as a percentage. Expected to be 0-100, not enforced.
    pub honey_level: f64,
}

impl Hive {
    pub fn new(id: HiveId, healthy: bool, needs_attention: bool, queenless: bool, honey_level: f64) -> Self {
        Self { id, healthy, needs_attention, queenless, honey_level }
    }

    pub fn is_low_on_honey(&self) -> bool {
        self.honey_level < LOW_HONEY_THRESHOLD
    }
}

/// Lifecycle status of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskStatus {
    Pending,
    Completed,
    Overdue,
}

/// What kind of work a task represents.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskKind {
    InspectHive,
    FeedHive,
    AcquireQueen,
    Other,
}

/// A unit of work against a hive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: TaskId,
    /// Free-text description.
    pub description: String,
    /// Stored lifecycle status.
    pub status: TaskStatus,
    /// Type of work.
    pub kind: TaskKind,
    /// The hive this task concerns. Not checked against the hive collection.
    pub hive_id: HiveId,
    /// Date the task was created.
    pub created: NaiveDate,
    /// Date the task is due.
    pub due: NaiveDate,
    /// The user currently holding the task, if any.
    #[serde(default)]
    pub assigned_to: Option<UserId>,
}

impl Task {
    /// Creates an unassigned task.
    ///
    /// A task whose due date has already passed starts out as `Overdue`
    /// instead of `Pending`.
    pub fn new(id: TaskId, description: impl Into<String>, kind: TaskKind, hive_id: HiveId, created: NaiveDate, due: NaiveDate) -> Self {
        let status = if today() > due { TaskStatus::Overdue } else { TaskStatus::Pending };
        Self {
            id,
            description: description.into(),
            status,
            kind,
            hive_id,
            created,
            due,
            assigned_to: None,
        }
    }

    /// True if the due date is in the past and the task is not completed.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(today())
    }

    pub fn is_overdue_on(&self, day: NaiveDate) -> bool {
        day > self.due && self.status != TaskStatus::Completed
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    Admin,
    Employee,
}

/// Outcome of [`User::assign_task`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The task now belongs to the user (or already did).
    Assigned,
    /// The task is held by someone else; nothing was changed.
    Conflict { owner: UserId },
}

/// A person who can log in and work tasks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Secondary lookup key. Uniqueness is not enforced by the store.
    pub email: String,
    password: String,
    pub role: Role,
    /// Hives this user looks after. Informational only.
    #[serde(default)]
    pub managed_hives: Vec<HiveId>,
    /// Tasks currently assigned to this user.
    #[serde(default)]
    pub assigned_tasks: Vec<TaskId>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role,
            managed_hives: Vec::new(),
            assigned_tasks: Vec::new(),
        }
    }

    pub fn authenticate(&self, password: &str) -> bool {
        self.password == password
    }

    pub fn add_hive(&mut self, hive: HiveId) {
        self.managed_hives.push(hive);
    }

    /// Binds `task` to this user.
    ///
    /// A task already bound to a different user is left untouched and the
    /// conflict is reported back to the caller.
    pub fn assign_task(&mut self, task: &mut Task) -> Assignment {
        if let Some(owner) = task.assigned_to {
            if owner != self.id {
                return Assignment::Conflict { owner };
            }
        }
        task.assigned_to = Some(self.id);
        if !self.assigned_tasks.contains(&task.id) {
            self.assigned_tasks.push(task.id);
        }
        Assignment::Assigned
    }

    /// Marks `task` completed, drops it from this user's list and clears its
    /// assignment.
    pub fn complete_task(&mut self, task: &mut Task) {
        self.assigned_tasks.retain(|id| *id != task.id);
        task.status = TaskStatus::Completed;
        task.assigned_to = None;
    }
}

/// A free-text field report written by a user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub id: ReportId,
    pub author_id: UserId,
    /// Copy of the author's name at the time of writing.
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub related_hives: Vec<HiveId>,
    #[serde(default)]
    pub related_tasks: Vec<TaskId>,
    /// Local time the report was created.
    pub created_at: NaiveDateTime,
}

impl Report {
    pub fn new(id: ReportId, author: &User, content: impl Into<String>, related_hives: Vec<HiveId>, related_tasks: Vec<TaskId>) -> Self {
        Self {
            id,
            author_id: author.id,
            author_name: author.name.clone(),
            content: content.into(),
            related_hives,
            related_tasks,
            created_at: Local::now().naive_local(),
        }
    }
}

/// The full durable state: every collection, always written together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub hives: Vec<Hive>,
    pub tasks: Vec<Task>,
    pub users: Vec<User>,
    pub reports: Vec<Report>,
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
