//! # hivekeep
//!
//! Command line front end for the beekeeping record store.
//!
//! ## Usage
//!
//! ```bash
//! # Log in (also warms the store from disk)
//! hivekeep --email admin@example.com --password admin123 login
//!
//! # Fleet overview, counted on 4 worker threads
//! hivekeep stats hives --threads 4
//! hivekeep stats tasks
//!
//! # Admin workflows
//! hivekeep -e admin@example.com -p admin123 task add "Check brood" --type inspect-hive --hives 3,4
//! hivekeep -e admin@example.com -p admin123 task assign 6 2
//!
//! # Employee workflows
//! hivekeep -e employee@example.com -p emp123 my-tasks
//! hivekeep -e employee@example.com -p emp123 task complete 2,4
//! hivekeep -e employee@example.com -p emp123 report submit "Hive 3 is quiet" --hives 3
//! ```
//!
//! ## Data Storage
//!
//! The snapshot lives in your local data directory
//! (`~/.local/share/hivekeep/beekeeping_data.json` on Linux), with
//! `activity_log.txt` next to it. Override with `--data-file` /
//! `HIVEKEEP_DATA` and `--audit-log` / `HIVEKEEP_AUDIT_LOG`.
//!
//! On first run the store is seeded with two users, ten hives and five tasks.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use hivekeep::audit::{AuditSink, FileAuditLog};
use hivekeep::commands::*;
use hivekeep::config::Config;
use hivekeep::models::{Hive, Role, TaskKind, TaskStatus, User};
use hivekeep::repository::Repository;
use hivekeep::session::start_background_load;
use hivekeep::storage::SnapshotStore;

#[derive(Parser)]
#[command(name = "hivekeep")]
#[command(about = "Beekeeping fleet record store", long_about = None)]
struct Cli {
    /// Snapshot file
    #[arg(long, global = true, env = "HIVEKEEP_DATA")]
    data_file: Option<PathBuf>,
    /// Audit log file
    #[arg(long, global = true, env = "HIVEKEEP_AUDIT_LOG")]
    audit_log: Option<PathBuf>,
    /// Email to log in with
    #[arg(short, long, global = true, env = "HIVEKEEP_EMAIL")]
    email: Option<String>,
    /// Password to log in with
    #[arg(short, long, global = true, env = "HIVEKEEP_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check credentials and print the user's role
    Login,
    /// Manage hives
    Hive {
        #[command(subcommand)]
        command: HiveCommands,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// List the tasks assigned to the logged-in user
    MyTasks,
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Summary counts
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// Re-read the snapshot from disk
    Reload,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
}

#[derive(Subcommand)]
enum HiveCommands {
    /// List hives
    List,
    /// Add a hive
    Add {
        id: u32,
        /// Mark the hive as unhealthy
        #[arg(long)]
        unhealthy: bool,
        #[arg(long)]
        needs_attention: bool,
        #[arg(long)]
        queenless: bool,
        /// Honey level in percent
        #[arg(short = 'H', long, default_value_t = 75.0)]
        honey: f64,
    },
    /// Edit a hive
    Edit {
        id: u32,
        #[arg(long)]
        healthy: Option<bool>,
        #[arg(long)]
        needs_attention: Option<bool>,
        #[arg(long)]
        queenless: Option<bool>,
        #[arg(short = 'H', long)]
        honey: Option<f64>,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        /// Show completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Create a task for each given hive
    Add {
        /// Task description (quoted if it has spaces)
        description: String,
        #[arg(short = 't', long = "type", value_enum, default_value = "other")]
        kind: TaskKind,
        /// Comma separated hive ids, e.g. 1,2,6
        #[arg(long, value_delimiter = ',', required = true)]
        hives: Vec<u32>,
        /// Due date in YYYY-MM-DD (defaults to a week from today)
        #[arg(short, long)]
        due: Option<String>,
    },
    /// Edit a task
    Edit {
        id: u32,
        #[arg(long)]
        description: Option<String>,
        #[arg(short = 't', long = "type", value_enum)]
        kind: Option<TaskKind>,
        #[arg(short, long, value_enum)]
        status: Option<TaskStatus>,
        #[arg(short, long)]
        due: Option<String>,
    },
    /// Assign a task to a user
    Assign {
        task: u32,
        user: u32,
    },
    /// Complete tasks assigned to you
    Complete {
        /// Comma separated task ids
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<u32>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Create a user
    Add {
        name: String,
        email: String,
        #[arg(long)]
        user_password: String,
        #[arg(short, long, value_enum, default_value = "employee")]
        role: Role,
    },
    /// Remove a user
    Remove {
        id: u32,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List reports
    List,
    /// Submit a report
    Submit {
        content: String,
        /// Related hive ids, comma separated
        #[arg(long, value_delimiter = ',')]
        hives: Vec<u32>,
        /// Related task ids, comma separated
        #[arg(long, value_delimiter = ',')]
        tasks: Vec<u32>,
    },
    /// Delete a report
    Remove {
        id: u32,
    },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Hive health counts
    Hives {
        #[arg(short, long)]
        threads: Option<usize>,
    },
    /// Task status counts
    Tasks {
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                return;
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "hivekeep", &mut io::stdout());
        return;
    }

    let mut config = match cli.data_file {
        Some(path) => Config::with_data_file(path),
        None => Config::from_env(),
    };
    if let Some(path) = cli.audit_log {
        config.audit_log = path;
    }

    let audit: Arc<dyn AuditSink> = Arc::new(FileAuditLog::new(&config.audit_log));
    let repo = Arc::new(Repository::empty(SnapshotStore::new(&config.data_file), audit));
    let load = start_background_load(Arc::clone(&repo));
    load.wait(config.load_grace);

    let actor: Option<User> = match (&cli.email, &cli.password) {
        (Some(email), Some(password)) => {
            let silent = !matches!(cli.command, Commands::Login);
            cmd_login(&repo, Some(&load), email, password, config.load_timeout, silent)
        }
        _ => {
            if !load.wait(config.load_timeout) {
                tracing::warn!("snapshot still loading, continuing with resident data");
            }
            None
        }
    };

    let need_actor = || {
        if actor.is_none() {
            eprintln!("Login required: pass --email and --password.");
        }
        actor.as_ref()
    };

    match cli.command {
        Commands::Login => {
            if cli.email.is_none() || cli.password.is_none() {
                need_actor();
            }
        }
        Commands::Hive { command } => match command {
            HiveCommands::List => cmd_hive_list(&repo),
            HiveCommands::Add { id, unhealthy, needs_attention, queenless, honey } => {
                if let Some(a) = need_actor() {
                    cmd_hive_add(&repo, a, Hive::new(id, !unhealthy, needs_attention, queenless, honey), false);
                }
            }
            HiveCommands::Edit { id, healthy, needs_attention, queenless, honey } => {
                if let Some(a) = need_actor() {
                    cmd_hive_edit(&repo, a, id, healthy, needs_attention, queenless, honey, false);
                }
            }
        },
        Commands::Task { command } => match command {
            TaskCommands::List { all } => cmd_task_list(&repo, all),
            TaskCommands::Add { description, kind, hives, due } => {
                if let Some(a) = need_actor() {
                    cmd_task_add(&repo, a, description, kind, hives, due, false);
                }
            }
            TaskCommands::Edit { id, description, kind, status, due } => {
                if let Some(a) = need_actor() {
                    cmd_task_edit(&repo, a, id, description, kind, status, due, false);
                }
            }
            TaskCommands::Assign { task, user } => {
                if let Some(a) = need_actor() {
                    let _ = cmd_task_assign(&repo, a, task, user, false);
                }
            }
            TaskCommands::Complete { ids } => {
                if let Some(a) = need_actor() {
                    cmd_task_complete(&repo, a, ids, false);
                }
            }
        },
        Commands::MyTasks => {
            if let Some(a) = need_actor() {
                cmd_my_tasks(&repo, a);
            }
        }
        Commands::User { command } => match command {
            UserCommands::List => cmd_user_list(&repo),
            UserCommands::Add { name, email, user_password, role } => {
                if let Some(a) = need_actor() {
                    cmd_user_add(&repo, a, name, email, user_password, role, false);
                }
            }
            UserCommands::Remove { id } => {
                if let Some(a) = need_actor() {
                    cmd_user_remove(&repo, a, id, false);
                }
            }
        },
        Commands::Report { command } => match command {
            ReportCommands::List => cmd_report_list(&repo),
            ReportCommands::Submit { content, hives, tasks } => {
                if let Some(a) = need_actor() {
                    cmd_report_submit(&repo, a, content, hives, tasks, false);
                }
            }
            ReportCommands::Remove { id } => {
                if let Some(a) = need_actor() {
                    cmd_report_remove(&repo, a, id, false);
                }
            }
        },
        Commands::Stats { command } => match command {
            StatsCommands::Hives { threads } => cmd_stats_hives(&repo, threads.unwrap_or(config.threads), config.pool_grace),
            StatsCommands::Tasks { threads } => cmd_stats_tasks(&repo, threads.unwrap_or(config.threads), config.pool_grace),
        },
        Commands::Reload => cmd_reload(&repo, false),
        Commands::Completions { .. } => {}
    }

    if let Some(a) = &actor {
        repo.audit().user(a.id, &a.name, "Logged out");
    }
}
