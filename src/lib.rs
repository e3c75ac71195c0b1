//! # hivekeep
//!
//! A file-backed record store for a beekeeping operation: hives, the tasks
//! done on them, the people doing the tasks, and the reports they file.
//!
//! * [`repository::Repository`] keeps all four collections behind one
//!   reader-writer lock and writes a full snapshot after every change.
//! * [`storage::SnapshotStore`] owns the snapshot file and its advisory lock.
//! * [`stats`] reduces hive and task collections into summary counts on a
//!   bounded worker pool.
//! * [`commands`] are the admin and employee workflows used by the CLI.

pub mod audit;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;
pub mod session;
pub mod stats;
pub mod storage;

pub use error::{Error, Result};
