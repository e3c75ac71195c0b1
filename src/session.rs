//! Startup loading and login.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::User;
use crate::repository::Repository;

/// Tracks a snapshot load running on its own thread.
#[derive(Clone)]
pub struct LoadHandle {
    done: Arc<(Mutex<bool>, Condvar)>,
}

impl LoadHandle {
    /// Blocks until the load finishes or `timeout` elapses. Returns whether
    /// it finished.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.done;
        let mut finished = lock.lock();
        if !*finished {
            let _ = cvar.wait_while_for(&mut finished, |f| !*f, timeout);
        }
        *finished
    }

    pub fn is_finished(&self) -> bool {
        *self.done.0.lock()
    }
}

/// Starts [`Repository::load_initial`] on a separate thread and returns at
/// once.
pub fn start_background_load(repo: Arc<Repository>) -> LoadHandle {
    let done = Arc::new((Mutex::new(false), Condvar::new()));
    let signal = Arc::clone(&done);
    thread::spawn(move || {
        repo.load_initial();
        let (lock, cvar) = &*signal;
        *lock.lock() = true;
        cvar.notify_all();
        debug!("background load finished");
    });
    LoadHandle { done }
}

/// Checks credentials against the repository.
///
/// If a background load is still running, waits up to `timeout` for it and
/// then goes ahead with whatever data is resident.
pub fn authenticate(repo: &Repository, load: Option<&LoadHandle>, email: &str, password: &str, timeout: Duration) -> Option<User> {
    if let Some(load) = load {
        if !load.wait(timeout) {
            warn!(?timeout, "background load still running, authenticating against resident data");
        }
    }
    repo.user_by_email(email).filter(|u| u.authenticate(password))
}
