//! Outstanding child processes, keyed by the read end of their stdout pipe.
//!
//! A slot is filled when a child is spawned and cleared before its pipe is
//! closed, so a descriptor number reused by a later spawn can never resolve
//! to a stale pid.

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ProcessRegistry {
    pids: Mutex<HashMap<RawFd, u32>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<RawFd, u32>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.pids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `pid` as the owner of `fd`. Returns the pid previously held in
    /// the slot, which indicates a bookkeeping bug in the caller.
    pub fn register(&self, fd: RawFd, pid: u32) -> Option<u32> {
        let previous = self.slots().insert(fd, pid);
        if let Some(stale) = previous {
            warn!(fd, pid, stale, "registry slot was still occupied");
        }
        debug!(fd, pid, "registered child");
        previous
    }

    /// Clear the slot for `fd`, returning the pid it held.
    pub fn release(&self, fd: RawFd) -> Option<u32> {
        let pid = self.slots().remove(&fd);
        debug!(fd, ?pid, "released registry slot");
        pid
    }

    pub fn pid_for(&self, fd: RawFd) -> Option<u32> {
        self.slots().get(&fd).copied()
    }

    /// Number of children spawned but not yet closed.
    pub fn outstanding(&self) -> usize {
        self.slots().len()
    }

    /// SIGKILL every outstanding child. Slots are left in place; each owner
    /// still closes its descriptor and reaps its child.
    ///
    /// Returns how many signals were delivered.
    pub fn kill_all(&self) -> usize {
        let pids: Vec<u32> = self.slots().values().copied().collect();
        let mut delivered = 0;
        for pid in pids {
            // SAFETY: kill(2) has no memory-safety preconditions.
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
            if rc == 0 {
                delivered += 1;
            } else {
                let err = std::io::Error::last_os_error();
                warn!(pid, error = %err, "failed to kill outstanding child");
            }
        }
        debug!(delivered, "killed outstanding children");
        delivered
    }
}
