//! The SIGCHLD handler and the table scan it defers to the main thread.
//!
//! The real `extern "C"` handler installed via `sigaction` does the one
//! thing that is actually async-signal-safe here: it preserves `errno`,
//! flips an `AtomicBool`, and restores `errno`. The non-blocking scan of
//! every live child — which allocates, formats strings, and mutates a
//! `Vec`-backed table — runs as an ordinary function on the main thread,
//! called with SIGCHLD already blocked, any time the pending flag might be
//! set and the table is about to be read.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::jobs::{JobTable, ProcState};
use crate::status;

static PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigchld(_signal: libc::c_int) {
    let saved_errno = unsafe { *libc::__errno_location() };
    PENDING.store(true, Ordering::SeqCst);
    unsafe { *libc::__errno_location() = saved_errno };
}

/// Install the handler once at startup. Must be called with SIGCHLD
/// unblocked in the installing thread's default mask.
pub fn install() -> std::io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_sigchld as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = libc::SA_RESTART;
        if libc::sigaction(libc::SIGCHLD, &action, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Drain the pending flag and, if it was set, perform the non-blocking
/// scan of every occupied slot's non-FINISHED processes. Call only with
/// SIGCHLD blocked.
pub fn reap(table: &mut JobTable) {
    if !PENDING.swap(false, Ordering::SeqCst) {
        return;
    }
    scan(table);
}

/// Unconditional scan, independent of the pending flag. Used by the
/// shutdown drain, which wants to reap whatever is available right now
/// regardless of whether a SIGCHLD has been observed since the last scan.
pub fn scan(table: &mut JobTable) {
    let occupied: Vec<usize> = table.occupied_slots().collect();
    let mut pids: Vec<libc::pid_t> = Vec::new();
    for j in occupied {
        if let Some(job) = table.get(j) {
            pids.extend(
                job.processes.iter().filter(|p| p.state != ProcState::Finished).map(|p| p.pid),
            );
        }
    }

    for pid in pids {
        let mut raw_status: libc::c_int = 0;
        let flags = libc::WNOHANG | libc::WUNTRACED | libc::WCONTINUED;
        let result = unsafe { libc::waitpid(pid, &mut raw_status, flags) };
        if result <= 0 {
            continue;
        }

        if unsafe { libc::WIFSTOPPED(raw_status) } {
            table.apply_status(pid, ProcState::Stopped, None);
        } else if unsafe { libc::WIFCONTINUED(raw_status) } {
            table.apply_status(pid, ProcState::Running, None);
        } else {
            let code = status::exit_code_from_wait_status(raw_status).unwrap_or(-1);
            table.apply_status(pid, ProcState::Finished, Some(code));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reap_is_a_no_op_when_nothing_pending() {
        let mut table = JobTable::new();
        let j = table.addjob(1, true);
        table.addproc(j, 999_999, &["x".to_string()]);
        reap(&mut table);
        assert_eq!(table.get(j).unwrap().processes[0].state, ProcState::Running);
    }

    #[test]
    fn scan_ignores_pids_with_no_status_change() {
        let mut table = JobTable::new();
        let j = table.addjob(1, true);
        // A pid that does not exist as our child: waitpid returns -1/ECHILD,
        // which the scan must tolerate rather than panic on.
        table.addproc(j, 999_999, &["x".to_string()]);
        scan(&mut table);
        assert_eq!(table.get(j).unwrap().processes[0].state, ProcState::Running);
    }
}
