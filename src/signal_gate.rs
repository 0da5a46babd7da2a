//! The shell's one concurrency primitive: blocking SIGCHLD around a
//! critical section. Every read or mutation of the job table happens with
//! SIGCHLD blocked, so the reaper's flag can only be observed (and cleared)
//! by the main thread in a window where the asynchronous handler cannot
//! itself be running concurrently with the check.

use std::io;
use std::mem::MaybeUninit;

/// Build a `sigset_t` containing just SIGCHLD.
fn sigchld_set() -> libc::sigset_t {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), libc::SIGCHLD);
        set.assume_init()
    }
}

/// Block SIGCHLD, returning the mask that was in effect before the call so
/// it can be restored later with [`restore`].
pub fn block() -> libc::sigset_t {
    let new_mask = sigchld_set();
    let mut old_mask = MaybeUninit::<libc::sigset_t>::uninit();
    let rc = unsafe {
        libc::sigprocmask(libc::SIG_BLOCK, &new_mask, old_mask.as_mut_ptr())
    };
    if rc != 0 {
        abort_on_wrapper_failure("sigprocmask(SIG_BLOCK)", io::Error::last_os_error());
    }
    unsafe { old_mask.assume_init() }
}

/// Restore a signal mask previously returned by [`block`].
pub fn restore(mask: &libc::sigset_t) {
    let rc = unsafe { libc::sigprocmask(libc::SIG_SETMASK, mask, std::ptr::null_mut()) };
    if rc != 0 {
        abort_on_wrapper_failure("sigprocmask(SIG_SETMASK)", io::Error::last_os_error());
    }
}

/// Clear the process's entire blocked-signal mask. Used by a freshly
/// forked child before it execs or runs a builtin, so it does not inherit
/// the shell's SIGCHLD-blocked critical-section state.
pub fn unblock_all() {
    let empty = unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        set.assume_init()
    };
    let rc = unsafe { libc::sigprocmask(libc::SIG_SETMASK, &empty, std::ptr::null_mut()) };
    if rc != 0 {
        abort_on_wrapper_failure("sigprocmask(unblock_all)", io::Error::last_os_error());
    }
}

/// Atomically restore `mask` and suspend until a signal not blocked by it is
/// delivered. This is the only place the shell sleeps waiting for a
/// child-state change; the foreground monitor and the shutdown drain both
/// use it.
pub fn suspend(mask: &libc::sigset_t) {
    unsafe {
        libc::sigsuspend(mask);
    }
    // sigsuspend always returns -1/EINTR after running the interrupting
    // handler; that is the expected, not erroneous, outcome.
}

/// A guard that ignores a signal for its lifetime and restores the previous
/// disposition on drop. Used to suppress SIGTTOU around `tcsetpgrp`, which
/// would otherwise stop the shell itself if it is ever not already the
/// foreground process group.
pub struct IgnoreGuard {
    signal: libc::c_int,
    previous: libc::sighandler_t,
}

impl IgnoreGuard {
    pub fn new(signal: libc::c_int) -> io::Result<Self> {
        let previous = unsafe { libc::signal(signal, libc::SIG_IGN) };
        if previous == libc::SIG_ERR {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { signal, previous })
    }
}

impl Drop for IgnoreGuard {
    fn drop(&mut self) {
        unsafe {
            libc::signal(self.signal, self.previous);
        }
    }
}

/// Tier-1 wrapper failure per the error-handling design: a call whose
/// failure indicates a broken environment rather than a user-level
/// condition prints a diagnostic and aborts.
pub fn abort_on_wrapper_failure(call: &str, err: io::Error) -> ! {
    eprintln!("jcsh: {call}: {err}");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_then_restore_round_trips() {
        let old = block();
        restore(&old);
        // No assertion beyond "did not abort" — sigprocmask has no
        // observable Rust-level state to inspect here.
    }

    #[test]
    fn ignore_guard_restores_previous_disposition_on_drop() {
        unsafe {
            libc::signal(libc::SIGUSR1, libc::SIG_DFL);
        }
        {
            let _guard = IgnoreGuard::new(libc::SIGUSR1).unwrap();
        }
        // After the guard drops, a re-raised SIGUSR1 should once again use
        // SIG_DFL (terminate); we only check that installing a guard and
        // dropping it doesn't panic or abort, since asserting default
        // disposition would require actually receiving the signal.
    }
}
