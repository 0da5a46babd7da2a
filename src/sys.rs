//! The error-checking wrapper layer §1 assumes exists: thin wrappers
//! around system calls whose failure indicates a broken environment, not a
//! user-level condition. Each one prints a diagnostic and exits rather
//! than returning a `Result` the caller would have to handle, per §7
//! tier 1 — grounded in the original reference implementation's
//! `Fork`/`Kill`/`Pipe` wrappers.

use std::os::unix::io::RawFd;

use crate::signal_gate::abort_on_wrapper_failure;

pub fn fork() -> libc::pid_t {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        abort_on_wrapper_failure("fork", std::io::Error::last_os_error());
    }
    pid
}

pub fn pipe() -> (RawFd, RawFd) {
    let mut fds: [libc::c_int; 2] = [0; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        abort_on_wrapper_failure("pipe", std::io::Error::last_os_error());
    }
    (fds[0], fds[1])
}

pub fn dup2(old: RawFd, new: RawFd) {
    loop {
        let rc = unsafe { libc::dup2(old, new) };
        if rc >= 0 {
            return;
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        abort_on_wrapper_failure("dup2", err);
    }
}

pub fn close(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// `kill(-pgid, signal)`. Used by `resumejob`/`killjob` to address a whole
/// process group at once.
pub fn kill_group(pgid: libc::pid_t, signal: libc::c_int) -> std::io::Result<()> {
    loop {
        let rc = unsafe { libc::kill(-pgid, signal) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}

/// Restore default disposition for the job-control signals so a forked
/// child is affected by SIGTSTP/SIGTTIN/SIGTTOU/SIGINT like any other
/// process, undoing the shell's own ignore-them policy.
pub fn reset_job_control_signals_to_default() {
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
        libc::signal(libc::SIGTSTP, libc::SIG_DFL);
        libc::signal(libc::SIGTTIN, libc::SIG_DFL);
        libc::signal(libc::SIGTTOU, libc::SIG_DFL);
        libc::signal(libc::SIGCHLD, libc::SIG_DFL);
    }
}
