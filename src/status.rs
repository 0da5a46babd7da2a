//! Exit-code encoding shared by the reaper, the foreground monitor, and
//! `watchjobs`: a process that died from a signal reports `128 + signal`
//! rather than a raw exit code, so it can be told apart from a normal exit.

/// Decode a raw `waitpid` status into an exit code, or `None` if the status
/// does not represent a terminal state (i.e. the process stopped or
/// continued rather than exiting).
pub fn exit_code_from_wait_status(raw_status: libc::c_int) -> Option<i32> {
    if unsafe { libc::WIFEXITED(raw_status) } {
        return Some(unsafe { libc::WEXITSTATUS(raw_status) });
    }

    if unsafe { libc::WIFSIGNALED(raw_status) } {
        let signal = unsafe { libc::WTERMSIG(raw_status) };
        return Some(128 + signal);
    }

    None
}
