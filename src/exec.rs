//! §4.8 External exec resolver: locates and `execve`s an external program.
//! Runs inside a forked child, so on failure it prints a diagnostic and
//! exits rather than returning to the caller.

use std::ffi::CString;

/// Attempt to exec `words[0]` with `words` as argv. Never returns on
/// success. On failure (the slashed path or every `PATH` entry tried failed
/// to `execve`), prints `<name>: <reason>` for the last attempt and exits
/// the calling process with 127.
pub fn exec_and_exit(words: &[String]) -> ! {
    let name = &words[0];
    let argv = build_argv(words);

    if name.contains('/') {
        try_exec(name, &argv);
        report_and_exit(name, 127);
    }

    let path = std::env::var("PATH").unwrap_or_default();
    for prefix in path.split(':') {
        if prefix.is_empty() {
            // Empty PATH components are skipped, never treated as ".".
            continue;
        }
        let candidate = format!("{prefix}/{name}");
        try_exec(&candidate, &argv);
    }

    report_and_exit(name, 127);
}

fn build_argv(words: &[String]) -> Vec<CString> {
    words.iter().map(|w| CString::new(w.as_str()).expect("argv word contains a nul byte")).collect()
}

/// Attempt one `execve`. Returns (rather than exiting) only on failure, so
/// the caller can try the next PATH entry.
fn try_exec(path: &str, argv: &[CString]) {
    let Ok(c_path) = CString::new(path) else { return };

    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    unsafe {
        libc::execv(c_path.as_ptr(), argv_ptrs.as_ptr());
    }
    // execv only returns on failure.
}

fn report_and_exit(name: &str, code: i32) -> ! {
    let err = std::io::Error::last_os_error();
    eprintln!("{name}: {err}");
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_argv_preserves_order() {
        let words = vec!["echo".to_string(), "hi".to_string()];
        let argv = build_argv(&words);
        assert_eq!(argv.len(), 2);
        assert_eq!(argv[0].to_str().unwrap(), "echo");
    }
}
