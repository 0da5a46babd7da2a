mod builtins;
mod exec;
mod job_control;
mod jobs;
mod parser;
mod pipeline;
mod reaper;
mod redirect;
mod shell;
mod signal_gate;
mod status;
mod sys;

use std::io::{self, BufRead, Write};

use jobs::ProcState;
use shell::Shell;

const PROMPT: &str = "# ";

fn main() {
    // §6: stdin is expected to be a terminal; `Terminal::open` degrades
    // gracefully when it isn't (piped stdin, the integration tests below)
    // by treating every subsequent terminal-ownership transfer as a no-op
    // rather than asserting at startup.
    if let Err(err) = reaper::install() {
        eprintln!("jcsh: sigaction(SIGCHLD): {err}");
        std::process::exit(1);
    }

    // The shell itself is never stopped by its own terminal activity;
    // job-control signals are restored to default in every forked child
    // (see sys::reset_job_control_signals_to_default).
    unsafe {
        libc::signal(libc::SIGTSTP, libc::SIG_IGN);
        libc::signal(libc::SIGTTIN, libc::SIG_IGN);
        libc::signal(libc::SIGTTOU, libc::SIG_IGN);
    }

    ctrlc::set_handler(|| {
        println!();
        let _ = io::stdout().flush();
    })
    .expect("failed to install SIGINT handler");

    let mut shell = Shell::new();
    let stdin = io::stdin();
    let mut last_exit_code: i32 = 0;

    loop {
        print!("{PROMPT}");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF: exit 0 per §6.
            Ok(_) => {
                let trimmed = line.trim_end_matches('\n');
                if let Some(code) = shell.eval(trimmed) {
                    last_exit_code = code;
                }
                let mask = signal_gate::block();
                reaper::reap(&mut shell.table);
                shell.table.watchjobs(Some(jobs::JobState::Finished));
                signal_gate::restore(&mask);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                eprintln!("jcsh: {err}");
                break;
            }
        }
    }

    shutdown_drain(&mut shell.table);
    std::process::exit(last_exit_code);
}

/// Waits out every remaining child unconditionally, per the drain strategy
/// the specification's own design notes recommend over one-`sigsuspend`-
/// per-job: a single blocking `waitpid(-1, …, 0)` loop until no children
/// remain (`ECHILD`).
fn shutdown_drain(table: &mut jobs::JobTable) {
    let mask = signal_gate::block();
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, 0) };
        if pid <= 0 {
            break;
        }
        let code = status::exit_code_from_wait_status(raw_status).unwrap_or(-1);
        table.apply_status(pid, ProcState::Finished, Some(code));
    }
    for j in table.occupied_slots().collect::<Vec<_>>() {
        table.jobstate(j);
    }
    signal_gate::restore(&mask);
}
