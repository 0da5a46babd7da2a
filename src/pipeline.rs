//! §4.6/§4.7: builds a single command or a multi-stage pipeline, forking
//! one child per stage into a shared process group and wiring pipes and
//! redirections across them.

use std::os::unix::io::RawFd;

use crate::builtins;
use crate::job_control::{self, MonitorOutcome, Terminal};
use crate::jobs::JobTable;
use crate::parser::Token;
use crate::redirect;
use crate::signal_gate;
use crate::{exec, sys};

/// Outcome of running a command or pipeline from the top-level evaluator.
pub enum RunOutcome {
    /// Foreground job finished (or there was no job at all, e.g. `cd`);
    /// carries the exit code to remember for `$?`-style bookkeeping.
    Finished(i32),
    /// A background job was started and announced; the prompt returns
    /// immediately.
    Backgrounded,
}

/// §4.7 single-command path: if the lone stage's first token is a
/// built-in, run it directly in the shell process — no fork, because
/// built-ins like `cd` must affect the shell itself.
pub fn run_single_or_pipeline(
    stages: &[&[Token]],
    background: bool,
    table: &mut JobTable,
    term: &Terminal,
) -> RunOutcome {
    if stages.len() == 1 {
        if let Some(Token::Word(name)) = stages[0].first() {
            if builtins::is_builtin(name) {
                let args = words_after_first(stages[0]);
                return match builtins::run(name, &args, table, term) {
                    Some(builtins::Outcome::Exit(code)) => {
                        // `quit`: caller (the evaluator) is responsible for
                        // actually exiting the process; surfacing it as a
                        // normal finish keeps this function infallible.
                        std::process::exit(code);
                    }
                    Some(builtins::Outcome::Code(code)) => RunOutcome::Finished(code),
                    None => unreachable!("is_builtin just confirmed this name is recognized"),
                };
            }
        }
    }

    run_pipeline(stages, background, table, term)
}

fn words_after_first(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .skip(1)
        .filter_map(|t| match t {
            Token::Word(w) => Some(w.clone()),
            _ => None,
        })
        .collect()
}

fn run_pipeline(stages: &[&[Token]], background: bool, table: &mut JobTable, term: &Terminal) -> RunOutcome {
    // Adding the job and appending each spawned process must happen with
    // SIGCHLD blocked, since the reaper may otherwise observe a partially
    // built job (§5 ordering guarantees). The mask captured here is the
    // shell's normal (SIGCHLD-unblocked) idle mask, and is what the
    // foreground monitor suspends on while waiting for the job to change
    // state.
    let mask = signal_gate::block();
    let slot = table.addjob(0, background);

    let mut pgid: Option<libc::pid_t> = None;
    let mut carry_input: Option<RawFd> = None;

    for (i, stage_tokens) in stages.iter().enumerate() {
        let is_last = i + 1 == stages.len();
        let resolved = redirect::resolve(stage_tokens).unwrap_or_else(|err| {
            eprintln!("jcsh: {err}");
            redirect::Resolved { words: Vec::new(), input_fd: None, output_fd: None }
        });

        let next_pipe = if is_last { None } else { Some(sys::pipe()) };

        let stage_input = resolved.input_fd.or(carry_input);
        let stage_output = resolved.output_fd.or(next_pipe.map(|(_, write)| write));

        if resolved.words.is_empty() {
            if let Some(fd) = stage_input {
                sys::close(fd);
            }
            if let Some((read, write)) = next_pipe {
                sys::close(read);
                sys::close(write);
            }
            continue;
        }

        let child_pid = sys::fork();
        if child_pid == 0 {
            run_child_stage(resolved.words, stage_input, stage_output, pgid, next_pipe, carry_input);
            unreachable!("run_child_stage never returns");
        }

        // Parent: join the pipeline's process group (race-safe duplicate
        // of the child's own call inside run_child_stage).
        let group = pgid.unwrap_or(child_pid);
        let _ = job_control::set_process_group(child_pid, group);
        if pgid.is_none() {
            table.set_pgid(slot, group);
        }
        pgid = Some(group);

        if let Some(fd) = resolved.input_fd {
            sys::close(fd);
        }
        if let Some(fd) = resolved.output_fd {
            sys::close(fd);
        }
        if let Some(fd) = carry_input {
            sys::close(fd);
        }
        if let Some((_, write)) = next_pipe {
            sys::close(write);
        }
        carry_input = next_pipe.map(|(read, _)| read);

        table.addproc(slot, child_pid, &resolved.words);
    }

    let outcome = if background {
        if let Some(job) = table.get(slot) {
            println!("[{slot}] running '{}'", job.command);
        }
        RunOutcome::Backgrounded
    } else {
        // run_foreground_monitor unblocks/reblocks SIGCHLD internally
        // around each sigsuspend; it returns with SIGCHLD blocked again.
        match job_control::run_foreground_monitor(term, table, &mask) {
            Ok(MonitorOutcome::Finished(code)) => RunOutcome::Finished(code),
            Ok(MonitorOutcome::Stopped(new_slot)) => {
                if let Some(job) = table.get(new_slot) {
                    println!("[{new_slot}] stopped ({})", job.command);
                }
                RunOutcome::Finished(-1)
            }
            Err(err) => crate::signal_gate::abort_on_wrapper_failure("tcsetpgrp", err),
        }
    };

    signal_gate::restore(&mask);
    outcome
}

/// Runs entirely inside the freshly forked child. Never returns.
fn run_child_stage(
    words: Vec<String>,
    stage_input: Option<RawFd>,
    stage_output: Option<RawFd>,
    pgid: Option<libc::pid_t>,
    next_pipe: Option<(RawFd, RawFd)>,
    carry_input: Option<RawFd>,
) -> ! {
    sys::reset_job_control_signals_to_default();
    crate::signal_gate::unblock_all();

    let self_pid = unsafe { libc::getpid() };
    let group = pgid.unwrap_or(self_pid);
    let _ = job_control::set_process_group(self_pid, group);

    if let Some(fd) = stage_input {
        sys::dup2(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = stage_output {
        sys::dup2(fd, libc::STDOUT_FILENO);
    }

    // Close every descriptor this child inherited but does not need,
    // including the far end of whatever pipe it is using and the upstream
    // read end it no longer owns once duplicated onto stdin/stdout. Several
    // of these may name the same fd (e.g. `stage_output` and the new
    // pipe's write end when there is no output-file redirection), so
    // dedupe before closing.
    let mut to_close: Vec<RawFd> = Vec::new();
    to_close.extend(carry_input);
    to_close.extend(stage_input);
    to_close.extend(stage_output);
    if let Some((read, write)) = next_pipe {
        to_close.push(read);
        to_close.push(write);
    }
    to_close.sort_unstable();
    to_close.dedup();
    for fd in to_close {
        sys::close(fd);
    }

    if builtins::is_builtin(&words[0]) {
        let mut scratch_table = JobTable::new();
        let scratch_term = Terminal::open();
        let code = match builtins::run(&words[0], &words[1..], &mut scratch_table, &scratch_term) {
            Some(builtins::Outcome::Exit(code)) => code,
            Some(builtins::Outcome::Code(code)) => code,
            None => 127,
        };
        std::process::exit(code);
    }

    exec::exec_and_exit(&words);
}
