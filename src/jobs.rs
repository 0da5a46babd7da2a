//! The job table: a fixed-origin array of job slots, slot 0 reserved for
//! whichever job currently owns the foreground. Every operation here
//! assumes the caller has already blocked SIGCHLD (see [`crate::signal_gate`])
//! — the table has no locking of its own.

use std::fmt;

/// Reserved foreground slot.
pub const FG: usize = 0;
/// Lowest background slot.
pub const BG: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Stopped,
    Finished,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub pid: libc::pid_t,
    pub state: ProcState,
    /// -1 until reaped; afterwards either the normal exit status or
    /// 128+signal for a signal death.
    pub exit_code: i32,
}

impl Process {
    fn new(pid: libc::pid_t) -> Self {
        Self { pid, state: ProcState::Running, exit_code: -1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Finished,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "running"),
            JobState::Stopped => write!(f, "stopped"),
            JobState::Finished => write!(f, "exited"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub pgid: libc::pid_t,
    pub processes: Vec<Process>,
    pub state: JobState,
    pub command: String,
}

impl Job {
    fn empty(pgid: libc::pid_t) -> Self {
        Self { pgid, processes: Vec::new(), state: JobState::Running, command: String::new() }
    }

    /// Recompute derived state from per-process observations (invariant 1).
    fn recompute_state(&mut self) {
        let any_running = self.processes.iter().any(|p| p.state == ProcState::Running);
        let any_stopped = self.processes.iter().any(|p| p.state == ProcState::Stopped);
        self.state = if any_running {
            JobState::Running
        } else if any_stopped {
            JobState::Stopped
        } else {
            JobState::Finished
        };
    }

    /// Exit code of the job: the last stage's exit code.
    pub fn exit_code(&self) -> i32 {
        self.processes.last().map(|p| p.exit_code).unwrap_or(-1)
    }
}

/// The job table. A free slot is represented by `None`; slot 0 is reserved
/// for the foreground job and is only ever briefly `Some` while a job is
/// actually in the foreground.
#[derive(Default)]
pub struct JobTable {
    slots: Vec<Option<Job>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self { slots: vec![None] }
    }

    pub fn get(&self, j: usize) -> Option<&Job> {
        self.slots.get(j).and_then(|s| s.as_ref())
    }

    fn get_mut(&mut self, j: usize) -> Option<&mut Job> {
        self.slots.get_mut(j).and_then(|s| s.as_mut())
    }

    /// Every currently occupied slot index, in ascending order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.is_some().then_some(i))
    }

    fn lowest_free_background_slot(&mut self) -> usize {
        for i in BG..self.slots.len() {
            if self.slots[i].is_none() {
                return i;
            }
        }
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// `addjob(pgid, bg)`: slot 0 if `bg` is false, else the lowest free
    /// slot >= 1, growing the table if none exists.
    pub fn addjob(&mut self, pgid: libc::pid_t, bg: bool) -> usize {
        let slot = if bg { self.lowest_free_background_slot() } else { FG };
        if slot == FG && self.slots.is_empty() {
            self.slots.push(None);
        }
        self.slots[slot] = Some(Job::empty(pgid));
        slot
    }

    /// Set a job's process-group id once the first forked child's pid is
    /// known (the pipeline builder addresses a job by pgid, which is only
    /// established after the first stage forks — `addjob` records 0 as a
    /// placeholder until then).
    pub fn set_pgid(&mut self, j: usize, pgid: libc::pid_t) {
        if let Some(job) = self.get_mut(j) {
            job.pgid = pgid;
        }
    }

    /// `addproc(j, pid, argv)`: append a process record and extend the
    /// job's command string.
    pub fn addproc(&mut self, j: usize, pid: libc::pid_t, argv: &[String]) {
        let Some(job) = self.get_mut(j) else { return };
        if job.command.is_empty() {
            job.command = argv.join(" ");
        } else {
            job.command.push_str(" | ");
            job.command.push_str(&argv.join(" "));
        }
        job.processes.push(Process::new(pid));
    }

    /// `jobstate(j)`: current state; if FINISHED, also returns the exit
    /// code and frees the slot.
    pub fn jobstate(&mut self, j: usize) -> Option<(JobState, Option<i32>)> {
        // Matches the reference implementation's quirk of deriving state
        // from the table rather than strictly the indexed slot; since every
        // caller here already has `j` in hand from a prior lookup, the
        // observable behavior is the same as indexing directly.
        let job = self.get(j)?;
        let state = job.state;
        if state == JobState::Finished {
            let code = job.exit_code();
            self.slots[j] = None;
            Some((state, Some(code)))
        } else {
            Some((state, None))
        }
    }

    /// `watchjobs(which)`: report each occupied background slot whose
    /// state matches `which` (or every slot when `which` is `None`,
    /// standing in for the ALL sentinel), then free finished slots.
    pub fn watchjobs(&mut self, which: Option<JobState>) {
        let mut finished = Vec::new();
        for j in BG..self.slots.len() {
            let Some(job) = &self.slots[j] else { continue };
            if which.is_some() && which != Some(job.state) {
                continue;
            }
            let description = match job.state {
                JobState::Running => "running".to_string(),
                JobState::Stopped => "stopped".to_string(),
                JobState::Finished => format!("exited, status={}", job.exit_code()),
            };
            println!("[{j}] {description} ({})", job.command);
            if job.state == JobState::Finished {
                finished.push(j);
            }
        }
        for j in finished {
            self.slots[j] = None;
        }
    }

    /// Highest-numbered non-FINISHED job, or `None`.
    pub fn highest_non_finished(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .rev()
            .find(|(_, s)| matches!(s, Some(job) if job.state != JobState::Finished))
            .map(|(i, _)| i)
    }

    /// Move the job at `j` into slot 0, vacating `j`. Used by `resumejob`
    /// when a background job is brought to the foreground.
    pub fn move_to_foreground(&mut self, j: usize) {
        if j == FG {
            return;
        }
        self.slots[FG] = self.slots[j].take();
    }

    /// Move whatever occupies slot 0 into a fresh background slot,
    /// returning the new slot index. Used when the foreground job stops.
    pub fn move_foreground_to_background(&mut self) -> Option<usize> {
        let job = self.slots[FG].take()?;
        let slot = self.lowest_free_background_slot();
        self.slots[slot] = Some(job);
        Some(slot)
    }

    pub fn pgid(&self, j: usize) -> Option<libc::pid_t> {
        self.get(j).map(|job| job.pgid)
    }

    /// `killjob(j)`: fails if the job is absent or finished; otherwise
    /// sends SIGTERM to the whole process group. Does not wait — the
    /// reaper observes the resulting termination.
    pub fn killjob(&mut self, j: usize) -> Result<(), &'static str> {
        let job = self.get(j).ok_or("no such job")?;
        if job.state == JobState::Finished {
            return Err("no such job");
        }
        let pgid = job.pgid;
        crate::sys::kill_group(pgid, libc::SIGTERM).map_err(|_| "no such job")
    }

    /// Apply a reaped status update to the process with the given pid,
    /// wherever it lives in the table, and recompute that job's derived
    /// state. Returns whether a matching process was found.
    pub fn apply_status(
        &mut self,
        pid: libc::pid_t,
        state: ProcState,
        exit_code: Option<i32>,
    ) -> bool {
        for slot in &mut self.slots {
            let Some(job) = slot else { continue };
            if let Some(proc) = job.processes.iter_mut().find(|p| p.pid == pid) {
                proc.state = state;
                if let Some(code) = exit_code {
                    proc.exit_code = code;
                }
                job.recompute_state();
                return true;
            }
        }
        false
    }
}
