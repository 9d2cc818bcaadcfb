// This file is part of stsh, a job-control shell.
// Copyright (C) 2026 The stsh authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Type definitions for job management.
//!
//! A [`JobTable`] owns every [`Job`] the shell has started and not yet
//! removed. A job is an ordered list of [`Process`] records that were launched
//! from one pipeline and share a process group. The job numbers shown to the
//! user are one-based indices into the table.
//!
//! Process states are changed only by applying [`ChildEvent`]s reaped by the
//! signal relay (see [`JobTable::update_process`]). The state of a job is
//! derived from its members every time it is [synchronized](JobTable::synchronize).

use slab::Slab;
use strum::Display;
use thiserror::Error;

pub mod fmt;

#[doc(no_inline)]
pub use nix::sys::wait::WaitStatus;
#[doc(no_inline)]
pub use nix::unistd::Pid;

use self::fmt::StatusLine;

/// State of a child process
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ProcessState {
    /// The process is running (or runnable).
    Running,
    /// The process has been stopped by a signal.
    Stopped,
    /// The process has exited or been killed. This state is final.
    Terminated,
}

impl ProcessState {
    /// Whether the process has not terminated
    #[must_use]
    pub const fn is_alive(self) -> bool {
        !matches!(self, ProcessState::Terminated)
    }
}

/// Child process state change reaped by the signal relay
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ChildEvent {
    /// Process ID of the child
    pub pid: Pid,
    /// New state of the child
    ///
    /// A continued child is reported as `Running`.
    pub state: ProcessState,
}

impl ChildEvent {
    /// Converts a wait status into a child event.
    ///
    /// Returns `None` for statuses that do not describe a state change of a
    /// child process (`StillAlive` and ptrace events).
    ///
    /// ```
    /// # use stsh_env::job::{ChildEvent, Pid, ProcessState, WaitStatus};
    /// let event = ChildEvent::from_wait_status(WaitStatus::Exited(Pid::from_raw(42), 0));
    /// assert_eq!(event, Some(ChildEvent {
    ///     pid: Pid::from_raw(42),
    ///     state: ProcessState::Terminated,
    /// }));
    /// assert_eq!(ChildEvent::from_wait_status(WaitStatus::StillAlive), None);
    /// ```
    #[must_use]
    pub fn from_wait_status(status: WaitStatus) -> Option<ChildEvent> {
        let (pid, state) = match status {
            WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _) => {
                (pid, ProcessState::Terminated)
            }
            WaitStatus::Stopped(pid, _) => (pid, ProcessState::Stopped),
            WaitStatus::Continued(pid) => (pid, ProcessState::Running),
            _ => return None,
        };
        Some(ChildEvent { pid, state })
    }
}

/// Record of a child process that belongs to a job
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Process {
    pid: Pid,
    command: String,
    state: ProcessState,
}

impl Process {
    /// Creates a running process record.
    #[must_use]
    pub fn new<C: Into<String>>(pid: Pid, command: C) -> Self {
        Process {
            pid,
            command: command.into(),
            state: ProcessState::Running,
        }
    }

    /// Process ID
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Name of the command the process was launched for
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Changes the state unless the process has already terminated.
    ///
    /// Returns whether the state actually changed.
    fn set_state(&mut self, state: ProcessState) -> bool {
        if !self.state.is_alive() || self.state == state {
            return false;
        }
        self.state = state;
        true
    }
}

/// State of a job
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum JobState {
    /// The job owns the terminal and the shell is waiting for it.
    Foreground,
    /// The job runs without blocking the shell.
    Background,
    /// Some members are stopped and none is running.
    Stopped,
}

/// Set of processes launched from one pipeline
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Job {
    processes: Vec<Process>,
    /// Designation set on admission and by built-ins
    foreground: bool,
    /// State included in the last status line (or the initial designation)
    reported: JobState,
}

impl Job {
    fn new(state: JobState) -> Self {
        Job {
            processes: Vec::new(),
            foreground: state == JobState::Foreground,
            reported: state,
        }
    }

    /// Member processes in launch order
    #[must_use]
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Returns the member at the given zero-based index.
    #[must_use]
    pub fn process(&self, index: usize) -> Option<&Process> {
        self.processes.get(index)
    }

    /// Process group ID shared by the members
    ///
    /// This is the process ID of the first member, or `None` if the job has no
    /// member yet.
    #[must_use]
    pub fn group_id(&self) -> Option<Pid> {
        self.processes.first().map(Process::pid)
    }

    /// Derived state of the job
    ///
    /// The job is `Stopped` if at least one member is stopped and none is
    /// running. Otherwise, the state is the Foreground/Background designation.
    #[must_use]
    pub fn state(&self) -> JobState {
        let mut any_stopped = false;
        for process in &self.processes {
            match process.state {
                ProcessState::Running => return self.designation(),
                ProcessState::Stopped => any_stopped = true,
                ProcessState::Terminated => (),
            }
        }
        if any_stopped {
            JobState::Stopped
        } else {
            self.designation()
        }
    }

    fn designation(&self) -> JobState {
        if self.foreground {
            JobState::Foreground
        } else {
            JobState::Background
        }
    }

    /// Whether the job has members and all of them have terminated
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.processes.is_empty() && self.processes.iter().all(|p| !p.state.is_alive())
    }

    /// Returns the member the shell should wait for when the job is in the
    /// foreground.
    ///
    /// This is the first running member, or the first stopped member if none
    /// is running.
    #[must_use]
    pub fn representative(&self) -> Option<&Process> {
        self.processes
            .iter()
            .find(|p| p.state == ProcessState::Running)
            .or_else(|| self.processes.iter().find(|p| p.state.is_alive()))
    }
}

/// Error in manipulating a [`JobTable`]
///
/// These errors indicate a broken internal invariant rather than a user
/// mistake.
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum Error {
    /// There is no job with the job number.
    #[error("no job numbered {0}")]
    NoSuchJob(usize),
    /// The process ID already belongs to a live process of a job.
    #[error("process {0} already belongs to job {1}")]
    DuplicateProcess(Pid, usize),
}

/// Collection of jobs
///
/// Job numbers are positive. A number is reused only after the job that had
/// it is removed.
#[derive(Clone, Debug, Default)]
pub struct JobTable {
    jobs: Slab<Job>,
}

impl JobTable {
    /// Creates an empty job table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job with no members and returns its job number.
    ///
    /// The job is designated as foreground if `state` is
    /// [`JobState::Foreground`] and background otherwise.
    pub fn add_job(&mut self, state: JobState) -> usize {
        self.jobs.insert(Job::new(state)) + 1
    }

    /// Appends a process to a job.
    ///
    /// A process ID may be recycled by the OS after a member has terminated,
    /// so only live processes are checked for duplicates.
    pub fn add_process(&mut self, job_number: usize, process: Process) -> Result<(), Error> {
        if let Some(owner) = self.find_by_pid(process.pid) {
            return Err(Error::DuplicateProcess(process.pid, owner));
        }
        let job = self
            .get_mut(job_number)
            .ok_or(Error::NoSuchJob(job_number))?;
        job.processes.push(process);
        Ok(())
    }

    /// Returns the job with the job number.
    #[must_use]
    pub fn get(&self, job_number: usize) -> Option<&Job> {
        self.jobs.get(job_number.checked_sub(1)?)
    }

    /// Returns the job with the job number for modification.
    pub fn get_mut(&mut self, job_number: usize) -> Option<&mut Job> {
        self.jobs.get_mut(job_number.checked_sub(1)?)
    }

    /// Returns the number of the job that has a live process with the process
    /// ID.
    #[must_use]
    pub fn find_by_pid(&self, pid: Pid) -> Option<usize> {
        self.iter().find_map(|(number, job)| {
            job.processes
                .iter()
                .any(|p| p.pid == pid && p.state.is_alive())
                .then_some(number)
        })
    }

    /// Whether any job has a live process with the process ID
    #[must_use]
    pub fn contains_process(&self, pid: Pid) -> bool {
        self.find_by_pid(pid).is_some()
    }

    /// Changes the Foreground/Background designation of a job.
    ///
    /// Passing `JobState::Stopped` designates the job as background. The
    /// derived state is not reported until the job is synchronized.
    pub fn set_state(&mut self, job_number: usize, state: JobState) -> Result<(), Error> {
        let job = self
            .get_mut(job_number)
            .ok_or(Error::NoSuchJob(job_number))?;
        job.foreground = state == JobState::Foreground;
        Ok(())
    }

    /// Applies a reaped state change to the live process with the process ID.
    ///
    /// Returns the number of the job that contains the process, or `None` if
    /// no live process has the ID. The caller should
    /// [synchronize](Self::synchronize) the returned job.
    pub fn update_process(&mut self, pid: Pid, state: ProcessState) -> Option<usize> {
        let job_number = self.find_by_pid(pid)?;
        let job = self.get_mut(job_number)?;
        let process = job
            .processes
            .iter_mut()
            .find(|p| p.pid == pid && p.state.is_alive())?;
        process.set_state(state);
        Some(job_number)
    }

    /// Recomputes the state of a job and removes it if it has finished.
    ///
    /// Returns a status line if the job has been removed or its derived state
    /// differs from the last reported state. A job that has no members is
    /// left untouched.
    pub fn synchronize(&mut self, job_number: usize) -> Option<StatusLine> {
        let job = self.get_mut(job_number)?;
        if job.is_finished() {
            self.jobs.remove(job_number - 1);
            return Some(StatusLine::Done { job_number });
        }
        if job.processes.is_empty() {
            return None;
        }
        let state = job.state();
        if state == job.reported {
            return None;
        }
        job.reported = state;
        Some(StatusLine::Changed { job_number, state })
    }

    /// Returns the number of the job currently designated foreground, if any.
    #[must_use]
    pub fn foreground_job(&self) -> Option<usize> {
        self.iter()
            .find(|(_, job)| job.state() == JobState::Foreground)
            .map(|(number, _)| number)
    }

    /// Returns an iterator over job numbers and jobs in ascending order of
    /// job numbers.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs.iter().map(|(index, job)| (index + 1, job))
    }

    /// Number of jobs in the table
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the table has no job
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
