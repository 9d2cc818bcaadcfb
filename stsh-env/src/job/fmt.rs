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

//! Formatting of job status messages
//!
//! The shell prints three kinds of messages about jobs:
//!
//! - An [`Admission`] line per process when a pipeline is started in the
//!   background: `[1] 24437`
//! - A [`StatusLine`] when the state of a job changes or the job is removed:
//!   `[1] Stopped`, `[1] Done`
//! - A [`Report`] for each job listed by the `jobs` built-in:
//!
//! ```text
//! [1] Background
//!   24437 Running sleep
//!   24438 Stopped cat
//! ```
//!
//! All of them are formatted with the `Display` trait and include the trailing
//! newline.

use super::{Job, JobState, Pid};
use std::fmt::{Display, Formatter, Result};

/// Message announcing a change of a job
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StatusLine {
    /// The derived state of the job has changed.
    Changed { job_number: usize, state: JobState },
    /// All members have terminated and the job has been removed.
    Done { job_number: usize },
}

impl Display for StatusLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            StatusLine::Changed { job_number, state } => writeln!(f, "[{job_number}] {state}"),
            StatusLine::Done { job_number } => writeln!(f, "[{job_number}] Done"),
        }
    }
}

/// Message printed for each process of a job started in the background
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Admission {
    pub job_number: usize,
    pub pid: Pid,
}

impl Display for Admission {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "[{}] {}", self.job_number, self.pid)
    }
}

/// Listing of a job and its member processes
///
/// ```
/// use stsh_env::job::{JobState, JobTable, Pid, Process};
/// use stsh_env::job::fmt::Report;
/// let mut jobs = JobTable::new();
/// let number = jobs.add_job(JobState::Background);
/// jobs.add_process(number, Process::new(Pid::from_raw(123), "sleep")).unwrap();
/// let report = Report { job_number: number, job: jobs.get(number).unwrap() };
/// assert_eq!(report.to_string(), "[1] Background\n  123 Running sleep\n");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Report<'a> {
    pub job_number: usize,
    pub job: &'a Job,
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "[{}] {}", self.job_number, self.job.state())?;
        for process in self.job.processes() {
            writeln!(
                f,
                "  {} {} {}",
                process.pid(),
                process.state(),
                process.command()
            )?;
        }
        Ok(())
    }
}
