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

//! Common items for implementing built-ins.

use std::str::FromStr;
use stsh_env::job::{self, JobTable, Pid};
use stsh_env::system::Errno;
use thiserror::Error;

/// Error in a built-in
///
/// All errors are detected before the built-in sends any signal, except
/// [`System`](Self::System) errors from sending the signal itself.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The built-in was invoked with a wrong number of arguments.
    #[error("{0}")]
    Usage(&'static str),
    /// An argument is not a non-negative decimal integer.
    #[error("{0}: not a valid number")]
    NotANumber(String),
    /// No job has the job number.
    #[error("invalid job number")]
    InvalidJobNumber,
    /// The job has no live process at the index.
    #[error("invalid process index")]
    InvalidProcessIndex,
    /// No job has a live process with the process ID.
    #[error("no such process")]
    NoSuchProcess,
    /// The job table rejected an operation.
    #[error("internal error: {0}")]
    Internal(#[from] job::Error),
    /// A system call failed.
    #[error("{}", .0.desc())]
    System(#[from] Errno),
}

/// Parses a decimal number.
fn parse<T: FromStr>(arg: &str) -> Result<T, Error> {
    if !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::NotANumber(arg.to_string()));
    }
    arg.parse().map_err(|_| Error::NotANumber(arg.to_string()))
}

/// Parses a job number and checks that the job exists.
pub fn job_number(jobs: &JobTable, arg: &str) -> Result<usize, Error> {
    let job_number = parse(arg)?;
    match jobs.get(job_number) {
        Some(_) => Ok(job_number),
        None => Err(Error::InvalidJobNumber),
    }
}

/// Resolves the arguments of a built-in that operates on a single process.
///
/// The arguments are either a process ID of a live process in a job, or a job
/// number and a zero-based index of a live process in the job.
pub fn process(jobs: &JobTable, args: &[String], usage: &'static str) -> Result<Pid, Error> {
    match args {
        [pid] => {
            let pid = Pid::from_raw(parse(pid)?);
            if jobs.contains_process(pid) {
                Ok(pid)
            } else {
                Err(Error::NoSuchProcess)
            }
        }
        [job, index] => {
            let job_number = job_number(jobs, job)?;
            let index: usize = parse(index)?;
            jobs.get(job_number)
                .and_then(|job| job.process(index))
                .filter(|process| process.state().is_alive())
                .map(|process| process.pid())
                .ok_or(Error::InvalidProcessIndex)
        }
        _ => Err(Error::Usage(usage)),
    }
}
