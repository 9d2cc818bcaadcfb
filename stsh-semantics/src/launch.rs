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

//! Starting pipelines as jobs
//!
//! [`launch`] forks one child process per command of a pipeline. All the
//! children join one process group whose ID is the process ID of the first
//! child. `SIGCHLD` is blocked from before the first fork until the job has
//! been registered in the job table, so that no child event can be reaped
//! for a process the table does not know yet.
//!
//! A background job is announced with one [admission](stsh_env::job::fmt::Admission)
//! line per process. For a foreground job, `launch` returns after the job has
//! finished or stopped.

mod child;
mod pipe;

use self::child::StageRedirections;
use self::pipe::PipeSet;
use std::ffi::CString;
use stsh_env::Env;
use stsh_env::job::fmt::Admission;
use stsh_env::job::{self, JobState, Pid, Process};
use stsh_env::system::{Errno, ForkResult, Signal};
use stsh_syntax::syntax::{Command, Pipeline};
use thiserror::Error;

/// Error in [launching](launch) a pipeline
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The pipeline has no commands.
    #[error("empty pipeline")]
    EmptyPipeline,
    /// A command word or file name contains a null byte.
    #[error("{0}: argument contains a null byte")]
    NulByte(String),
    /// A pipe could not be created.
    #[error("cannot create a pipe: {}", .0.desc())]
    Pipe(Errno),
    /// A child process could not be created.
    #[error("cannot start a process: {}", .0.desc())]
    Fork(Errno),
    /// `SIGCHLD` could not be blocked.
    #[error("cannot block signals: {}", .0.desc())]
    Signal(Errno),
    /// The job table rejected the new job.
    #[error("internal error: {0}")]
    Internal(#[from] job::Error),
}

/// File name prepared for a redirection
#[derive(Debug)]
struct Path {
    c_string: CString,
    display: String,
}

impl Path {
    fn new(path: &str) -> Result<Self, Error> {
        let c_string = CString::new(path).map_err(|_| Error::NulByte(path.to_string()))?;
        Ok(Path {
            c_string,
            display: path.to_string(),
        })
    }
}

/// Command prepared for execution
///
/// Everything the child needs is converted before forking so that the child
/// does not fail halfway for a reason the parent could have detected.
#[derive(Debug)]
struct Stage {
    name: String,
    file: CString,
    args: Vec<CString>,
}

impl Stage {
    fn new(command: &Command) -> Result<Self, Error> {
        let args = command
            .words()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::NulByte(command.name.clone()))?;
        let file = args[0].clone();
        Ok(Stage {
            name: command.name.clone(),
            file,
            args,
        })
    }
}

/// Starts a pipeline as a new job.
///
/// Returns the job number assigned to the job. For a foreground pipeline, the
/// function returns when the job has finished (the job number is then no
/// longer in use) or stopped (the job is then a background job).
///
/// If a fork fails after some commands have been started, the processes
/// already started are killed and registered as a background job so that
/// they are reaped, and the error is returned.
pub fn launch(env: &mut Env, pipeline: &Pipeline) -> Result<usize, Error> {
    if pipeline.is_empty() {
        return Err(Error::EmptyPipeline);
    }
    let stages = pipeline
        .commands
        .iter()
        .map(Stage::new)
        .collect::<Result<Vec<_>, _>>()?;
    let input = pipeline.redirections.input.as_deref().map(Path::new).transpose()?;
    let output = pipeline.redirections.output.as_deref().map(Path::new).transpose()?;

    // A foreground job takes the terminal itself before it can read from it.
    let tty = env.tty.filter(|_| env.interactive && !pipeline.background);

    let mut env = env.block_sigchld().map_err(Error::Signal)?;
    let mut pipes = PipeSet::new();
    let mut pids = Vec::with_capacity(stages.len());
    let mut failure = None;

    for (index, stage) in stages.iter().enumerate() {
        let has_next = index + 1 < stages.len();
        if let Err(errno) = pipes.shift(&mut env, has_next) {
            failure = Some(Error::Pipe(errno));
            break;
        }

        let leader = pids.first().copied();
        match env.system.fork() {
            Ok(ForkResult::Child) => {
                let redirections = StageRedirections {
                    input: input.as_ref().filter(|_| index == 0),
                    output: output.as_ref().filter(|_| !has_next),
                };
                child::run(&mut env, stage, pipes, redirections, leader, tty)
            }
            Ok(ForkResult::Parent { child }) => {
                // The child may have exited or called setpgid itself already.
                let _ = env.system.setpgid(child, leader.unwrap_or(child));
                pids.push(child);
            }
            Err(errno) => {
                failure = Some(Error::Fork(errno));
                break;
            }
        }
    }
    pipes.close(&mut env);

    let Some(&leader) = pids.first() else {
        return Err(failure.unwrap_or(Error::EmptyPipeline));
    };
    if failure.is_some() {
        let _ = env.system.kill(Pid::from_raw(-leader.as_raw()), Signal::SIGKILL);
    }

    let state = if pipeline.background || failure.is_some() {
        JobState::Background
    } else {
        JobState::Foreground
    };
    let job_number = env.jobs_mut().add_job(state);
    for (&pid, stage) in pids.iter().zip(&stages) {
        env.jobs_mut()
            .add_process(job_number, Process::new(pid, stage.name.as_str()))?;
    }
    tracing::debug!(job_number, ?pids, %pipeline, "started job");

    if let Some(error) = failure {
        return Err(error);
    }
    match state {
        JobState::Foreground => env.wait_for_foreground(job_number),
        _ => {
            for &pid in &pids {
                let admission = Admission { job_number, pid };
                if let Err(errno) = env.print(&admission.to_string()) {
                    tracing::warn!(%errno, "cannot print job admission");
                }
            }
        }
    }
    Ok(job_number)
}
