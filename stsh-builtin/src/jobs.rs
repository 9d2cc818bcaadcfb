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

//! Jobs built-in
//!
//! The **`jobs`** built-in lists the jobs in the job table.
//!
//! # Synopsis
//!
//! ```sh
//! jobs
//! ```
//!
//! # Standard output
//!
//! For each job in ascending order of job numbers, the built-in prints the job
//! number and the job state, followed by one line per member process with the
//! process ID, the process state and the command name:
//!
//! ```text
//! [1] Background
//!   24437 Running sleep
//! ```
//!
//! Before listing, the state changes reaped since the last prompt are applied
//! to the job table and reported, so the listing is up to date. Jobs that have
//! finished are reported as `Done` and not listed.

use crate::Result;
use crate::common::Error;
use std::ops::ControlFlow::Continue;
use stsh_env::Env;
use stsh_env::job::fmt::Report;

/// Entry point of the jobs built-in
pub fn main(env: &mut Env, args: &[String]) -> Result {
    if !args.is_empty() {
        return Err(Error::Usage("usage: jobs"));
    }
    let mut env = env.block_sigchld()?;
    env.apply_child_events();
    let listing: String = env
        .jobs()
        .iter()
        .map(|(job_number, job)| Report { job_number, job }.to_string())
        .collect();
    env.print(&listing)?;
    Ok(Continue(()))
}
