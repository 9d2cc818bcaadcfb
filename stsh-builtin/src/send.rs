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

//! Sending a signal to a single process
//!
//! This module implements the common part of the [`slay`](crate::slay),
//! [`halt`](crate::halt) and [`cont`](crate::cont) built-ins. They accept
//! either form of operands:
//!
//! ```sh
//! slay pid
//! slay job_number index
//! ```
//!
//! The first form names a process by its process ID, which must belong to a
//! live process of a job in the job table. The second form names the process
//! at the zero-based *index* in the job. The signal is sent only after both
//! operands have been validated against the job table, which is first brought
//! up to date with the state changes reaped so far. The change in the job's
//! state caused by the signal is reported when the process reacts to it.

use crate::Result;
use crate::common::process;
use std::ops::ControlFlow::Continue;
use stsh_env::Env;
use stsh_env::system::Signal;

/// Sends the signal to the process specified by the arguments.
pub fn send(env: &mut Env, args: &[String], signal: Signal, usage: &'static str) -> Result {
    let mut env = env.block_sigchld()?;
    env.apply_child_events();
    let pid = process(env.jobs(), args, usage)?;
    tracing::debug!(%pid, ?signal, "sending signal to process");
    env.system.kill(pid, signal)?;
    Ok(Continue(()))
}
