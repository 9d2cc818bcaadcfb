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

//! Cont built-in
//!
//! The **`cont`** built-in continues a process with `SIGCONT`.
//!
//! # Synopsis
//!
//! ```sh
//! cont pid
//! cont job_number index
//! ```
//!
//! See the [`send`](crate::send) module for the operands. Unlike
//! [`bg`](crate::bg), this built-in resumes a single process and does not
//! change the Foreground/Background designation of the job.

use crate::Result;
use stsh_env::Env;
use stsh_env::system::Signal;

/// Entry point of the cont built-in
pub fn main(env: &mut Env, args: &[String]) -> Result {
    crate::send::send(env, args, Signal::SIGCONT, "usage: cont <pid> | cont <job> <index>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{args, start_background, virtual_env};
    use std::ops::ControlFlow::Continue;
    use stsh_env::job::JobState;

    #[test]
    fn continuing_stopped_process_resumes_job() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_background(&mut env, &state, "sleep 100 &");
        assert_eq!(crate::halt::main(&mut env, &args(&["1", "0"])), Ok(Continue(())));
        env.reap().unwrap();

        assert_eq!(main(&mut env, &args(&[pids[0].to_string().as_str()])), Ok(Continue(())));
        env.reap().unwrap();
        assert_eq!(
            env.jobs().get(job_number).unwrap().state(),
            JobState::Background
        );
        assert_eq!(state.borrow().stdout, "[1] Stopped\n[1] Background\n");
        assert_eq!(state.borrow().kills, [
            (pids[0], Signal::SIGSTOP),
            (pids[0], Signal::SIGCONT),
        ]);
    }
}
