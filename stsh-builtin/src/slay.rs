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

//! Slay built-in
//!
//! The **`slay`** built-in kills a process with `SIGKILL`.
//!
//! # Synopsis
//!
//! ```sh
//! slay pid
//! slay job_number index
//! ```
//!
//! See the [`send`](crate::send) module for the operands.

use crate::Result;
use stsh_env::Env;
use stsh_env::system::Signal;

/// Entry point of the slay built-in
pub fn main(env: &mut Env, args: &[String]) -> Result {
    crate::send::send(env, args, Signal::SIGKILL, "usage: slay <pid> | slay <job> <index>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use crate::tests::{args, start_background, virtual_env};
    use stsh_env::job::ProcessState;
    use std::ops::ControlFlow::Continue;

    #[test]
    fn slay_by_job_and_index() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_background(&mut env, &state, "sleep 100 &");
        assert_eq!(main(&mut env, &args(&["1", "0"])), Ok(Continue(())));
        assert_eq!(state.borrow().kills, [(pids[0], Signal::SIGKILL)]);

        env.reap().unwrap();
        assert_eq!(env.jobs().get(job_number), None);
        assert_eq!(state.borrow().stdout, "[1] Done\n");
    }

    #[test]
    fn slay_by_pid_in_pipeline() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_background(&mut env, &state, "cat | sort &");
        assert_eq!(main(&mut env, &args(&[pids[1].to_string().as_str()])), Ok(Continue(())));
        env.reap().unwrap();
        let job = env.jobs().get(job_number).unwrap();
        assert!(job.processes()[0].state().is_alive());
        assert!(!job.processes()[1].state().is_alive());
    }

    #[test]
    fn invalid_operands_send_nothing() {
        let (mut env, state) = virtual_env();
        start_background(&mut env, &state, "sleep 100 &");
        let cases: [(&[&str], Error); 6] = [
            (&[], Error::Usage("usage: slay <pid> | slay <job> <index>")),
            (&["1", "2", "3"], Error::Usage("usage: slay <pid> | slay <job> <index>")),
            (&["2", "0"], Error::InvalidJobNumber),
            (&["1", "1"], Error::InvalidProcessIndex),
            (&["1", "x"], Error::NotANumber("x".to_string())),
            (&["4242"], Error::NoSuchProcess),
        ];
        for (operands, error) in cases {
            assert_eq!(main(&mut env, &args(operands)), Err(error));
        }
        assert!(state.borrow().kills.is_empty());
        assert!(env.jobs().get(1).is_some());
    }

    #[test]
    fn process_terminated_since_last_prompt_is_not_signalled() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_background(&mut env, &state, "cat | sort &");
        state.borrow_mut().change_state(pids[1], ProcessState::Terminated);

        let operand = pids[1].to_string();
        assert_eq!(main(&mut env, &args(&[operand.as_str()])), Err(Error::NoSuchProcess));
        assert_eq!(main(&mut env, &args(&["1", "1"])), Err(Error::InvalidProcessIndex));
        assert!(state.borrow().kills.is_empty());
        assert!(env.jobs().get(job_number).is_some());
    }
}
