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

//! Fg built-in
//!
//! The **`fg`** built-in resumes a job in the foreground.
//!
//! # Synopsis
//!
//! ```sh
//! fg job_number
//! ```
//!
//! # Description
//!
//! The built-in sends `SIGCONT` to the process group of the job, designates
//! the job as foreground, and waits for it like a pipeline started in the
//! foreground: the wait ends when the job finishes or stops again. A job that
//! stops again is designated background.
//!
//! # Errors
//!
//! It is an error if the operand is missing or not the number of a job in the
//! job table. No signal is sent in that case. State changes reaped before the
//! built-in runs are applied first, so a job that has already finished is no
//! longer in the table.
//!
//! # Implementation notes
//!
//! This implementation sends `SIGCONT` even if the job is already running.

use crate::Result;
use crate::common::{Error, job_number};
use std::ops::ControlFlow::Continue;
use stsh_env::Env;
use stsh_env::job::{JobState, Pid};
use stsh_env::system::Signal;

const USAGE: &str = "usage: fg <job>";

/// Entry point of the fg built-in
pub fn main(env: &mut Env, args: &[String]) -> Result {
    let [arg] = args else {
        return Err(Error::Usage(USAGE));
    };
    let mut env = env.block_sigchld()?;
    env.apply_child_events();
    let job_number = job_number(env.jobs(), arg)?;
    let pgid = env
        .jobs()
        .get(job_number)
        .and_then(|job| job.group_id())
        .ok_or(Error::InvalidJobNumber)?;

    env.system
        .kill(Pid::from_raw(-pgid.as_raw()), Signal::SIGCONT)?;
    env.jobs_mut().set_state(job_number, JobState::Foreground)?;
    env.synchronize(job_number);
    env.wait_for_foreground(job_number);
    Ok(Continue(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{args, start_background, virtual_env};
    use stsh_env::job::ProcessState;
    use stsh_env::system::r#virtual::Wakeup;

    #[test]
    fn fg_waits_for_running_job() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_background(&mut env, &state, "sleep 100 &");
        state.borrow_mut().wakeups.push_back(Wakeup::Exit(pids[0]));

        assert_eq!(main(&mut env, &args(&["1"])), Ok(Continue(())));
        assert_eq!(env.jobs().get(job_number), None);
        let state = state.borrow();
        assert_eq!(state.kills, [(Pid::from_raw(-pids[0].as_raw()), Signal::SIGCONT)]);
        assert_eq!(state.stdout, "[1] Foreground\n[1] Done\n");
    }

    #[test]
    fn fg_resumes_stopped_job_and_waits_until_it_stops_again() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_background(&mut env, &state, "cat | sort &");
        assert_eq!(crate::halt::main(&mut env, &args(&["1", "0"])), Ok(Continue(())));
        assert_eq!(crate::halt::main(&mut env, &args(&["1", "1"])), Ok(Continue(())));
        env.reap().unwrap();
        assert_eq!(state.borrow().stdout, "[1] Stopped\n");

        state
            .borrow_mut()
            .wakeups
            .push_back(Wakeup::Signal(Signal::SIGTSTP));
        assert_eq!(main(&mut env, &args(&["1"])), Ok(Continue(())));

        let job = env.jobs().get(job_number).unwrap();
        assert_eq!(job.state(), JobState::Stopped);
        assert_eq!(env.jobs().foreground_job(), None);
        let state = state.borrow();
        assert_eq!(
            state.stdout,
            "[1] Stopped\n[1] Foreground\n[1] Stopped\n"
        );
        assert_eq!(
            state.kills.last(),
            Some(&(Pid::from_raw(-pids[0].as_raw()), Signal::SIGTSTP))
        );
    }

    #[test]
    fn fg_validates_before_sending() {
        let (mut env, state) = virtual_env();
        start_background(&mut env, &state, "sleep 100 &");
        assert_eq!(main(&mut env, &[]), Err(Error::Usage(USAGE)));
        assert_eq!(main(&mut env, &args(&["1", "2"])), Err(Error::Usage(USAGE)));
        assert_eq!(main(&mut env, &args(&["2"])), Err(Error::InvalidJobNumber));
        assert_eq!(
            main(&mut env, &args(&["one"])),
            Err(Error::NotANumber("one".to_string()))
        );
        assert!(state.borrow().kills.is_empty());
    }

    #[test]
    fn job_finished_before_fg_is_reported_not_continued() {
        let (mut env, state) = virtual_env();
        let (_, pids) = start_background(&mut env, &state, "true &");
        state.borrow_mut().change_state(pids[0], ProcessState::Terminated);

        assert_eq!(main(&mut env, &args(&["1"])), Err(Error::InvalidJobNumber));
        let state = state.borrow();
        assert!(state.kills.is_empty());
        assert_eq!(state.stdout, "[1] Done\n");
    }
}
