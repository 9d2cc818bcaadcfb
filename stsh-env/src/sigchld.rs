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

//! Scoped blocking of `SIGCHLD`

use crate::Env;
use crate::job::fmt::StatusLine;
use crate::job::{JobState, JobTable, Pid};
use crate::system::{Errno, Foreground, SigSet, SigmaskHow, Signal};
use std::ops::{Deref, DerefMut};

/// Guard that keeps `SIGCHLD` blocked
///
/// While a `SigchldBlock` is alive, the signal relay cannot run, so the job
/// table can be modified consistently. Dropping the guard restores the signal
/// mask that was in effect when the guard was created; a `SIGCHLD` that
/// arrived in between is then handled.
///
/// The guard dereferences to the [`Env`] it was created from.
#[derive(Debug)]
#[must_use = "SIGCHLD is unblocked when the guard is dropped"]
pub struct SigchldBlock<'a> {
    env: &'a mut Env,
    old_mask: SigSet,
}

impl<'a> SigchldBlock<'a> {
    pub(crate) fn new(env: &'a mut Env) -> Result<Self, Errno> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        let old_mask = env.system.sigmask(SigmaskHow::SIG_BLOCK, &set)?;
        Ok(SigchldBlock { env, old_mask })
    }

    /// Signal mask that will be restored when the guard is dropped
    #[must_use]
    pub fn old_mask(&self) -> &SigSet {
        &self.old_mask
    }

    /// Returns the job table for modification.
    pub fn jobs_mut(&mut self) -> &mut JobTable {
        &mut self.env.jobs
    }

    fn report(&mut self, line: StatusLine) {
        if let Err(errno) = self.env.print(&line.to_string()) {
            tracing::warn!(%errno, "cannot print job status");
        }
    }

    /// Synchronizes a job and prints the status line if any.
    ///
    /// See [`JobTable::synchronize`].
    pub fn synchronize(&mut self, job_number: usize) {
        if let Some(line) = self.env.jobs.synchronize(job_number) {
            self.report(line);
        }
    }

    /// Applies the child events reaped by the signal relay to the job table.
    ///
    /// Each event updates one process, and the job containing the process is
    /// synchronized once per event. Events for processes not in the table are
    /// ignored.
    pub fn apply_child_events(&mut self) {
        for event in self.env.system.take_child_events() {
            tracing::trace!(pid = %event.pid, state = %event.state, "child event");
            if let Some(job_number) = self.env.jobs.update_process(event.pid, event.state) {
                self.synchronize(job_number);
            }
        }
    }

    /// Makes the process group the foreground process group of the terminal.
    ///
    /// Does nothing unless the shell manages a terminal.
    fn hand_terminal_to(&mut self, pgid: Pid) {
        if !self.env.interactive {
            return;
        }
        if let Some(tty) = self.env.tty {
            if let Err(errno) = self.env.system.tcsetpgrp(tty, pgid) {
                tracing::warn!(%errno, %pgid, "cannot change the terminal's foreground group");
            }
        }
    }

    /// Waits for a job in the foreground.
    ///
    /// The job is given the terminal and the shell sleeps in `sigsuspend`
    /// until the job's representative process stops or terminates. The wait
    /// continues with a new representative until the job has been removed from
    /// the table or has stopped. A job that stops is designated background. The
    /// terminal is given back to the shell before the function returns.
    ///
    /// If the job is already stopped when the wait starts (as after `fg`
    /// continues it), the wait does not end until the job is reported running
    /// and then stops again.
    pub fn wait_for_foreground(&mut self, job_number: usize) {
        let mut mask = self.old_mask;
        mask.remove(Signal::SIGCHLD);
        let mut woken = false;

        loop {
            self.apply_child_events();
            let Some(job) = self.env.jobs.get(job_number) else {
                break;
            };
            if woken && job.state() == JobState::Stopped {
                // The job exists, so this cannot fail.
                let _ = self.env.jobs.set_state(job_number, JobState::Background);
                break;
            }
            let (Some(process), Some(pgid)) = (job.representative(), job.group_id()) else {
                break;
            };
            let foreground = Foreground {
                pid: process.pid(),
                pgid,
            };

            tracing::debug!(job_number, pid = %foreground.pid, "waiting for foreground job");
            self.hand_terminal_to(pgid);
            self.env.system.set_foreground(Some(foreground));
            while self.env.system.foreground() == Some(foreground) {
                let _ = self.env.system.sigsuspend(&mask);
                self.apply_child_events();
            }
            woken = true;
        }

        self.env.system.set_foreground(None);
        let shell_pgid = self.env.shell_pgid;
        self.hand_terminal_to(shell_pgid);
    }
}

impl Deref for SigchldBlock<'_> {
    type Target = Env;
    fn deref(&self) -> &Env {
        self.env
    }
}

impl DerefMut for SigchldBlock<'_> {
    fn deref_mut(&mut self) -> &mut Env {
        self.env
    }
}

impl Drop for SigchldBlock<'_> {
    fn drop(&mut self) {
        if let Err(errno) = self
            .env
            .system
            .sigmask(SigmaskHow::SIG_SETMASK, &self.old_mask)
        {
            tracing::error!(%errno, "cannot restore the signal mask");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualSystem;
    use crate::job::{Process, ProcessState};
    use crate::system::r#virtual::{SystemState, Wakeup};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn virtual_env() -> (Env, Rc<RefCell<SystemState>>) {
        let system = VirtualSystem::new();
        let state = Rc::clone(&system.state);
        let mut env = Env::with_system(Box::new(system));
        env.init_job_control().unwrap();
        (env, state)
    }

    /// Forks `count` virtual children into one job and returns the job number
    /// and the pids.
    fn start_job(env: &mut Env, state: JobState, count: usize) -> (usize, Vec<Pid>) {
        let mut guard = env.block_sigchld().unwrap();
        let mut pids = Vec::new();
        for _ in 0..count {
            let child = match guard.system.fork() {
                Ok(nix::unistd::ForkResult::Parent { child }) => child,
                other => panic!("unexpected fork result: {other:?}"),
            };
            let leader = pids.first().copied().unwrap_or(child);
            guard.system.setpgid(child, leader).unwrap();
            pids.push(child);
        }
        let job_number = guard.jobs_mut().add_job(state);
        for &pid in &pids {
            guard
                .jobs_mut()
                .add_process(job_number, Process::new(pid, "cmd"))
                .unwrap();
        }
        (job_number, pids)
    }

    #[test]
    fn guard_blocks_and_restores_sigchld() {
        let (mut env, state) = virtual_env();
        {
            let guard = env.block_sigchld().unwrap();
            assert!(!guard.old_mask().contains(Signal::SIGCHLD));
            assert!(state.borrow().blocked.contains(Signal::SIGCHLD));
        }
        assert!(!state.borrow().blocked.contains(Signal::SIGCHLD));
    }

    #[test]
    fn nested_guard_keeps_sigchld_blocked() {
        let (mut env, state) = virtual_env();
        let mut outer = env.block_sigchld().unwrap();
        {
            let inner = outer.block_sigchld().unwrap();
            assert!(inner.old_mask().contains(Signal::SIGCHLD));
        }
        assert!(state.borrow().blocked.contains(Signal::SIGCHLD));
        drop(outer);
        assert!(!state.borrow().blocked.contains(Signal::SIGCHLD));
    }

    #[test]
    fn events_are_applied_once_and_finished_jobs_are_removed() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_job(&mut env, JobState::Background, 2);

        state.borrow_mut().change_state(pids[0], ProcessState::Terminated);
        env.reap().unwrap();
        assert_eq!(env.jobs().len(), 1);
        assert_eq!(state.borrow().stdout, "");

        state.borrow_mut().change_state(pids[1], ProcessState::Terminated);
        env.reap().unwrap();
        assert_eq!(env.jobs().get(job_number), None);
        assert_eq!(state.borrow().stdout, "[1] Done\n");

        env.reap().unwrap();
        assert_eq!(state.borrow().stdout, "[1] Done\n");
    }

    #[test]
    fn stopped_background_job_is_reported() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_job(&mut env, JobState::Background, 1);
        env.system.kill(pids[0], Signal::SIGSTOP).unwrap();
        env.reap().unwrap();
        assert_eq!(
            env.jobs().get(job_number).map(|job| job.state()),
            Some(JobState::Stopped)
        );
        assert_eq!(state.borrow().stdout, "[1] Stopped\n");
    }

    #[test]
    fn events_for_unknown_processes_are_ignored() {
        let (mut env, state) = virtual_env();
        let child = match env.system.fork() {
            Ok(nix::unistd::ForkResult::Parent { child }) => child,
            other => panic!("unexpected fork result: {other:?}"),
        };
        env.system.kill(child, Signal::SIGKILL).unwrap();
        env.reap().unwrap();
        assert!(env.jobs().is_empty());
        assert_eq!(state.borrow().stdout, "");
    }

    #[test]
    fn foreground_wait_returns_when_job_finishes() {
        let (mut env, state) = virtual_env();
        let (job_number, _) = start_job(&mut env, JobState::Foreground, 2);
        state.borrow_mut().wakeups.push_back(Wakeup::ExitAll);

        env.block_sigchld().unwrap().wait_for_foreground(job_number);
        assert!(env.jobs().is_empty());
        assert_eq!(env.system.foreground(), None);
        assert_eq!(state.borrow().stdout, "[1] Done\n");
    }

    #[test]
    fn foreground_wait_switches_to_next_running_member() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_job(&mut env, JobState::Foreground, 2);
        state.borrow_mut().wakeups.extend([
            Wakeup::Exit(pids[0]),
            Wakeup::Exit(pids[1]),
        ]);

        env.block_sigchld().unwrap().wait_for_foreground(job_number);
        assert!(env.jobs().is_empty());
        assert!(state.borrow().wakeups.is_empty());
    }

    #[test]
    fn stopped_foreground_job_is_demoted_to_background() {
        let (mut env, state) = virtual_env();
        let (job_number, pids) = start_job(&mut env, JobState::Foreground, 1);
        state.borrow_mut().wakeups.push_back(Wakeup::Stop(pids[0]));

        env.block_sigchld().unwrap().wait_for_foreground(job_number);
        let job = env.jobs().get(job_number).unwrap();
        assert_eq!(job.state(), JobState::Stopped);
        assert_eq!(state.borrow().stdout, "[1] Stopped\n");

        // Continuing the job makes it a background job.
        env.system.kill(pids[0], Signal::SIGCONT).unwrap();
        env.reap().unwrap();
        assert_eq!(
            env.jobs().get(job_number).map(|job| job.state()),
            Some(JobState::Background)
        );
        assert_eq!(state.borrow().stdout, "[1] Stopped\n[1] Background\n");
    }

    #[test]
    fn terminal_is_handed_over_and_taken_back() {
        let (mut env, state) = virtual_env();
        state.borrow_mut().tty = true;
        env.set_interactive(true);
        let (job_number, pids) = start_job(&mut env, JobState::Foreground, 1);
        state.borrow_mut().wakeups.push_back(Wakeup::Exit(pids[0]));

        env.block_sigchld().unwrap().wait_for_foreground(job_number);
        // The virtual system only remembers the last foreground group.
        assert_eq!(state.borrow().terminal_pgrp, env.shell_pgid);
    }
}
