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

//! This crate defines the job control environment of stsh.
//!
//! The environment, [`Env`], consists of application-managed parts and
//! system-managed parts. The [job table](job::JobTable) is the main
//! application-managed part. System-managed parts are accessed through the
//! [`System`] trait. [`RealSystem`] provides an implementation for `System`
//! that interacts with the underlying system. [`VirtualSystem`] is a dummy for
//! simulating the system's behavior without affecting the actual system.
//!
//! # Signal relay and `SIGCHLD` blocking
//!
//! The state of child processes changes asynchronously. The real system
//! catches `SIGCHLD` and reaps children in the signal handler, queuing the
//! resulting [`ChildEvent`](job::ChildEvent)s. The queued events are applied
//! to the job table by [`SigchldBlock::apply_child_events`].
//!
//! The job table must never be modified while the handler may run, so mutable
//! access to it is only available through a [`SigchldBlock`], a guard that
//! blocks `SIGCHLD` while it is alive. Get one with [`Env::block_sigchld`].

pub mod input;
pub mod io;
pub mod job;
pub mod semantics;
mod sigchld;
pub mod system;

use self::io::Fd;
use self::job::{JobTable, Pid};
pub use self::sigchld::SigchldBlock;
use self::system::{Errno, Signal, SignalHandling};
#[doc(no_inline)]
pub use self::system::{RealSystem, System, VirtualSystem};

/// Signals whose handling the shell changes for job control
///
/// A child process resets these signals to the default handling before
/// executing a utility.
pub const JOB_CONTROL_SIGNALS: [Signal; 6] = [
    Signal::SIGCHLD,
    Signal::SIGINT,
    Signal::SIGTSTP,
    Signal::SIGQUIT,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// Whole job control environment
#[derive(Debug)]
pub struct Env {
    /// Interface to the system-managed parts of the environment
    pub system: Box<dyn System>,

    /// Jobs started by the shell and not yet removed
    jobs: JobTable,

    /// Whether the shell prints prompts and manages the terminal
    pub interactive: bool,

    /// Process group the shell belongs to
    ///
    /// The terminal is given back to this group when a foreground job stops
    /// or finishes.
    pub shell_pgid: Pid,

    /// Terminal whose foreground process group the shell manages
    ///
    /// This is `Some` only in an interactive shell whose standard input is a
    /// terminal.
    pub tty: Option<Fd>,
}

impl Env {
    /// Creates a new environment with the given system.
    ///
    /// The environment is non-interactive and has no jobs.
    #[must_use]
    pub fn with_system(system: Box<dyn System>) -> Env {
        let shell_pgid = system.getpgrp();
        Env {
            system,
            jobs: JobTable::new(),
            interactive: false,
            shell_pgid,
            tty: None,
        }
    }

    /// Returns the job table.
    ///
    /// Use [`SigchldBlock::jobs_mut`] to modify it.
    #[must_use]
    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Turns the interactive mode on or off.
    ///
    /// In the interactive mode, the shell hands the terminal to foreground
    /// jobs if the standard input is a terminal.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
        self.tty = (interactive && self.system.isatty(Fd::STDIN)).then_some(Fd::STDIN);
    }

    /// Installs the signal relay.
    ///
    /// `SIGCHLD`, `SIGINT`, `SIGTSTP` and `SIGQUIT` are caught. `SIGTTIN` and
    /// `SIGTTOU` are ignored so that the shell can take back the terminal while
    /// it is in the background.
    pub fn init_job_control(&mut self) -> Result<(), Errno> {
        for signal in JOB_CONTROL_SIGNALS {
            let handling = match signal {
                Signal::SIGTTIN | Signal::SIGTTOU => SignalHandling::Ignore,
                _ => SignalHandling::Catch,
            };
            self.system.sigaction(signal, handling)?;
        }
        tracing::debug!(shell_pgid = %self.shell_pgid, "installed job control signal handlers");
        Ok(())
    }

    /// Blocks `SIGCHLD` until the returned guard is dropped.
    pub fn block_sigchld(&mut self) -> Result<SigchldBlock<'_>, Errno> {
        SigchldBlock::new(self)
    }

    /// Applies the child events reaped since the last call and prints the
    /// resulting status lines.
    pub fn reap(&mut self) -> Result<(), Errno> {
        self.block_sigchld()?.apply_child_events();
        Ok(())
    }

    /// Prints a string to the standard output.
    pub fn print(&mut self, text: &str) -> Result<(), Errno> {
        self.system.write_all(Fd::STDOUT, text.as_bytes())
    }

    /// Prints a string to the standard error.
    ///
    /// Errors are ignored as there is nowhere else to report them.
    pub fn print_error(&mut self, text: &str) {
        let _ = self.system.write_all(Fd::STDERR, text.as_bytes());
    }
}
