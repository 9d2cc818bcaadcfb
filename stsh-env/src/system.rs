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

//! API declarations for interacting with the underlying system
//!
//! All interactions between the shell and the operating system go through the
//! [`System`] trait. [`RealSystem`] is the implementation that talks to the
//! actual OS. [`VirtualSystem`] simulates child processes and signal delivery
//! in memory so that job control can be tested without forking.

pub mod real;
pub mod r#virtual;

use crate::io::Fd;
use crate::job::{ChildEvent, Pid};
use crate::semantics::ExitStatus;
use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::fmt::Debug;

#[doc(no_inline)]
pub use nix::errno::Errno;
#[doc(no_inline)]
pub use nix::sys::signal::{SigSet, SigmaskHow, Signal};
#[doc(no_inline)]
pub use nix::unistd::ForkResult;

pub use self::real::RealSystem;
pub use self::r#virtual::VirtualSystem;

/// Result type returned by system calls
pub type Result<T> = std::result::Result<T, Errno>;

/// How the shell responds to a signal
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SignalHandling {
    /// Performs the default action of the signal.
    #[default]
    Default,
    /// Ignores the signal.
    Ignore,
    /// Runs the shell's signal relay for the signal.
    Catch,
}

/// Mode of a file opened for a redirection
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OpenMode {
    /// Opens an existing file for reading.
    Read,
    /// Creates or truncates a file and opens it for writing.
    Truncate,
}

/// Process the shell is waiting for in the foreground
///
/// The marker is set by the foreground wait and cleared by the signal relay
/// when the process stops or terminates. While a marker is set, interrupt and
/// suspend requests typed at the terminal are forwarded to `pgid`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Foreground {
    /// Process whose state change ends the wait
    pub pid: Pid,
    /// Process group of the foreground job
    pub pgid: Pid,
}

/// API to the system-managed parts of the environment
///
/// Methods of this trait correspond to system calls. See the documentation of
/// [`RealSystem`] for the semantics of the real implementation.
pub trait System: Debug {
    /// Returns the process ID of the shell.
    fn getpid(&self) -> Pid;

    /// Returns the process group ID of the shell.
    fn getpgrp(&self) -> Pid;

    /// Tests whether the file descriptor refers to a terminal.
    fn isatty(&self, fd: Fd) -> bool;

    /// Reads bytes from the file descriptor.
    ///
    /// Returns the number of bytes read, which is 0 at the end of input.
    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize>;

    /// Writes bytes to the file descriptor.
    ///
    /// Returns the number of bytes written, which may be less than the length
    /// of the buffer.
    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize>;

    /// Writes all the bytes to the file descriptor.
    fn write_all(&mut self, fd: Fd, mut buffer: &[u8]) -> Result<()> {
        while !buffer.is_empty() {
            let count = self.write(fd, buffer)?;
            buffer = &buffer[count..];
        }
        Ok(())
    }

    /// Creates an unnamed pipe.
    ///
    /// Returns the reading end and the writing end, in this order.
    fn pipe(&mut self) -> Result<(Fd, Fd)>;

    /// Duplicates `from` onto `to`, closing `to` first if it is open.
    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd>;

    /// Opens a file for a redirection.
    fn open(&mut self, path: &CStr, mode: OpenMode) -> Result<Fd>;

    /// Closes a file descriptor.
    fn close(&mut self, fd: Fd) -> Result<()>;

    /// Changes the signal blocking mask and returns the previous mask.
    fn sigmask(&mut self, how: SigmaskHow, set: &SigSet) -> Result<SigSet>;

    /// Changes how a signal is handled and returns the previous handling.
    fn sigaction(&mut self, signal: Signal, handling: SignalHandling) -> Result<SignalHandling>;

    /// Replaces the signal mask with `mask` and sleeps until a signal is
    /// caught.
    ///
    /// The original mask is restored before the function returns. A return
    /// after a caught signal is reported as `Err(Errno::EINTR)`.
    fn sigsuspend(&mut self, mask: &SigSet) -> Result<()>;

    /// Sends a signal to a process, or to a process group if `target` is
    /// negative.
    fn kill(&mut self, target: Pid, signal: Signal) -> Result<()>;

    /// Moves a process into a process group.
    fn setpgid(&mut self, pid: Pid, pgid: Pid) -> Result<()>;

    /// Makes a process group the foreground process group of the terminal.
    fn tcsetpgrp(&mut self, fd: Fd, pgid: Pid) -> Result<()>;

    /// Creates a child process.
    fn fork(&mut self) -> Result<ForkResult>;

    /// Replaces the current process image with a utility found in `$PATH`.
    ///
    /// This function returns only on failure.
    fn execvp(&mut self, file: &CStr, args: &[CString]) -> Result<Infallible>;

    /// Terminates the current (child) process immediately.
    fn exit_child(&mut self, exit_status: ExitStatus) -> !;

    /// Removes and returns the child events reaped by the signal relay.
    ///
    /// The caller must block `SIGCHLD` while calling this function.
    fn take_child_events(&mut self) -> Vec<ChildEvent>;

    /// Returns the current foreground marker.
    fn foreground(&self) -> Option<Foreground>;

    /// Sets or clears the foreground marker.
    fn set_foreground(&mut self, foreground: Option<Foreground>);
}
