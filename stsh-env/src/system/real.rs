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

//! Implementation of `System` that actually interacts with the system.

mod signal;

use super::{
    Errno, ForkResult, Foreground, OpenMode, Result, SigSet, SigmaskHow, Signal, SignalHandling,
    System,
};
use crate::io::Fd;
use crate::job::{ChildEvent, Pid};
use crate::semantics::ExitStatus;
use nix::sys::signal::{SaFlags, SigAction, SigHandler};
use std::convert::Infallible;
use std::ffi::{CStr, CString, c_int};

/// Calls the function until it returns something other than `EINTR`.
fn retry<T, F: FnMut() -> Result<T>>(mut f: F) -> Result<T> {
    loop {
        match f() {
            Err(Errno::EINTR) => (),
            result => return result,
        }
    }
}

/// Implementation of `System` that actually interacts with the system.
///
/// `RealSystem` is an empty `struct` because the underlying operating system
/// manages the system's internal state. The signal relay's event queue and the
/// foreground marker are process-wide statics shared by all instances.
#[derive(Debug)]
pub struct RealSystem(());

impl RealSystem {
    /// Returns an instance of `RealSystem`.
    ///
    /// # Safety
    ///
    /// This function is marked `unsafe` because improper use of `RealSystem`
    /// may lead to undefined behavior. Forking is only sound in a
    /// single-threaded process, and the signal relay assumes there is only one
    /// thread that blocks `SIGCHLD` to read its queue. You should never use
    /// `RealSystem` in a multi-threaded program, and it is your responsibility
    /// to make sure you are using only one instance of `RealSystem` in the
    /// process.
    pub unsafe fn new() -> Self {
        RealSystem(())
    }
}

impl System for RealSystem {
    fn getpid(&self) -> Pid {
        nix::unistd::getpid()
    }

    fn getpgrp(&self) -> Pid {
        nix::unistd::getpgrp()
    }

    fn isatty(&self, fd: Fd) -> bool {
        // SAFETY: isatty only inspects the file descriptor.
        (unsafe { libc::isatty(fd.0) }) == 1
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        retry(|| {
            // SAFETY: The pointer and length come from a valid slice.
            let count = unsafe { libc::read(fd.0, buffer.as_mut_ptr().cast(), buffer.len()) };
            Errno::result(count).map(|count| count as usize)
        })
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        retry(|| {
            // SAFETY: The pointer and length come from a valid slice.
            let count = unsafe { libc::write(fd.0, buffer.as_ptr().cast(), buffer.len()) };
            Errno::result(count).map(|count| count as usize)
        })
    }

    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        let mut fds = [0 as c_int; 2];
        // SAFETY: The array has room for the two file descriptors.
        Errno::result(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        Ok((Fd(fds[0]), Fd(fds[1])))
    }

    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        // SAFETY: dup2 only manipulates the file descriptor table.
        retry(|| Errno::result(unsafe { libc::dup2(from.0, to.0) }).map(Fd))
    }

    fn open(&mut self, path: &CStr, mode: OpenMode) -> Result<Fd> {
        let flags = match mode {
            OpenMode::Read => libc::O_RDONLY,
            OpenMode::Truncate => libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
        };
        let permissions: libc::c_uint = 0o666;
        retry(|| {
            // SAFETY: The path is a valid NUL-terminated string.
            Errno::result(unsafe { libc::open(path.as_ptr(), flags, permissions) }).map(Fd)
        })
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        // SAFETY: close only manipulates the file descriptor table.
        match Errno::result(unsafe { libc::close(fd.0) }) {
            Ok(_) | Err(Errno::EBADF) | Err(Errno::EINTR) => Ok(()),
            Err(errno) => Err(errno),
        }
    }

    fn sigmask(&mut self, how: SigmaskHow, set: &SigSet) -> Result<SigSet> {
        let mut old_set = SigSet::empty();
        nix::sys::signal::sigprocmask(how, Some(set), Some(&mut old_set))?;
        Ok(old_set)
    }

    fn sigaction(&mut self, signal: Signal, handling: SignalHandling) -> Result<SignalHandling> {
        let handler = match handling {
            SignalHandling::Default => SigHandler::SigDfl,
            SignalHandling::Ignore => SigHandler::SigIgn,
            SignalHandling::Catch => SigHandler::Handler(signal::catch_signal),
        };
        let new_action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty());
        // SAFETY: The `catch_signal` function only accesses atomic variables
        // and calls async-signal-safe functions.
        let old_action = unsafe { nix::sys::signal::sigaction(signal, &new_action) }?;
        let old_handling = match old_action.handler() {
            SigHandler::SigDfl => SignalHandling::Default,
            SigHandler::SigIgn => SignalHandling::Ignore,
            SigHandler::Handler(_) | SigHandler::SigAction(_) => SignalHandling::Catch,
        };
        Ok(old_handling)
    }

    fn sigsuspend(&mut self, mask: &SigSet) -> Result<()> {
        // SAFETY: The mask is a valid signal set.
        Errno::result(unsafe { libc::sigsuspend(mask.as_ref()) }).map(drop)
    }

    fn kill(&mut self, target: Pid, signal: Signal) -> Result<()> {
        nix::sys::signal::kill(target, signal)
    }

    fn setpgid(&mut self, pid: Pid, pgid: Pid) -> Result<()> {
        nix::unistd::setpgid(pid, pgid)
    }

    fn tcsetpgrp(&mut self, fd: Fd, pgid: Pid) -> Result<()> {
        // SAFETY: tcsetpgrp only affects the terminal's foreground group.
        Errno::result(unsafe { libc::tcsetpgrp(fd.0, pgid.as_raw()) }).map(drop)
    }

    /// Creates a new child process.
    ///
    /// This implementation calls the `fork` system call and returns both in the
    /// parent and child process.
    fn fork(&mut self) -> Result<ForkResult> {
        // SAFETY: As stated on RealSystem::new, the caller is responsible for
        // using RealSystem only in a single-threaded process.
        unsafe { nix::unistd::fork() }
    }

    fn execvp(&mut self, file: &CStr, args: &[CString]) -> Result<Infallible> {
        retry(|| nix::unistd::execvp(file, args))
    }

    fn exit_child(&mut self, exit_status: ExitStatus) -> ! {
        // SAFETY: _exit terminates the process without running the parent's
        // atexit handlers or flushing buffers inherited from the parent.
        unsafe { libc::_exit(exit_status.0) }
    }

    fn take_child_events(&mut self) -> Vec<ChildEvent> {
        signal::take_events()
    }

    fn foreground(&self) -> Option<Foreground> {
        signal::foreground()
    }

    fn set_foreground(&mut self, foreground: Option<Foreground>) {
        signal::set_foreground(foreground)
    }
}
