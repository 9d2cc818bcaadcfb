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

//! System simulated in Rust
//!
//! [`VirtualSystem`] is a pure Rust implementation of [`System`] that simulates
//! the behavior of the underlying system without any interaction with the
//! actual OS. It is used for testing job control without forking real child
//! processes.
//!
//! The simulation covers the parts of the OS the shell depends on:
//!
//! - Forked children are recorded with a process group and a state. They never
//!   run any code; their state changes only when a signal is sent to them
//!   with [`kill`](System::kill) or a [`Wakeup`] is consumed.
//! - Every state change of a child becomes a pending child event. Pending
//!   events are delivered (moved to the queue returned by
//!   [`take_child_events`](System::take_child_events)) when `SIGCHLD` is
//!   caught and not blocked, mimicking the signal relay of the real system,
//!   including the clearing of the foreground marker.
//! - [`sigsuspend`](System::sigsuspend) consumes the next [`Wakeup`] when no
//!   event is pending. It panics if there is none, as the real call would
//!   block forever.
//! - The standard input is read from a byte queue, and output to the standard
//!   output and error is captured in strings.

use super::{
    Errno, ForkResult, Foreground, OpenMode, Result, SigSet, SigmaskHow, Signal, SignalHandling,
    System,
};
use crate::io::Fd;
use crate::job::{ChildEvent, Pid, ProcessState};
use crate::semantics::ExitStatus;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::rc::Rc;

/// Simulated child process
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChildProcess {
    /// Process group ID
    pub pgid: Pid,
    /// Current state
    pub state: ProcessState,
    /// Whether `SIGCHLD` was blocked in the shell when the child was forked
    pub sigchld_blocked_at_fork: bool,
}

/// External happening that ends a [`sigsuspend`](System::sigsuspend)
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Wakeup {
    /// The child process exits.
    Exit(Pid),
    /// The child process is stopped by a signal from outside the shell.
    Stop(Pid),
    /// Every live child process exits.
    ExitAll,
    /// The shell receives the signal, as if the user typed Ctrl-C or Ctrl-Z.
    Signal(Signal),
}

/// State of the simulated system
#[derive(Debug)]
pub struct SystemState {
    /// Process ID of the shell
    pub shell_pid: Pid,
    /// Process group ID of the shell
    pub shell_pgid: Pid,
    /// Child processes forked so far, including terminated ones
    pub processes: BTreeMap<Pid, ChildProcess>,
    /// Process ID assigned to the next forked child
    pub next_pid: i32,
    /// Number of forks that succeed before `fork` starts failing with
    /// `EAGAIN`, or `None` for no limit
    pub fork_budget: Option<usize>,
    /// Every call to `kill`, in order
    pub kills: Vec<(Pid, Signal)>,
    /// Content remaining to be read from the standard input
    pub stdin: VecDeque<u8>,
    /// Content written to the standard output
    pub stdout: String,
    /// Content written to the standard error
    pub stderr: String,
    /// Signals blocked in the shell
    pub blocked: SigSet,
    /// Signal handlings configured by `sigaction`
    pub handlings: HashMap<Signal, SignalHandling>,
    /// Child events not yet delivered to the signal relay
    pub pending: Vec<ChildEvent>,
    /// Child events delivered to the signal relay
    pub caught: Vec<ChildEvent>,
    /// Foreground marker
    pub foreground: Option<Foreground>,
    /// Whether the standard input is a terminal
    pub tty: bool,
    /// Foreground process group of the terminal
    pub terminal_pgrp: Pid,
    /// File descriptors opened by `pipe` and `open` and not yet closed
    pub open_fds: BTreeSet<Fd>,
    /// File descriptors passed to `close`, in call order
    pub closes: Vec<Fd>,
    next_fd: i32,
    /// Events consumed by `sigsuspend`
    pub wakeups: VecDeque<Wakeup>,
}

impl Default for SystemState {
    fn default() -> Self {
        let shell_pid = Pid::from_raw(2);
        SystemState {
            shell_pid,
            shell_pgid: shell_pid,
            processes: BTreeMap::new(),
            next_pid: 100,
            fork_budget: None,
            kills: Vec::new(),
            stdin: VecDeque::new(),
            stdout: String::new(),
            stderr: String::new(),
            blocked: SigSet::empty(),
            handlings: HashMap::new(),
            pending: Vec::new(),
            caught: Vec::new(),
            foreground: None,
            tty: false,
            terminal_pgrp: shell_pid,
            open_fds: BTreeSet::new(),
            closes: Vec::new(),
            next_fd: 3,
            wakeups: VecDeque::new(),
        }
    }
}

impl SystemState {
    /// Changes the state of a live child and makes the change pending.
    ///
    /// Returns false if the child does not exist or has terminated.
    pub fn change_state(&mut self, pid: Pid, state: ProcessState) -> bool {
        let Some(process) = self.processes.get_mut(&pid) else {
            return false;
        };
        if process.state == ProcessState::Terminated {
            return false;
        }
        if process.state != state {
            process.state = state;
            self.pending.push(ChildEvent { pid, state });
        }
        true
    }

    /// Returns the live children a `kill` target refers to.
    fn targets(&self, target: Pid) -> Vec<Pid> {
        let raw = target.as_raw();
        self.processes
            .iter()
            .filter(|(pid, process)| {
                process.state != ProcessState::Terminated
                    && if raw < 0 {
                        process.pgid.as_raw() == -raw
                    } else {
                        **pid == target
                    }
            })
            .map(|(pid, _)| *pid)
            .collect()
    }

    fn handling(&self, signal: Signal) -> SignalHandling {
        self.handlings.get(&signal).copied().unwrap_or_default()
    }

    /// Delivers pending child events if `SIGCHLD` is caught and not blocked.
    ///
    /// Returns whether any event was delivered.
    fn deliver(&mut self) -> bool {
        if self.blocked.contains(Signal::SIGCHLD)
            || self.handling(Signal::SIGCHLD) != SignalHandling::Catch
            || self.pending.is_empty()
        {
            return false;
        }
        for event in std::mem::take(&mut self.pending) {
            if event.state != ProcessState::Running
                && self.foreground.is_some_and(|fg| fg.pid == event.pid)
            {
                self.foreground = None;
            }
            self.caught.push(event);
        }
        true
    }

    fn allocate_fd(&mut self) -> Fd {
        let fd = Fd(self.next_fd);
        self.next_fd += 1;
        self.open_fds.insert(fd);
        fd
    }

    fn is_open(&self, fd: Fd) -> bool {
        fd.0 <= 2 || self.open_fds.contains(&fd)
    }
}

/// Simulated system
///
/// Clones of a `VirtualSystem` share the same [`SystemState`], so a test can
/// keep a clone to inspect the state after passing the system to an
/// [`Env`](crate::Env).
#[derive(Clone, Debug, Default)]
pub struct VirtualSystem {
    pub state: Rc<RefCell<SystemState>>,
}

impl VirtualSystem {
    /// Creates a virtual system with no child processes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn signal_shell(&mut self, signal: Signal) {
        let state = self.state.borrow();
        if state.handling(signal) != SignalHandling::Catch {
            return;
        }
        if !matches!(signal, Signal::SIGINT | Signal::SIGTSTP) {
            return;
        }
        let Some(foreground) = state.foreground else {
            return;
        };
        drop(state);
        let target = Pid::from_raw(-foreground.pgid.as_raw());
        // The group may have vanished already.
        let _ = self.kill(target, signal);
    }
}

impl System for VirtualSystem {
    fn getpid(&self) -> Pid {
        self.state.borrow().shell_pid
    }

    fn getpgrp(&self) -> Pid {
        self.state.borrow().shell_pgid
    }

    fn isatty(&self, fd: Fd) -> bool {
        fd == Fd::STDIN && self.state.borrow().tty
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        if fd != Fd::STDIN {
            return Err(Errno::EBADF);
        }
        let count = buffer.len().min(state.stdin.len());
        for (slot, byte) in buffer.iter_mut().zip(state.stdin.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        let text = String::from_utf8_lossy(buffer);
        match fd {
            Fd::STDOUT => state.stdout.push_str(&text),
            Fd::STDERR => state.stderr.push_str(&text),
            fd if state.open_fds.contains(&fd) => (),
            _ => return Err(Errno::EBADF),
        }
        Ok(buffer.len())
    }

    fn pipe(&mut self) -> Result<(Fd, Fd)> {
        let mut state = self.state.borrow_mut();
        let reader = state.allocate_fd();
        let writer = state.allocate_fd();
        Ok((reader, writer))
    }

    fn dup2(&mut self, from: Fd, to: Fd) -> Result<Fd> {
        let mut state = self.state.borrow_mut();
        if !state.is_open(from) {
            return Err(Errno::EBADF);
        }
        if to.0 > 2 {
            state.open_fds.insert(to);
        }
        Ok(to)
    }

    fn open(&mut self, _path: &CStr, _mode: OpenMode) -> Result<Fd> {
        Ok(self.state.borrow_mut().allocate_fd())
    }

    fn close(&mut self, fd: Fd) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.open_fds.remove(&fd);
        state.closes.push(fd);
        Ok(())
    }

    fn sigmask(&mut self, how: SigmaskHow, set: &SigSet) -> Result<SigSet> {
        let mut state = self.state.borrow_mut();
        // Events that became pending while SIGCHLD was unblocked would
        // already have been delivered by a real system.
        state.deliver();
        let old_mask = state.blocked;
        match how {
            SigmaskHow::SIG_BLOCK => state.blocked.extend(set),
            SigmaskHow::SIG_UNBLOCK => {
                for signal in set.iter() {
                    state.blocked.remove(signal);
                }
            }
            SigmaskHow::SIG_SETMASK => state.blocked = *set,
            _ => return Err(Errno::EINVAL),
        }
        state.deliver();
        Ok(old_mask)
    }

    fn sigaction(&mut self, signal: Signal, handling: SignalHandling) -> Result<SignalHandling> {
        let mut state = self.state.borrow_mut();
        let old_handling = state.handlings.insert(signal, handling);
        Ok(old_handling.unwrap_or_default())
    }

    /// Simulates waiting for a signal.
    ///
    /// If a child event is pending and `mask` does not block `SIGCHLD`, the
    /// event is delivered. Otherwise, the next [`Wakeup`] is consumed until
    /// something is delivered or a signal is sent to the shell.
    ///
    /// # Panics
    ///
    /// If there is no wakeup left when one is needed.
    fn sigsuspend(&mut self, mask: &SigSet) -> Result<()> {
        let old_mask = std::mem::replace(&mut self.state.borrow_mut().blocked, *mask);
        loop {
            if self.state.borrow_mut().deliver() {
                break;
            }
            let wakeup = self.state.borrow_mut().wakeups.pop_front();
            match wakeup {
                Some(Wakeup::Exit(pid)) => {
                    self.state
                        .borrow_mut()
                        .change_state(pid, ProcessState::Terminated);
                }
                Some(Wakeup::Stop(pid)) => {
                    self.state
                        .borrow_mut()
                        .change_state(pid, ProcessState::Stopped);
                }
                Some(Wakeup::ExitAll) => {
                    let mut state = self.state.borrow_mut();
                    let pids: Vec<Pid> = state.processes.keys().copied().collect();
                    for pid in pids {
                        state.change_state(pid, ProcessState::Terminated);
                    }
                }
                Some(Wakeup::Signal(signal)) => {
                    self.signal_shell(signal);
                    self.state.borrow_mut().deliver();
                    break;
                }
                None => panic!("sigsuspend would block forever: no wakeup left"),
            }
        }
        self.state.borrow_mut().blocked = old_mask;
        Err(Errno::EINTR)
    }

    /// Records the call and simulates the effect of the signal.
    ///
    /// `SIGCONT` resumes stopped targets, `SIGSTOP`, `SIGTSTP`, `SIGTTIN` and
    /// `SIGTTOU` stop running targets, and any other signal terminates them.
    fn kill(&mut self, target: Pid, signal: Signal) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.kills.push((target, signal));
        let targets = state.targets(target);
        if targets.is_empty() {
            return Err(Errno::ESRCH);
        }
        let new_state = match signal {
            Signal::SIGCONT => ProcessState::Running,
            Signal::SIGSTOP | Signal::SIGTSTP | Signal::SIGTTIN | Signal::SIGTTOU => {
                ProcessState::Stopped
            }
            _ => ProcessState::Terminated,
        };
        for pid in targets {
            state.change_state(pid, new_state);
        }
        state.deliver();
        Ok(())
    }

    /// Changes the process group of a child.
    ///
    /// A `pid` of 0 names the calling process, whose group is
    /// [`SystemState::shell_pgid`]. This lets tests run code meant for a forked
    /// child as if the simulated shell were that child.
    fn setpgid(&mut self, pid: Pid, pgid: Pid) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if pid.as_raw() == 0 {
            let own = state.shell_pid;
            state.shell_pgid = if pgid.as_raw() == 0 { own } else { pgid };
            return Ok(());
        }
        let process = state.processes.get_mut(&pid).ok_or(Errno::ESRCH)?;
        process.pgid = if pgid.as_raw() == 0 { pid } else { pgid };
        Ok(())
    }

    fn tcsetpgrp(&mut self, fd: Fd, pgid: Pid) -> Result<()> {
        if !self.isatty(fd) {
            return Err(Errno::ENOTTY);
        }
        self.state.borrow_mut().terminal_pgrp = pgid;
        Ok(())
    }

    fn fork(&mut self) -> Result<ForkResult> {
        let mut state = self.state.borrow_mut();
        if let Some(budget) = &mut state.fork_budget {
            if *budget == 0 {
                return Err(Errno::EAGAIN);
            }
            *budget -= 1;
        }
        let child = Pid::from_raw(state.next_pid);
        state.next_pid += 1;
        let process = ChildProcess {
            pgid: state.shell_pgid,
            state: ProcessState::Running,
            sigchld_blocked_at_fork: state.blocked.contains(Signal::SIGCHLD),
        };
        state.processes.insert(child, process);
        Ok(ForkResult::Parent { child })
    }

    /// Always panics because a virtual child never runs.
    fn execvp(&mut self, file: &CStr, _args: &[CString]) -> Result<Infallible> {
        panic!("virtual system cannot execute {file:?}")
    }

    /// Always panics because a virtual child never runs.
    fn exit_child(&mut self, exit_status: ExitStatus) -> ! {
        panic!("virtual system cannot exit a child with {exit_status}")
    }

    fn take_child_events(&mut self) -> Vec<ChildEvent> {
        std::mem::take(&mut self.state.borrow_mut().caught)
    }

    fn foreground(&self) -> Option<Foreground> {
        self.state.borrow().foreground
    }

    fn set_foreground(&mut self, foreground: Option<Foreground>) {
        self.state.borrow_mut().foreground = foreground;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn fork(system: &mut VirtualSystem) -> Pid {
        match system.fork() {
            Ok(ForkResult::Parent { child }) => child,
            other => panic!("unexpected fork result: {other:?}"),
        }
    }

    fn catch_sigchld(system: &mut VirtualSystem) {
        system
            .sigaction(Signal::SIGCHLD, SignalHandling::Catch)
            .unwrap();
    }

    fn sigchld() -> SigSet {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        set
    }

    #[test]
    fn fork_assigns_increasing_pids_in_shell_group() {
        let mut system = VirtualSystem::new();
        let first = fork(&mut system);
        let second = fork(&mut system);
        assert_eq!(first, Pid::from_raw(100));
        assert_eq!(second, Pid::from_raw(101));
        let state = system.state.borrow();
        assert_eq!(state.processes[&first].pgid, state.shell_pgid);
    }

    #[test]
    fn fork_budget_limits_forks() {
        let mut system = VirtualSystem::new();
        system.state.borrow_mut().fork_budget = Some(1);
        fork(&mut system);
        assert_matches!(system.fork(), Err(Errno::EAGAIN));
    }

    #[test]
    fn setpgid_zero_means_own_pid() {
        let mut system = VirtualSystem::new();
        let child = fork(&mut system);
        system.setpgid(child, Pid::from_raw(0)).unwrap();
        assert_eq!(system.state.borrow().processes[&child].pgid, child);
        assert_eq!(
            system.setpgid(Pid::from_raw(999), child),
            Err(Errno::ESRCH)
        );

        system.setpgid(Pid::from_raw(0), child).unwrap();
        assert_eq!(system.getpgrp(), child);
        system.setpgid(Pid::from_raw(0), Pid::from_raw(0)).unwrap();
        assert_eq!(system.getpgrp(), system.getpid());
    }

    #[test]
    fn kill_stops_continues_and_terminates() {
        let mut system = VirtualSystem::new();
        let child = fork(&mut system);
        system.kill(child, Signal::SIGSTOP).unwrap();
        system.kill(child, Signal::SIGSTOP).unwrap();
        system.kill(child, Signal::SIGCONT).unwrap();
        system.kill(child, Signal::SIGKILL).unwrap();
        let state = system.state.borrow();
        assert_eq!(state.pending, [
            ChildEvent {
                pid: child,
                state: ProcessState::Stopped,
            },
            ChildEvent {
                pid: child,
                state: ProcessState::Running,
            },
            ChildEvent {
                pid: child,
                state: ProcessState::Terminated,
            },
        ]);
        assert_eq!(state.kills.len(), 4);
    }

    #[test]
    fn kill_process_group() {
        let mut system = VirtualSystem::new();
        let a = fork(&mut system);
        let b = fork(&mut system);
        system.setpgid(a, a).unwrap();
        system.setpgid(b, a).unwrap();
        system
            .kill(Pid::from_raw(-a.as_raw()), Signal::SIGTERM)
            .unwrap();
        let state = system.state.borrow();
        assert_eq!(state.processes[&a].state, ProcessState::Terminated);
        assert_eq!(state.processes[&b].state, ProcessState::Terminated);
    }

    #[test]
    fn kill_without_target_fails_but_is_recorded() {
        let mut system = VirtualSystem::new();
        assert_eq!(
            system.kill(Pid::from_raw(42), Signal::SIGKILL),
            Err(Errno::ESRCH)
        );
        assert_eq!(system.state.borrow().kills, [(Pid::from_raw(42), Signal::SIGKILL)]);
    }

    #[test]
    fn events_are_delivered_only_when_sigchld_is_unblocked() {
        let mut system = VirtualSystem::new();
        catch_sigchld(&mut system);
        let child = fork(&mut system);
        let old_mask = system.sigmask(SigmaskHow::SIG_BLOCK, &sigchld()).unwrap();
        system.kill(child, Signal::SIGKILL).unwrap();
        assert!(system.take_child_events().is_empty());

        system.sigmask(SigmaskHow::SIG_SETMASK, &old_mask).unwrap();
        assert_eq!(system.take_child_events(), [ChildEvent {
            pid: child,
            state: ProcessState::Terminated,
        }]);
    }

    #[test]
    fn delivery_clears_foreground_marker_on_stop() {
        let mut system = VirtualSystem::new();
        catch_sigchld(&mut system);
        let child = fork(&mut system);
        system.set_foreground(Some(Foreground {
            pid: child,
            pgid: child,
        }));
        system.kill(child, Signal::SIGSTOP).unwrap();
        assert_eq!(system.foreground(), None);
    }

    #[test]
    fn sigsuspend_consumes_wakeups() {
        let mut system = VirtualSystem::new();
        catch_sigchld(&mut system);
        let child = fork(&mut system);
        system.sigmask(SigmaskHow::SIG_BLOCK, &sigchld()).unwrap();
        system.state.borrow_mut().wakeups.push_back(Wakeup::Exit(child));

        assert_eq!(system.sigsuspend(&SigSet::empty()), Err(Errno::EINTR));
        let state = system.state.borrow();
        assert!(state.blocked.contains(Signal::SIGCHLD));
        assert_eq!(state.caught.len(), 1);
        assert!(state.wakeups.is_empty());
    }

    #[test]
    fn sigsuspend_forwards_tstp_to_foreground_group() {
        let mut system = VirtualSystem::new();
        catch_sigchld(&mut system);
        system
            .sigaction(Signal::SIGTSTP, SignalHandling::Catch)
            .unwrap();
        let child = fork(&mut system);
        system.setpgid(child, child).unwrap();
        system.set_foreground(Some(Foreground {
            pid: child,
            pgid: child,
        }));
        system
            .state
            .borrow_mut()
            .wakeups
            .push_back(Wakeup::Signal(Signal::SIGTSTP));

        system.sigsuspend(&SigSet::empty()).unwrap_err();
        let state = system.state.borrow();
        assert_eq!(state.kills, [(Pid::from_raw(-child.as_raw()), Signal::SIGTSTP)]);
        assert_eq!(state.processes[&child].state, ProcessState::Stopped);
        assert_eq!(state.foreground, None);
    }

    #[test]
    #[should_panic(expected = "no wakeup left")]
    fn sigsuspend_without_wakeup_panics() {
        let mut system = VirtualSystem::new();
        let _ = system.sigsuspend(&SigSet::empty());
    }

    #[test]
    fn pipes_and_output() {
        let mut system = VirtualSystem::new();
        let (reader, writer) = system.pipe().unwrap();
        assert_eq!((reader, writer), (Fd(3), Fd(4)));
        system.close(reader).unwrap();
        system.close(writer).unwrap();
        assert!(system.state.borrow().open_fds.is_empty());

        system.write_all(Fd::STDOUT, b"out").unwrap();
        system.write_all(Fd::STDERR, b"err").unwrap();
        assert_eq!(system.write(Fd(reader.0), b"x"), Err(Errno::EBADF));
        let state = system.state.borrow();
        assert_eq!(state.stdout, "out");
        assert_eq!(state.stderr, "err");
    }
}
