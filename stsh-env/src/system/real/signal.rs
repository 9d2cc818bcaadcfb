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

//! Signal relay of the real system
//!
//! [`catch_signal`] is the only signal handler the shell installs. It runs
//! asynchronously with respect to the main loop, so it only touches atomic
//! statics and calls async-signal-safe functions:
//!
//! - On `SIGCHLD`, it reaps every child that changed state and pushes the
//!   resulting [`ChildEvent`]s into [`EVENTS`]. If the reaped child is the one
//!   in the foreground marker and it stopped or terminated, the marker is
//!   cleared, which ends the foreground wait.
//! - On `SIGINT` and `SIGTSTP`, it forwards the signal to the process group in
//!   the foreground marker.
//! - On `SIGQUIT`, it terminates the shell with exit status 0.
//!
//! The main loop takes the queued events while `SIGCHLD` is blocked, so the
//! handler and the main loop never access the queue at the same time.

use crate::job::{ChildEvent, Pid, ProcessState, WaitStatus};
use crate::system::Foreground;
use nix::sys::wait::{WaitPidFlag, waitpid};
use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicUsize, Ordering, compiler_fence};

/// Maximum number of events the handler can queue
pub(crate) const QUEUE_CAPACITY: usize = 64;

/// Fixed-capacity queue of child events that can be filled from a signal
/// handler
#[derive(Debug)]
pub(crate) struct EventQueue {
    pids: [AtomicI32; QUEUE_CAPACITY],
    states: [AtomicU8; QUEUE_CAPACITY],
    len: AtomicUsize,
    overflowed: AtomicBool,
}

impl EventQueue {
    pub(crate) const fn new() -> Self {
        EventQueue {
            pids: [const { AtomicI32::new(0) }; QUEUE_CAPACITY],
            states: [const { AtomicU8::new(0) }; QUEUE_CAPACITY],
            len: AtomicUsize::new(0),
            overflowed: AtomicBool::new(false),
        }
    }

    fn is_full(&self) -> bool {
        self.len.load(Ordering::Relaxed) >= QUEUE_CAPACITY
    }

    /// Appends an event. Returns false if the queue is full.
    fn push(&self, event: ChildEvent) -> bool {
        let len = self.len.load(Ordering::Relaxed);
        if len >= QUEUE_CAPACITY {
            self.overflowed.store(true, Ordering::Relaxed);
            return false;
        }
        self.pids[len].store(event.pid.as_raw(), Ordering::Relaxed);
        self.states[len].store(encode(event.state), Ordering::Relaxed);
        // The slot must be filled before it becomes visible.
        compiler_fence(Ordering::Release);
        self.len.store(len + 1, Ordering::Relaxed);
        true
    }

    /// Removes all events in the order they were pushed.
    ///
    /// Also returns whether the handler had to leave children unreaped because
    /// the queue was full.
    fn drain(&self) -> (Vec<ChildEvent>, bool) {
        let len = self.len.load(Ordering::Relaxed);
        compiler_fence(Ordering::Acquire);
        let events = (0..len)
            .map(|i| ChildEvent {
                pid: Pid::from_raw(self.pids[i].load(Ordering::Relaxed)),
                state: decode(self.states[i].load(Ordering::Relaxed)),
            })
            .collect();
        self.len.store(0, Ordering::Relaxed);
        (events, self.overflowed.swap(false, Ordering::Relaxed))
    }
}

fn encode(state: ProcessState) -> u8 {
    match state {
        ProcessState::Running => 0,
        ProcessState::Stopped => 1,
        ProcessState::Terminated => 2,
    }
}

fn decode(value: u8) -> ProcessState {
    match value {
        0 => ProcessState::Running,
        1 => ProcessState::Stopped,
        _ => ProcessState::Terminated,
    }
}

/// Events reaped by the handler and not yet taken by the main loop
pub(crate) static EVENTS: EventQueue = EventQueue::new();

static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);
static FOREGROUND_PGID: AtomicI32 = AtomicI32::new(0);

/// Returns the current foreground marker.
pub(crate) fn foreground() -> Option<Foreground> {
    let pid = FOREGROUND_PID.load(Ordering::Relaxed);
    let pgid = FOREGROUND_PGID.load(Ordering::Relaxed);
    (pid > 0).then(|| Foreground {
        pid: Pid::from_raw(pid),
        pgid: Pid::from_raw(pgid),
    })
}

/// Sets the foreground marker.
///
/// `SIGCHLD` should be blocked so that the handler does not clear the marker
/// halfway.
pub(crate) fn set_foreground(foreground: Option<Foreground>) {
    let (pid, pgid) = foreground.map_or((0, 0), |fg| (fg.pid.as_raw(), fg.pgid.as_raw()));
    FOREGROUND_PGID.store(pgid, Ordering::Relaxed);
    FOREGROUND_PID.store(pid, Ordering::Relaxed);
}

/// Clears the foreground marker if the event ends the wait for it.
fn release_foreground(event: ChildEvent) {
    let pid = FOREGROUND_PID.load(Ordering::Relaxed);
    if event.state != ProcessState::Running && pid == event.pid.as_raw() {
        set_foreground(None);
    }
}

/// Reaps one child that has changed state.
///
/// Returns `None` if no child has a pending state change or there is no child
/// at all.
fn reap_next() -> Option<ChildEvent> {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    loop {
        let status = waitpid(Pid::from_raw(-1), Some(flags)).ok()?;
        if status == WaitStatus::StillAlive {
            return None;
        }
        if let Some(event) = ChildEvent::from_wait_status(status) {
            release_foreground(event);
            return Some(event);
        }
    }
}

fn reap_children(queue: &EventQueue) {
    while !queue.is_full() {
        match reap_next() {
            Some(event) => {
                queue.push(event);
            }
            None => return,
        }
    }
    queue.overflowed.store(true, Ordering::Relaxed);
}

/// Takes the queued events and reaps the children the handler could not.
///
/// `SIGCHLD` must be blocked.
pub(crate) fn take_events() -> Vec<ChildEvent> {
    let (mut events, overflowed) = EVENTS.drain();
    if overflowed {
        events.extend(std::iter::from_fn(reap_next));
    }
    events
}

fn forward_to_foreground(signal: c_int) {
    let pgid = FOREGROUND_PGID.load(Ordering::Relaxed);
    if pgid > 0 && FOREGROUND_PID.load(Ordering::Relaxed) > 0 {
        // SAFETY: kill is async-signal-safe.
        unsafe { libc::kill(-pgid, signal) };
    }
}

/// Signal handler installed by [`RealSystem::sigaction`](super::RealSystem).
pub(super) extern "C" fn catch_signal(signal: c_int) {
    // This function can only perform async-signal-safe operations.
    let saved_errno = errno::errno();
    match signal {
        libc::SIGCHLD => reap_children(&EVENTS),
        libc::SIGINT | libc::SIGTSTP => forward_to_foreground(signal),
        // SAFETY: _exit is async-signal-safe.
        libc::SIGQUIT => unsafe { libc::_exit(0) },
        _ => (),
    }
    errno::set_errno(saved_errno);
}
