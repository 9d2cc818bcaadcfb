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

//! Code run in a forked child process before executing a utility

use super::Stage;
use super::pipe::PipeSet;
use stsh_env::io::Fd;
use stsh_env::job::Pid;
use stsh_env::semantics::ExitStatus;
use stsh_env::system::{Errno, OpenMode, SigSet, SigmaskHow, Signal, SignalHandling};
use stsh_env::{Env, JOB_CONTROL_SIGNALS};

/// Redirections that apply to one stage
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct StageRedirections<'a> {
    pub input: Option<&'a super::Path>,
    pub output: Option<&'a super::Path>,
}

fn redirect(env: &mut Env, path: &super::Path, mode: OpenMode, target: Fd) -> Result<(), Errno> {
    let fd = env.system.open(&path.c_string, mode)?;
    if fd != target {
        env.system.dup2(fd, target)?;
        env.system.close(fd)?;
    }
    Ok(())
}

/// Moves the calling process into the job's process group.
///
/// The process creates its own group if `leader` is `None`. If `tty` is given,
/// the group is made the foreground process group of the terminal. This must
/// be done while `SIGTTOU` is still ignored.
fn join_group(env: &mut Env, leader: Option<Pid>, tty: Option<Fd>) {
    let me = Pid::from_raw(0);
    if env.system.setpgid(me, leader.unwrap_or(me)).is_err() {
        return;
    }
    if let Some(tty) = tty {
        let pgid = env.system.getpgrp();
        let _ = env.system.tcsetpgrp(tty, pgid);
    }
}

/// Prepares the child process and executes the utility.
///
/// The child joins the process group of `leader`, or creates its own group if
/// it is the leader. A child of a foreground job takes the terminal `tty`
/// without waiting for the parent to hand it over. Signal handling is reset,
/// the pipes and redirections are applied, and then the utility is executed.
/// This function never returns: if anything fails, the child exits with
/// status 1, or 127 if the utility cannot be executed.
pub(super) fn run(
    env: &mut Env,
    stage: &Stage,
    pipes: PipeSet,
    redirections: StageRedirections<'_>,
    leader: Option<Pid>,
    tty: Option<Fd>,
) -> ! {
    join_group(env, leader, tty);

    for signal in JOB_CONTROL_SIGNALS {
        let _ = env.system.sigaction(signal, SignalHandling::Default);
    }
    let mut sigchld = SigSet::empty();
    sigchld.add(Signal::SIGCHLD);
    let _ = env.system.sigmask(SigmaskHow::SIG_UNBLOCK, &sigchld);

    if let Err(errno) = pipes.move_to_stdin_stdout(env) {
        env.print_error(&format!("stsh: cannot connect pipe: {errno}\n"));
        env.system.exit_child(ExitStatus::FAILURE);
    }

    let files = [
        (redirections.input, OpenMode::Read, Fd::STDIN),
        (redirections.output, OpenMode::Truncate, Fd::STDOUT),
    ];
    for (path, mode, target) in files {
        let Some(path) = path else { continue };
        if let Err(errno) = redirect(env, path, mode, target) {
            env.print_error(&format!("stsh: {}: {}\n", path.display, errno.desc()));
            env.system.exit_child(ExitStatus::FAILURE);
        }
    }

    let Err(errno) = env.system.execvp(&stage.file, &stage.args);
    let message = match errno {
        Errno::ENOENT => format!("stsh: {}: command not found\n", stage.name),
        errno => format!("stsh: {}: {}\n", stage.name, errno.desc()),
    };
    env.print_error(&message);
    env.system.exit_child(ExitStatus::NOT_FOUND)
}
