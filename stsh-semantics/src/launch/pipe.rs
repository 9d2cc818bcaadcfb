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

//! Pipes connecting the commands of a pipeline

use stsh_env::Env;
use stsh_env::io::Fd;
use stsh_env::system::Errno;

/// Set of pipe file descriptors that connect commands.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct PipeSet {
    /// Reader from the previous command
    read_previous: Option<Fd>,
    /// Reader and writer to the next command
    next: Option<(Fd, Fd)>,
}

impl PipeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the pipe set for the next command.
    ///
    /// Closes FDs that are no longer necessary and opens a new pipe if there is
    /// a next command.
    pub fn shift(&mut self, env: &mut Env, has_next: bool) -> Result<(), Errno> {
        if let Some(fd) = self.read_previous {
            let _ = env.system.close(fd);
        }

        if let Some((reader, writer)) = self.next {
            let _ = env.system.close(writer);
            self.read_previous = Some(reader);
        } else {
            self.read_previous = None;
        }

        self.next = None;
        if has_next {
            self.next = Some(env.system.pipe()?);
        }

        Ok(())
    }

    /// Closes all the FDs held by the set.
    pub fn close(self, env: &mut Env) {
        let next = self.next.into_iter().flat_map(|(reader, writer)| [reader, writer]);
        for fd in self.read_previous.into_iter().chain(next) {
            let _ = env.system.close(fd);
        }
    }

    /// Moves the pipe FDs to stdin/stdout and closes the FDs that are no longer
    /// necessary.
    ///
    /// This is called in the child process. A pipe FD that already is the
    /// standard input or output, as happens when the shell was started with it
    /// closed, is left in place. The reader is moved first because it may
    /// occupy the standard output.
    pub fn move_to_stdin_stdout(self, env: &mut Env) -> Result<(), Errno> {
        if let Some((reader, _)) = self.next {
            env.system.close(reader)?;
        }
        if let Some(reader) = self.read_previous {
            if reader != Fd::STDIN {
                env.system.dup2(reader, Fd::STDIN)?;
                env.system.close(reader)?;
            }
        }
        if let Some((_, writer)) = self.next {
            if writer != Fd::STDOUT {
                env.system.dup2(writer, Fd::STDOUT)?;
                env.system.close(writer)?;
            }
        }
        Ok(())
    }
}
