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

//! Line input

use crate::io::Fd;
use crate::system::{Errno, System};
use std::slice::from_mut;

/// Reader of lines from a file descriptor.
///
/// The reader reads one byte at a time so that it does not consume input past
/// the end of the line. The rest of the input remains available to the
/// utilities the shell starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use = "FdReader does nothing unless lines are read"]
pub struct FdReader {
    /// File descriptor to read from
    fd: Fd,
}

impl FdReader {
    /// Creates a new `FdReader` instance.
    pub fn new(fd: Fd) -> Self {
        FdReader { fd }
    }

    /// Reads the next line.
    ///
    /// The returned line includes the trailing newline if there is one. An
    /// empty string means the end of input. Invalid UTF-8 sequences are
    /// replaced with U+FFFD.
    pub fn next_line(&mut self, system: &mut dyn System) -> Result<String, Errno> {
        let mut bytes = Vec::new();
        loop {
            let mut byte = 0;
            match system.read(self.fd, from_mut(&mut byte))? {
                // End of input
                0 => break,
                _ => {
                    bytes.push(byte);
                    if byte == b'\n' {
                        break;
                    }
                }
            }
        }

        let line = String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(&e.into_bytes()).into());
        Ok(line)
    }
}

impl Default for FdReader {
    fn default() -> Self {
        FdReader::new(Fd::STDIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualSystem;

    #[test]
    fn lines_are_read_one_at_a_time() {
        let mut system = VirtualSystem::new();
        system
            .state
            .borrow_mut()
            .stdin
            .extend(b"jobs\nexit\nrest");
        let mut reader = FdReader::default();
        assert_eq!(reader.next_line(&mut system).unwrap(), "jobs\n");
        assert_eq!(system.state.borrow().stdin.len(), 9);
        assert_eq!(reader.next_line(&mut system).unwrap(), "exit\n");
        assert_eq!(reader.next_line(&mut system).unwrap(), "rest");
        assert_eq!(reader.next_line(&mut system).unwrap(), "");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut system = VirtualSystem::new();
        system.state.borrow_mut().stdin.extend(b"a\xFFb\n");
        let line = FdReader::default().next_line(&mut system).unwrap();
        assert_eq!(line, "a\u{FFFD}b\n");
    }

    #[test]
    fn read_error_is_returned() {
        let mut system = VirtualSystem::new();
        let mut reader = FdReader::new(Fd(7));
        assert_eq!(reader.next_line(&mut system), Err(Errno::EBADF));
    }
}
