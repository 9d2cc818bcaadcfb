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

//! Data types describing a parsed pipeline.
//!
//! A [`Pipeline`] is treated as immutable input by the job control engine. It
//! implements `Display` so that it can be printed back in a canonical form,
//! and `FromStr` (see [`parser`](crate::parser)) so that it can be parsed from
//! a string.

use itertools::Itertools;
use std::fmt;

/// Maximum number of arguments a command can take, not counting the command
/// name itself
pub const MAX_ARGUMENTS: usize = 32;

/// Single command in a pipeline
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Command {
    /// Name of the utility to execute
    pub name: String,
    /// Arguments passed to the utility, excluding the name
    pub args: Vec<String>,
}

impl Command {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new<N: Into<String>>(name: N) -> Self {
        Command {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Returns an iterator over the name and the arguments, in this order.
    ///
    /// This is the argument vector passed to the utility.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words().format(" "))
    }
}

/// I/O redirections applied to a pipeline
///
/// The input redirection applies to the first command and the output
/// redirection to the last.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Redirections {
    /// Path of the file read as the standard input of the first command
    pub input: Option<String>,
    /// Path of the file truncated and written as the standard output of the
    /// last command
    pub output: Option<String>,
}

/// Sequence of commands connected by pipes
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Pipeline {
    /// Commands in the order they appear in the pipeline
    ///
    /// A blank line yields a pipeline with no commands, which the job control
    /// engine refuses to launch.
    pub commands: Vec<Command>,
    /// Whether the pipeline was terminated by `&`
    pub background: bool,
    /// Redirections of the first and last command
    pub redirections: Redirections,
}

impl Pipeline {
    /// Tests whether the pipeline contains no command.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.commands.len().saturating_sub(1);
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{command}")?;
            if i == 0 {
                if let Some(input) = &self.redirections.input {
                    write!(f, " < {input}")?;
                }
            }
            if i == last {
                if let Some(output) = &self.redirections.output {
                    write!(f, " > {output}")?;
                }
            }
        }
        if self.background {
            f.write_str(" &")?;
        }
        Ok(())
    }
}
