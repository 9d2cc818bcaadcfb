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

//! Implementation of the shell built-in utilities.
//!
//! Each built-in utility is implemented in the submodule named after the
//! utility. The submodule contains the `main` function that implements the
//! built-in utility. The module documentation for each submodule describes how
//! the built-in utility behaves.
//!
//! The [`common`] module provides the error type and argument parsing
//! functions shared by the built-ins.
//!
//! Built-ins are selected by [`Builtin`], which is parsed from the command
//! name:
//!
//! ```
//! # use stsh_builtin::Builtin;
//! assert_eq!("fg".parse(), Ok(Builtin::Fg));
//! assert!("ls".parse::<Builtin>().is_err());
//! assert_eq!(Builtin::Slay.to_string(), "slay");
//! ```

pub mod bg;
pub mod common;
pub mod cont;
pub mod exit;
pub mod fg;
pub mod halt;
pub mod jobs;
pub mod send;
pub mod slay;

use self::common::Error;
use std::ops::ControlFlow::{self, Continue};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use stsh_env::Env;
use stsh_env::semantics::ExitStatus;
use stsh_syntax::syntax::Command;

/// Result of a built-in
///
/// `Break` requests the shell to exit with the exit status.
pub type Result = std::result::Result<ControlFlow<ExitStatus>, Error>;

/// Built-in utility
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum Builtin {
    /// Exits the shell.
    Quit,
    /// Exits the shell.
    Exit,
    /// Resumes a job in the foreground.
    Fg,
    /// Resumes a job in the background.
    Bg,
    /// Kills a process.
    Slay,
    /// Stops a process.
    Halt,
    /// Continues a process.
    Cont,
    /// Lists jobs.
    Jobs,
}

impl Builtin {
    /// Returns the name of the built-in.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Runs the built-in with the arguments (excluding the command name).
    pub fn main(self, env: &mut Env, args: &[String]) -> Result {
        match self {
            Builtin::Quit | Builtin::Exit => exit::main(env, args),
            Builtin::Fg => fg::main(env, args),
            Builtin::Bg => bg::main(env, args),
            Builtin::Slay => slay::main(env, args),
            Builtin::Halt => halt::main(env, args),
            Builtin::Cont => cont::main(env, args),
            Builtin::Jobs => jobs::main(env, args),
        }
    }
}

/// Runs the command if it names a built-in.
///
/// Returns `None` if the command is not a built-in. An error from the
/// built-in is printed to the standard error as `stsh: <name>: <message>` and
/// the shell continues.
pub fn run(env: &mut Env, command: &Command) -> Option<ControlFlow<ExitStatus>> {
    let builtin = command.name.parse::<Builtin>().ok()?;
    match builtin.main(env, &command.args) {
        Ok(flow) => Some(flow),
        Err(error) => {
            tracing::debug!(?error, %builtin, "built-in failed");
            env.print_error(&format!("stsh: {builtin}: {error}\n"));
            Some(Continue(()))
        }
    }
}
