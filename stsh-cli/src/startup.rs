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

//! Shell startup

pub mod args;

use self::args::Run;
use stsh_env::io::Fd;
use stsh_env::system::Errno;
use stsh_env::{Env, System};

/// Prompt printed before reading each line unless `-p` is given
pub const DEFAULT_PROMPT: &str = "stsh> ";

/// Tests whether the shell should be in the interactive mode.
///
/// The shell is interactive if the `-i` option is given or the standard input
/// is a terminal.
#[must_use]
pub fn auto_interactive(system: &dyn System, run: &Run) -> bool {
    run.interactive || system.isatty(Fd::STDIN)
}

/// Prepares the environment for the read-eval loop.
///
/// This function sets the interactive mode and installs the signal handlers
/// for job control.
pub fn configure_environment(env: &mut Env, run: &Run) -> Result<(), Errno> {
    let interactive = auto_interactive(&*env.system, run);
    env.set_interactive(interactive);
    env.init_job_control()?;
    tracing::debug!(interactive, tty = ?env.tty, "environment configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use stsh_env::VirtualSystem;
    use stsh_env::system::SignalHandling;
    use stsh_env::system::Signal;

    #[test]
    fn interactive_by_option_or_terminal() {
        let system = VirtualSystem::new();
        let mut run = Run::default();
        assert!(!auto_interactive(&system, &run));

        run.interactive = true;
        assert!(auto_interactive(&system, &run));

        run.interactive = false;
        system.state.borrow_mut().tty = true;
        assert!(auto_interactive(&system, &run));
    }

    #[test]
    fn configure_environment_installs_handlers() {
        let system = VirtualSystem::new();
        let state = Rc::clone(&system.state);
        state.borrow_mut().tty = true;
        let mut env = Env::with_system(Box::new(system));

        configure_environment(&mut env, &Run::default()).unwrap();
        assert!(env.interactive);
        assert_eq!(env.tty, Some(Fd::STDIN));
        assert_eq!(
            state.borrow().handlings[&Signal::SIGCHLD],
            SignalHandling::Catch
        );
    }
}
