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

//! This is the `stsh` binary crate.
//!
//! The shell reads one line at a time, parses it into a
//! [pipeline](stsh_syntax::syntax::Pipeline) and either runs it as a built-in
//! or starts it as a job. See [`startup::args`] for the command line options.
//!
//! Debug output is written to the standard error when the `STSH_LOG`
//! environment variable is set to a [`tracing_subscriber::EnvFilter`]
//! directive such as `debug`.

pub mod startup;

use self::startup::args::{Parse, Run, USAGE};
use self::startup::{DEFAULT_PROMPT, configure_environment};
use std::ops::ControlFlow::{self, Break, Continue};
use stsh_env::input::FdReader;
use stsh_env::semantics::ExitStatus;
use stsh_env::{Env, RealSystem};
use stsh_syntax::parser::parse;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "STSH_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn print_version(env: &mut Env) -> ExitStatus {
    let version = env!("CARGO_PKG_VERSION");
    match env.print(&format!("stsh {version}\n")) {
        Ok(()) => ExitStatus::SUCCESS,
        Err(_) => ExitStatus::FAILURE,
    }
}

fn print_usage(env: &mut Env) -> ExitStatus {
    match env.print(USAGE) {
        Ok(()) => ExitStatus::SUCCESS,
        Err(_) => ExitStatus::FAILURE,
    }
}

/// Runs one line of input.
///
/// A blank line does nothing. A single command naming a built-in runs the
/// built-in in the shell process; anything else is started as a job. Errors
/// are printed to the standard error and do not end the shell.
///
/// Returns `Break` if the shell should exit.
pub fn execute_line(env: &mut Env, line: &str) -> ControlFlow<ExitStatus> {
    let pipeline = match parse(line) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            env.print_error(&format!("stsh: {e}\n"));
            return Continue(());
        }
    };
    if pipeline.is_empty() {
        return Continue(());
    }

    if let Some(builtin) = pipeline
        .commands
        .iter()
        .find_map(|command| command.name.parse::<stsh_builtin::Builtin>().ok())
    {
        let simple = pipeline.commands.len() == 1
            && !pipeline.background
            && pipeline.redirections == Default::default();
        if !simple {
            env.print_error(&format!(
                "stsh: {builtin}: cannot be used in a pipeline or with `&` or redirections\n"
            ));
            return Continue(());
        }
        return stsh_builtin::run(env, &pipeline.commands[0]).unwrap_or(Continue(()));
    }

    match stsh_semantics::launch(env, &pipeline) {
        Ok(job_number) => tracing::debug!(job_number, %pipeline, "launched"),
        Err(e) => env.print_error(&format!("stsh: {e}\n")),
    }
    Continue(())
}

/// Reads and runs lines until the end of input or an exiting built-in.
pub fn read_eval_loop(env: &mut Env, reader: &mut FdReader, prompt: &str) -> ExitStatus {
    loop {
        if let Err(errno) = env.reap() {
            tracing::warn!(%errno, "cannot apply child events");
        }
        if env.interactive {
            let _ = env.print(prompt);
        }

        let line = match reader.next_line(&mut *env.system) {
            Ok(line) => line,
            Err(errno) => {
                env.print_error(&format!("stsh: cannot read input: {}\n", errno.desc()));
                return ExitStatus::FAILURE;
            }
        };
        if line.is_empty() {
            if env.interactive {
                let _ = env.print("\n");
            }
            return ExitStatus::SUCCESS;
        }

        if let Break(exit_status) = execute_line(env, &line) {
            return exit_status;
        }
    }
}

fn run(env: &mut Env, run: Run) -> ExitStatus {
    if let Err(errno) = configure_environment(env, &run) {
        env.print_error(&format!(
            "{}: cannot set up job control: {}\n",
            run.arg0,
            errno.desc()
        ));
        return ExitStatus::ERROR;
    }
    let prompt = run.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);
    read_eval_loop(env, &mut FdReader::default(), prompt)
}

/// Entry point of the shell
///
/// This function parses the command line arguments, runs the shell, and
/// exits the process with the resulting exit status.
pub fn main() -> ! {
    init_logging();

    // SAFETY: This is the only instance of RealSystem in the process.
    let system = unsafe { RealSystem::new() };
    let mut env = Env::with_system(Box::new(system));

    let exit_status = match startup::args::parse(std::env::args()) {
        Ok(Parse::Help) => print_usage(&mut env),
        Ok(Parse::Version) => print_version(&mut env),
        Ok(Parse::Run(args)) => run(&mut env, args),
        Err(e) => {
            let arg0 = std::env::args().next().unwrap_or_else(|| "stsh".to_owned());
            env.print_error(&format!("{arg0}: {e}\n"));
            ExitStatus::ERROR
        }
    };
    std::process::exit(exit_status.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::rc::Rc;
    use stsh_env::VirtualSystem;
    use stsh_env::job::{Pid, ProcessState};
    use stsh_env::system::r#virtual::{SystemState, Wakeup};

    fn virtual_env() -> (Env, Rc<RefCell<SystemState>>) {
        let system = VirtualSystem::new();
        let state = Rc::clone(&system.state);
        let mut env = Env::with_system(Box::new(system));
        env.init_job_control().unwrap();
        (env, state)
    }

    fn feed(state: &RefCell<SystemState>, input: &str) {
        state.borrow_mut().stdin.extend(input.bytes());
    }

    #[test]
    fn blank_line_does_nothing() {
        let (mut env, state) = virtual_env();
        assert_eq!(execute_line(&mut env, "  \n"), Continue(()));
        let state = state.borrow();
        assert!(state.processes.is_empty());
        assert_eq!(state.stderr, "");
    }

    #[test]
    fn parse_error_is_printed() {
        let (mut env, state) = virtual_env();
        assert_eq!(execute_line(&mut env, "ls |\n"), Continue(()));
        assert_eq!(state.borrow().stderr, "stsh: missing command\n");
        assert!(state.borrow().processes.is_empty());
    }

    #[test]
    fn exit_builtin_breaks() {
        let (mut env, _) = virtual_env();
        assert_eq!(execute_line(&mut env, "exit\n"), Break(ExitStatus::SUCCESS));
    }

    #[test]
    fn builtin_in_pipeline_is_rejected() {
        let (mut env, state) = virtual_env();
        assert_eq!(execute_line(&mut env, "jobs | cat\n"), Continue(()));
        assert_eq!(execute_line(&mut env, "exit &\n"), Continue(()));
        let state = state.borrow();
        assert!(state.processes.is_empty());
        assert_eq!(
            state.stderr,
            "stsh: jobs: cannot be used in a pipeline or with `&` or redirections\n\
             stsh: exit: cannot be used in a pipeline or with `&` or redirections\n"
        );
    }

    #[test]
    fn background_pipeline_is_admitted() {
        let (mut env, state) = virtual_env();
        assert_eq!(execute_line(&mut env, "sleep 100 &\n"), Continue(()));
        assert_eq!(state.borrow().stdout, "[1] 100\n");
        assert_eq!(env.jobs().len(), 1);
    }

    #[test]
    fn foreground_command_leaves_no_job() {
        let (mut env, state) = virtual_env();
        state.borrow_mut().wakeups.push_back(Wakeup::Exit(Pid::from_raw(100)));
        assert_eq!(execute_line(&mut env, "true\n"), Continue(()));
        assert!(env.jobs().is_empty());
    }

    #[test]
    fn launch_error_is_printed() {
        let (mut env, state) = virtual_env();
        state.borrow_mut().fork_budget = Some(0);
        assert_eq!(execute_line(&mut env, "sleep 1 &\n"), Continue(()));
        assert_matches!(
            state.borrow().stderr.as_str(),
            s if s.starts_with("stsh: cannot start a process: ")
        );
        assert!(env.jobs().is_empty());
    }

    #[test]
    fn loop_ends_at_end_of_input() {
        let (mut env, state) = virtual_env();
        feed(&state, "\n\n");
        let status = read_eval_loop(&mut env, &mut FdReader::default(), "$ ");
        assert_eq!(status, ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdout, "");
    }

    #[test]
    fn interactive_loop_prints_prompts() {
        let (mut env, state) = virtual_env();
        env.set_interactive(true);
        feed(&state, "\n");
        read_eval_loop(&mut env, &mut FdReader::default(), "$ ");
        assert_eq!(state.borrow().stdout, "$ $ \n");
    }

    #[test]
    fn loop_stops_at_exit_leaving_rest_of_input() {
        let (mut env, state) = virtual_env();
        feed(&state, "quit\njobs\n");
        let status = read_eval_loop(&mut env, &mut FdReader::default(), "$ ");
        assert_eq!(status, ExitStatus::SUCCESS);
        assert_eq!(state.borrow().stdin.len(), 5);
    }

    #[test]
    fn loop_reports_finished_background_job_before_next_line() {
        let (mut env, state) = virtual_env();
        feed(&state, "sleep 1 &\n");
        let mut reader = FdReader::default();
        // The first iteration admits the job; the end of input follows.
        read_eval_loop(&mut env, &mut reader, "$ ");
        assert_eq!(env.jobs().len(), 1);

        state
            .borrow_mut()
            .change_state(Pid::from_raw(100), ProcessState::Terminated);
        feed(&state, "jobs\n");
        state.borrow_mut().stdout.clear();
        read_eval_loop(&mut env, &mut reader, "$ ");
        assert_eq!(state.borrow().stdout, "[1] Done\n");
        assert!(env.jobs().is_empty());
    }
}
