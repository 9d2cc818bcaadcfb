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

//! Command line argument parser for the shell
//!
//! The shell accepts the following options:
//!
//! - `-i`, `--interactive`: print prompts and manage the terminal even if the
//!   standard input is not a terminal
//! - `-p PROMPT`, `--prompt=PROMPT`: use `PROMPT` instead of the default prompt
//! - `-h`, `--help`: print usage and exit
//! - `-V`, `--version`: print version information and exit
//!
//! Short options can be combined (`-ip '$ '`). A long option name can be
//! abbreviated as long as it is unambiguous. The shell takes no operands.

use thiserror::Error;

/// Configuration for starting the main read-eval loop
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Run {
    /// Command name the shell was invoked with
    pub arg0: String,
    /// Whether the `-i` option was given
    pub interactive: bool,
    /// Prompt given by the `-p` option
    pub prompt: Option<String>,
}

/// Parse result
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Parse {
    /// Runs the shell
    Run(Run),
    /// Prints help message and exit
    Help,
    /// Prints version information and exit
    Version,
}

impl From<Run> for Parse {
    fn from(run: Run) -> Self {
        Parse::Run(run)
    }
}

/// Error in command line parsing
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// Short option that is not defined
    #[error("unknown option `-{0}`")]
    UnknownShortOption(char),

    /// Long option that is not defined
    #[error("unknown option `--{0}`")]
    UnknownLongOption(String),

    /// Long option that matches the prefix of more than one option name
    #[error("ambiguous option name `--{0}`")]
    AmbiguousLongOption(String),

    /// Option missing an argument
    #[error("option `{0}` missing an argument")]
    MissingOptionArgument(String),

    /// Argument specified to an option that does not take an argument
    #[error("option `{0}` does not take an argument")]
    UnexpectedOptionArgument(String),

    /// Operand given to the shell
    #[error("unexpected operand `{0}`")]
    UnexpectedOperand(String),
}

/// Long option
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LongOption {
    Help,
    Interactive,
    Prompt,
    Version,
}

const LONG_OPTIONS: [(&str, LongOption); 4] = [
    ("help", LongOption::Help),
    ("interactive", LongOption::Interactive),
    ("prompt", LongOption::Prompt),
    ("version", LongOption::Version),
];

impl LongOption {
    fn from_name(name: &str) -> Result<Self, Error> {
        let mut candidates = LONG_OPTIONS
            .iter()
            .filter(|(full_name, _)| full_name.starts_with(name));
        match (candidates.next(), candidates.next()) {
            (Some(&(_, option)), None) => Ok(option),
            (Some(_), Some(_)) => Err(Error::AmbiguousLongOption(name.to_string())),
            (None, _) => Err(Error::UnknownLongOption(name.to_string())),
        }
    }
}

/// Parses command line arguments.
///
/// The first item is the command name. Parsing stops at the first `-h` or
/// `-V` option.
pub fn parse<I, S>(args: I) -> Result<Parse, Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut result = Run {
        arg0: args.next().unwrap_or_default(),
        ..Run::default()
    };

    while let Some(arg) = args.next() {
        if arg == "--" {
            if let Some(operand) = args.next() {
                return Err(Error::UnexpectedOperand(operand));
            }
            break;
        }

        if let Some(long) = arg.strip_prefix("--") {
            let (name, value) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (long, None),
            };
            let option = LongOption::from_name(name)?;
            if option != LongOption::Prompt && value.is_some() {
                return Err(Error::UnexpectedOptionArgument(format!("--{name}")));
            }
            match option {
                LongOption::Help => return Ok(Parse::Help),
                LongOption::Version => return Ok(Parse::Version),
                LongOption::Interactive => result.interactive = true,
                LongOption::Prompt => {
                    let value = value.or_else(|| args.next());
                    let value =
                        value.ok_or_else(|| Error::MissingOptionArgument("--prompt".to_string()))?;
                    result.prompt = Some(value);
                }
            }
            continue;
        }

        if arg.len() < 2 || !arg.starts_with('-') {
            return Err(Error::UnexpectedOperand(arg));
        }
        let shorts = &arg[1..];
        for (index, c) in shorts.char_indices() {
            match c {
                'h' => return Ok(Parse::Help),
                'V' => return Ok(Parse::Version),
                'i' => result.interactive = true,
                'p' => {
                    let rest = &shorts[index + 1..];
                    let value = if rest.is_empty() {
                        args.next()
                            .ok_or_else(|| Error::MissingOptionArgument("-p".to_string()))?
                    } else {
                        rest.to_string()
                    };
                    result.prompt = Some(value);
                    break;
                }
                _ => return Err(Error::UnknownShortOption(c)),
            }
        }
    }

    Ok(result.into())
}

/// Usage message printed for the `--help` option
pub const USAGE: &str = "\
Usage: stsh [-i] [-p PROMPT]
  -i, --interactive    print prompts and hand the terminal to foreground jobs
  -p, --prompt=PROMPT  use PROMPT as the prompt
  -h, --help           print this help and exit
  -V, --version        print version information and exit
";
