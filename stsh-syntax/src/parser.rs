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

//! Line parser
//!
//! [`parse`] converts one line of input into a [`Pipeline`]. The line is split
//! into tokens: the operators `|`, `&`, `<` and `>`, and words, which are
//! maximal runs of other non-whitespace characters. Operators need not be
//! surrounded by whitespace, so `a|b&` and `a | b &` are equivalent.
//!
//! The grammar is:
//!
//! ```text
//! line     := [ command { "|" command } [ "&" ] ]
//! command  := word { word | redirect }
//! redirect := ( "<" | ">" ) word
//! ```
//!
//! An input redirection is allowed only in the first command and an output
//! redirection only in the last.

use crate::syntax::{Command, MAX_ARGUMENTS, Pipeline};
use std::str::FromStr;
use thiserror::Error;

/// Error in [parsing](parse) a line
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum ParseError {
    /// A `|` is not preceded or followed by a command, or an operator appears
    /// where a command is expected.
    #[error("missing command")]
    MissingCommand,
    /// Something follows the `&` that ends a background pipeline.
    #[error("`&` must be at the end of the line")]
    UnexpectedAfterAmpersand,
    /// A `<` or `>` is not followed by a word.
    #[error("missing file name after `{0}`")]
    MissingRedirectionTarget(char),
    /// A `<` or `>` appears more than once.
    #[error("duplicate redirection `{0}`")]
    DuplicateRedirection(char),
    /// A `<` appears after the first command, or a `>` before the last.
    #[error("redirection `{0}` is not allowed in the middle of a pipeline")]
    MisplacedRedirection(char),
    /// A command has more than [`MAX_ARGUMENTS`] arguments.
    #[error("too many arguments to `{0}`")]
    TooManyArguments(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Operator(char),
}

fn is_operator(c: char) -> bool {
    matches!(c, '|' | '&' | '<' | '>')
}

fn tokenize(line: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() || is_operator(c) {
            if let Some(s) = start.take() {
                tokens.push(Token::Word(&line[s..i]));
            }
            if is_operator(c) {
                tokens.push(Token::Operator(c));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(Token::Word(&line[s..]));
    }
    tokens
}

/// Builder that accumulates the words of the command being parsed.
#[derive(Default)]
struct State {
    pipeline: Pipeline,
    words: Vec<String>,
    pending_redirection: Option<char>,
}

impl State {
    fn finish_command(&mut self) -> Result<(), ParseError> {
        let mut words = std::mem::take(&mut self.words).into_iter();
        let name = words.next().ok_or(ParseError::MissingCommand)?;
        let args: Vec<String> = words.collect();
        if args.len() > MAX_ARGUMENTS {
            return Err(ParseError::TooManyArguments(name));
        }
        self.pipeline.commands.push(Command { name, args });
        Ok(())
    }

    fn redirect(&mut self, operator: char, target: &str) -> Result<(), ParseError> {
        let slot = match operator {
            '<' => &mut self.pipeline.redirections.input,
            _ => &mut self.pipeline.redirections.output,
        };
        if slot.is_some() {
            return Err(ParseError::DuplicateRedirection(operator));
        }
        *slot = Some(target.to_string());
        Ok(())
    }
}

/// Parses a line into a pipeline.
///
/// A line containing only whitespace yields a pipeline with no commands.
///
/// ```
/// # use stsh_syntax::parser::{parse, ParseError};
/// let pipeline = parse("sleep 100 &").unwrap();
/// assert_eq!(pipeline.commands[0].name, "sleep");
/// assert_eq!(pipeline.commands[0].args, ["100"]);
/// assert!(pipeline.background);
///
/// assert!(parse("   ").unwrap().is_empty());
/// assert_eq!(parse("ls |"), Err(ParseError::MissingCommand));
/// ```
pub fn parse(line: &str) -> Result<Pipeline, ParseError> {
    let mut state = State::default();

    for token in tokenize(line) {
        if state.pipeline.background {
            return Err(ParseError::UnexpectedAfterAmpersand);
        }
        match token {
            Token::Word(word) => match state.pending_redirection.take() {
                Some(operator) => state.redirect(operator, word)?,
                None => state.words.push(word.to_string()),
            },
            Token::Operator(operator) => {
                if let Some(pending) = state.pending_redirection {
                    return Err(ParseError::MissingRedirectionTarget(pending));
                }
                match operator {
                    '|' => {
                        if state.pipeline.redirections.output.is_some() {
                            return Err(ParseError::MisplacedRedirection('>'));
                        }
                        state.finish_command()?;
                    }
                    '&' => {
                        state.finish_command()?;
                        state.pipeline.background = true;
                    }
                    '<' if !state.pipeline.commands.is_empty() => {
                        return Err(ParseError::MisplacedRedirection('<'));
                    }
                    _ => state.pending_redirection = Some(operator),
                }
            }
        }
    }

    if let Some(pending) = state.pending_redirection {
        return Err(ParseError::MissingRedirectionTarget(pending));
    }
    if !state.pipeline.background {
        let blank = state.words.is_empty()
            && state.pipeline.commands.is_empty()
            && state.pipeline.redirections == Default::default();
        if !blank {
            state.finish_command()?;
        }
    }
    Ok(state.pipeline)
}

impl FromStr for Pipeline {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Pipeline, ParseError> {
        parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn tokenize_splits_operators_without_spaces() {
        assert_eq!(
            tokenize("a|b  c&"),
            [
                Token::Word("a"),
                Token::Operator('|'),
                Token::Word("b"),
                Token::Word("c"),
                Token::Operator('&'),
            ]
        );
    }

    #[test]
    fn blank_line() {
        let pipeline = parse(" \t ").unwrap();
        assert!(pipeline.is_empty());
        assert!(!pipeline.background);
    }

    #[test]
    fn simple_command_with_arguments() {
        let pipeline = parse("echo hello world").unwrap();
        assert_eq!(pipeline.commands, [Command {
            name: "echo".to_string(),
            args: vec!["hello".to_string(), "world".to_string()],
        }]);
        assert!(!pipeline.background);
    }

    #[test]
    fn two_stage_pipeline() {
        let pipeline = parse("cat file | grep x").unwrap();
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(pipeline.commands[0].name, "cat");
        assert_eq!(pipeline.commands[1].name, "grep");
        assert_eq!(pipeline.commands[1].args, ["x"]);
    }

    #[test]
    fn background_pipeline() {
        let pipeline = parse("sleep 100&").unwrap();
        assert!(pipeline.background);
        assert_eq!(pipeline.commands[0].args, ["100"]);
    }

    #[test]
    fn redirections_on_first_and_last_command() {
        let pipeline = parse("sort <in | uniq > out").unwrap();
        assert_eq!(pipeline.redirections.input.as_deref(), Some("in"));
        assert_eq!(pipeline.redirections.output.as_deref(), Some("out"));
        assert_eq!(pipeline.commands[0].args, [] as [String; 0]);
    }

    #[test]
    fn redirection_before_command_name() {
        let pipeline = parse("< in cat").unwrap();
        assert_eq!(pipeline.commands[0].name, "cat");
        assert_eq!(pipeline.redirections.input.as_deref(), Some("in"));
    }

    #[test]
    fn missing_commands() {
        assert_eq!(parse("| a"), Err(ParseError::MissingCommand));
        assert_eq!(parse("a | | b"), Err(ParseError::MissingCommand));
        assert_eq!(parse("&"), Err(ParseError::MissingCommand));
        assert_eq!(parse("> out"), Err(ParseError::MissingCommand));
    }

    #[test]
    fn ampersand_must_end_line() {
        assert_eq!(parse("a & b"), Err(ParseError::UnexpectedAfterAmpersand));
        assert_eq!(parse("a &&"), Err(ParseError::UnexpectedAfterAmpersand));
    }

    #[test]
    fn redirection_errors() {
        assert_eq!(parse("cat <"), Err(ParseError::MissingRedirectionTarget('<')));
        assert_eq!(parse("cat > | b"), Err(ParseError::MissingRedirectionTarget('>')));
        assert_eq!(parse("cat < a < b"), Err(ParseError::DuplicateRedirection('<')));
        assert_eq!(parse("a | b < in"), Err(ParseError::MisplacedRedirection('<')));
        assert_eq!(parse("a > out | b"), Err(ParseError::MisplacedRedirection('>')));
    }

    #[test]
    fn too_many_arguments() {
        let line = format!("echo{}", " x".repeat(MAX_ARGUMENTS));
        assert_matches!(parse(&line), Ok(_));
        let line = format!("echo{}", " x".repeat(MAX_ARGUMENTS + 1));
        assert_eq!(parse(&line), Err(ParseError::TooManyArguments("echo".to_string())));
    }

    #[test]
    fn display_round_trip_is_canonical() {
        let pipeline: Pipeline = "sort<in|uniq -c>out&".parse().unwrap();
        assert_eq!(pipeline.to_string(), "sort < in | uniq -c > out &");
    }
}
