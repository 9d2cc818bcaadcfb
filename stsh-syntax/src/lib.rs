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

//! Pipeline syntax for the stsh shell.
//!
//! This crate defines the value the job control engine consumes: a
//! [`Pipeline`](syntax::Pipeline) of [`Command`](syntax::Command)s with a
//! background flag and optional I/O redirections. See the [`syntax`] module for
//! the data types.
//!
//! The [`parser`] module turns one line of input into a pipeline. The parser is
//! deliberately small: words are separated by whitespace and the only
//! operators are `|`, `&`, `<` and `>`. There is no quoting, expansion, or
//! globbing.
//!
//! ```
//! use stsh_syntax::syntax::Pipeline;
//! let pipeline: Pipeline = "sort < in.txt | uniq -c &".parse().unwrap();
//! assert_eq!(pipeline.commands.len(), 2);
//! assert!(pipeline.background);
//! assert_eq!(pipeline.redirections.input.as_deref(), Some("in.txt"));
//! ```

pub mod parser;
pub mod syntax;
