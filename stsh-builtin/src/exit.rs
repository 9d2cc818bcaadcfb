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

//! Exit built-in
//!
//! The **`exit`** built-in (also available as **`quit`**) causes the shell to
//! exit with exit status 0.
//!
//! # Synopsis
//!
//! ```sh
//! exit
//! quit
//! ```
//!
//! # Description
//!
//! The shell exits immediately without waiting for or killing its jobs.
//! Operands are ignored.

use crate::Result;
use std::ops::ControlFlow::Break;
use stsh_env::Env;
use stsh_env::semantics::ExitStatus;

/// Entry point of the exit built-in
pub fn main(_env: &mut Env, _args: &[String]) -> Result {
    Ok(Break(ExitStatus::SUCCESS))
}
