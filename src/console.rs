/*
 * This file is part of hpithres.
 *
 * Copyright (C) 2025 hpithres contributors
 *
 * hpithres is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hpithres is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hpithres. If not, see <https://www.gnu.org/licenses/>.
 */

//! Line-oriented operator I/O. Regular output and diagnostics go to two
//! separate writers; every diagnostic is also recorded in the event log.

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;
use serde_json::json;

use crate::logger;

/// Upper bound on one input line, in bytes.
pub const READ_BUF_SIZE: usize = 1024;

pub struct Console<R, W> {
    input: R,
    out: W,
    err: W,
    color: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W, err: W) -> Self {
        Console { input, out, err, color: false }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Next input line without its line terminator, or `None` at end of
    /// input. Bytes past [`READ_BUF_SIZE`] are discarded rather than kept,
    /// and bytes that are not UTF-8 are replaced.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line: Vec<u8> = Vec::with_capacity(READ_BUF_SIZE + 2);
        let mut seen_any = false;
        loop {
            let available = match self.input.fill_buf() {
                Ok(b) => b,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }
            seen_any = true;
            let (chunk, done) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => (&available[..=i], true),
                None => (available, false),
            };
            // room for the line plus a \r\n terminator
            let room = (READ_BUF_SIZE + 2).saturating_sub(line.len());
            line.extend_from_slice(&chunk[..chunk.len().min(room)]);
            let used = chunk.len();
            self.input.consume(used);
            if done {
                break;
            }
        }
        if !seen_any {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
            line.pop();
        }
        line.truncate(READ_BUF_SIZE);
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Print `msg` without a newline and read the answer.
    pub fn prompt(&mut self, msg: &str) -> io::Result<Option<String>> {
        if self.color {
            write!(self.out, "{}", msg.cyan())?;
        } else {
            write!(self.out, "{}", msg)?;
        }
        self.out.flush()?;
        self.read_line()
    }

    pub fn out(&mut self) -> &mut W {
        &mut self.out
    }

    /// Report a soft failure to the operator.
    pub fn diag(&mut self, msg: &str) -> io::Result<()> {
        logger::log_event("diagnostic", json!({ "message": msg }));
        self.out.flush()?;
        if self.color {
            writeln!(self.err, "{} {}", "ERROR:".red().bold(), msg)?;
        } else {
            writeln!(self.err, "ERROR: {}", msg)?;
        }
        self.err.flush()
    }

    pub fn into_parts(self) -> (R, W, W) {
        (self.input, self.out, self.err)
    }
}
