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

//! The read-dispatch loop and its command table.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::app::App;
use crate::hpi::HpiService;
use crate::mutation::ThresholdWizard;
use crate::query;
use crate::undo;

pub const PROMPT: &str = "==> ";

pub const HELP_TEXT: &str = "Available commands:
	exit, quit, q		- exit
	help, h			- this instruction
	rpt			- show all RPT entries
	rpt <id>		- show #id RPT entry
	rdr			- show all RDR entries
	rdr <rptid>		- show RDRs entries for #rptid
	rdr <rptid> <rdrid>	- show #rdrid RDR entry for #rptid
	sen			- show all sensors
	sen <rptid>		- show sensors for #rptid
	sen <rptid> <num>	- show #num sensor for #rptid
	mod			- modify thresholds
	undo			- delete all changes
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Rpt,
    Rdr,
    Sen,
    Mod,
    Undo,
}

const COMMANDS: &[(&str, Command)] = &[
    ("quit", Command::Exit),
    ("q", Command::Exit),
    ("exit", Command::Exit),
    ("help", Command::Help),
    ("h", Command::Help),
    ("rpt", Command::Rpt),
    ("rdr", Command::Rdr),
    ("sen", Command::Sen),
    ("mod", Command::Mod),
    ("undo", Command::Undo),
];

impl Command {
    pub fn lookup(token: &str) -> Option<Command> {
        COMMANDS.iter().find(|(name, _)| *name == token).map(|(_, c)| *c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Empty,
    Command(Command, String),
    Unknown(String),
}

pub fn parse_line(line: &str) -> ParsedLine {
    let line: String = line
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect();
    let line = line.trim_start_matches(' ');
    if line.is_empty() {
        return ParsedLine::Empty;
    }
    let (token, rest) = match line.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (line, ""),
    };
    match Command::lookup(token) {
        Some(cmd) => ParsedLine::Command(cmd, rest.to_string()),
        None => ParsedLine::Unknown(token.to_string()),
    }
}

/// Handle one input line. Returns `false` when the session should end.
pub fn dispatch<S: HpiService, R: BufRead, W: Write>(app: &mut App<S, R, W>, line: &str) -> Result<bool> {
    let (cmd, args) = match parse_line(line) {
        ParsedLine::Empty => return Ok(true),
        ParsedLine::Unknown(token) => {
            let out = app.console.out();
            writeln!(out, "Invalid command: {}", token)?;
            write!(out, "{}", HELP_TEXT)?;
            return Ok(true);
        }
        ParsedLine::Command(cmd, args) => (cmd, args),
    };
    match cmd {
        Command::Exit => return Ok(false),
        Command::Help => write!(app.console.out(), "{}", HELP_TEXT)?,
        Command::Rpt => query::show_resources(app, &args)?,
        Command::Rdr => query::show_records(app, &args)?,
        Command::Sen => query::show_sensors(app, &args)?,
        Command::Mod => {
            ThresholdWizard::run(app).context("threshold wizard")?;
        }
        Command::Undo => {
            let report = undo::undo_all(&mut app.inventory, &mut app.service);
            for (at, e) in &report.failed {
                let resource = app.inventory.resource(*at);
                let num = app.inventory.sensor(*at).map(|s| s.num).unwrap_or_default();
                let msg = format!(
                    "undo: sensor {} for rpt {}: sensor thresholds set returned {}",
                    num, resource.entry_id, e
                );
                app.console.diag(&msg)?;
            }
            writeln!(
                app.console.out(),
                "Restored {} sensor(s), {} failed",
                report.restored.len(),
                report.failed.len()
            )?;
        }
    }
    Ok(true)
}

/// Print the help once, then read and dispatch lines until `exit` or end of
/// input.
pub fn run<S: HpiService, R: BufRead, W: Write>(app: &mut App<S, R, W>) -> Result<()> {
    write!(app.console.out(), "{}", HELP_TEXT).context("writing help")?;
    loop {
        let Some(line) = app.console.prompt(PROMPT).context("reading command")? else {
            writeln!(app.console.out())?;
            break;
        };
        if !dispatch(app, &line)? {
            break;
        }
    }
    app.console.out().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpi::{HpiError, MockHpiService, SensorReading};
    use crate::test_utils::test_utils::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line(""), ParsedLine::Empty);
        assert_eq!(parse_line(" \t "), ParsedLine::Empty);
        assert_eq!(parse_line("rpt"), ParsedLine::Command(Command::Rpt, String::new()));
        assert_eq!(parse_line("\trdr\t3 7"), ParsedLine::Command(Command::Rdr, "3 7".into()));
        assert_eq!(parse_line("sen 5 12"), ParsedLine::Command(Command::Sen, "5 12".into()));
        assert_eq!(parse_line("RPT"), ParsedLine::Unknown("RPT".into()));
        assert_eq!(parse_line("quitnow"), ParsedLine::Unknown("quitnow".into()));
    }

    #[test]
    fn test_lookup_aliases() {
        for alias in ["quit", "q", "exit"] {
            assert_eq!(Command::lookup(alias), Some(Command::Exit));
        }
        assert_eq!(Command::lookup("h"), Some(Command::Help));
        assert_eq!(Command::lookup("modify"), None);
    }

    #[test]
    fn test_unknown_command_prints_help_and_continues() {
        let mut app = test_app(MockHpiService::new(), "");
        assert!(dispatch(&mut app, "frobnicate 1").unwrap());
        let (out, err) = output(app);
        assert!(out.starts_with("Invalid command: frobnicate\n"));
        assert!(out.contains("Available commands:"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_exit_aliases_end_loop() {
        for line in ["quit", "q", "exit", "  exit  "] {
            let mut app = test_app(MockHpiService::new(), "");
            assert!(!dispatch(&mut app, line).unwrap());
        }
    }

    #[test]
    fn test_run_prints_help_and_stops_at_eof() {
        let mut app = test_app(MockHpiService::new(), "\nrpt 5\n");
        run(&mut app).unwrap();
        let (out, _) = output(app);
        assert!(out.starts_with("Available commands:"));
        assert_eq!(out.matches(PROMPT).count(), 3);
        assert!(out.contains("Tag: Blade 5"));
    }

    #[test]
    fn test_run_stops_at_quit() {
        let mut app = test_app(MockHpiService::new(), "q\nrpt 5\n");
        run(&mut app).unwrap();
        let (out, _) = output(app);
        assert!(!out.contains("Tag: Blade 5"));
    }

    #[test]
    fn test_undo_with_nothing_modified() {
        let mut app = test_app(MockHpiService::new(), "");
        dispatch(&mut app, "undo").unwrap();
        let (out, _) = output(app);
        assert!(out.contains("Restored 0 sensor(s), 0 failed"));
    }

    #[test]
    fn test_undo_reports_failures() {
        let mut mock = MockHpiService::new();
        mock.expect_set_thresholds()
            .returning(|_, _, _| Err(HpiError::Busy));
        let mut app = test_app(mock, "");
        let at = app.inventory.find_sensor(5, 12).unwrap();
        let sensor = app.inventory.sensor_mut(at).unwrap();
        sensor.state.seed_original(&sample_thresholds());
        sensor.state.mark_modified();

        dispatch(&mut app, "undo").unwrap();
        assert!(app.inventory.modified_sensors().is_empty());
        let (out, err) = output(app);
        assert!(out.contains("Restored 0 sensor(s), 1 failed"));
        assert!(err.contains("sensor 12 for rpt 5"));
        assert!(err.contains("SA_ERR_HPI_BUSY"));
    }

    #[test]
    fn test_mod_then_undo_session() {
        let mut mock = MockHpiService::new();
        mock.expect_get_reading()
            .returning(|_, _| Ok(SensorReading::float(35.0)));
        mock.expect_get_thresholds()
            .returning(|_, _| Ok(sample_thresholds()));
        let mut seq = mockall::Sequence::new();
        mock.expect_set_thresholds()
            .withf(|_, _, t| *t != sample_thresholds())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        mock.expect_set_thresholds()
            .withf(|_, _, t| *t == sample_thresholds())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        mock.expect_poll_event().returning(|| Ok(None));

        let mut app = test_app(mock, "mod\n5\n12\nli\n15.0\nyes\nundo\nundo\nquit\n");
        app.config.ack_attempts = 1;
        run(&mut app).unwrap();
        assert!(app.inventory.modified_sensors().is_empty());
        let (out, _) = output(app);
        assert!(out.contains("Restored 1 sensor(s), 0 failed"));
        assert!(out.contains("Restored 0 sensor(s), 0 failed"));
    }
}
