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

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use serde_json::json;

use hpithres::app::App;
use hpithres::commands;
use hpithres::config::{config_path, load_config, load_config_from, validate_config, ToolConfig};
use hpithres::console::Console;
use hpithres::logger;
use hpithres::simulator::SimulatedService;

const USAGE: &str = "Usage: hpithres [OPTIONS]

Options:
    --inventory <path>  HPI fixture to open the session on
    --config <path>     read settings from <path>
    --logging           write JSON event log
    --no-color          plain diagnostics
    -h, --help          print this help
    -V, --version       print version
";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    inventory: Option<PathBuf>,
    config: Option<PathBuf>,
    logging: bool,
    no_color: bool,
    help: bool,
    version: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--inventory" => {
                let v = it.next().ok_or_else(|| anyhow!("--inventory needs a path"))?;
                cli.inventory = Some(PathBuf::from(v));
            }
            "--config" => {
                let v = it.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                cli.config = Some(PathBuf::from(v));
            }
            "--logging" => cli.logging = true,
            "--no-color" => cli.no_color = true,
            "-h" | "--help" => cli.help = true,
            "-V" | "--version" => cli.version = true,
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(cli)
}

/// Command-line flags win over the config file.
fn apply_overrides(mut cfg: ToolConfig, cli: &CliArgs) -> anyhow::Result<ToolConfig> {
    if let Some(p) = &cli.inventory {
        cfg.inventory = Some(p.clone());
    }
    if cli.logging {
        cfg.logging = true;
    }
    if cli.no_color {
        cfg.color = false;
    }
    validate_config(&cfg).map_err(|e| anyhow!(e))?;
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(args.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprint!("{}", USAGE);
            std::process::exit(2);
        }
    };
    if cli.help {
        print!("{}", USAGE);
        return Ok(());
    }
    if cli.version {
        println!("hpithres {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let file_cfg = match &cli.config {
        Some(p) => load_config_from(p),
        None => load_config(),
    }
    .map_err(|e| anyhow!(e))
    .context("loading config")?;
    let cfg = apply_overrides(file_cfg, &cli)?;

    if cfg.logging {
        if let Some(p) = logger::init_logging(cfg.log_path.as_deref()) {
            logger::log_event("startup", json!({ "args": args, "log_path": p }));
        }
    }

    let fixture = cfg.inventory.clone().ok_or_else(|| {
        anyhow!(
            "no inventory to open; pass --inventory <path> or set \"inventory\" in {}",
            config_path().display()
        )
    })?;
    let mut service = SimulatedService::open(&fixture)
        .with_context(|| format!("saHpiSessionOpen on {}", fixture.display()))?;
    service.discover().context("saHpiDiscover")?;
    service.subscribe().context("saHpiSubscribe")?;

    let color = cfg.color && io::stderr().is_terminal();
    let out: Box<dyn Write> = Box::new(io::stdout());
    let err: Box<dyn Write> = Box::new(io::stderr());
    let console = Console::new(io::stdin().lock(), out, err).with_color(color);

    let mut app = App::discover(service, cfg, console);
    let res = commands::run(&mut app);

    let (_, mut service, _) = app.into_parts();
    service.close();
    logger::log_event("shutdown", json!({ "ok": res.is_ok() }));
    logger::shutdown_logging();
    res
}
