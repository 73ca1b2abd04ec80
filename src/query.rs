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

//! `rpt`, `rdr` and `sen`: resolve the operator's ids against the inventory
//! and print what they name.

use std::io::{self, BufRead, Write};

use serde_json::json;

use crate::app::App;
use crate::display;
use crate::hpi::{HpiError, HpiService, ThresholdSet};
use crate::inventory::{Inventory, SensorRef};
use crate::logger;

/// What a command's integer arguments select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Resource(i64),
    Item(i64, i64),
}

impl Scope {
    /// Zero, one or two whitespace-separated integers. Anything else,
    /// including a stray word or a third number, selects everything.
    pub fn parse(args: &str) -> Scope {
        let mut ids = Vec::new();
        for tok in args.split_whitespace() {
            match tok.parse::<i64>() {
                Ok(v) => ids.push(v),
                Err(_) => return Scope::All,
            }
        }
        match ids.as_slice() {
            [rpt] => Scope::Resource(*rpt),
            [rpt, item] => Scope::Item(*rpt, *item),
            _ => Scope::All,
        }
    }
}

fn find_resource(inventory: &Inventory, id: i64) -> Option<usize> {
    u32::try_from(id).ok().and_then(|id| inventory.find_resource(id))
}

/// Lookup misses are ordinary answers, printed plainly on stdout.
fn not_found<R: BufRead, W: Write, S>(app: &mut App<S, R, W>, msg: &str) -> io::Result<()> {
    logger::log_event("not_found", json!({ "message": msg }));
    writeln!(app.console.out(), "{}", msg)
}

fn no_rpt<R: BufRead, W: Write, S>(app: &mut App<S, R, W>, id: i64) -> io::Result<()> {
    not_found(app, &format!("No RPT for id: {}", id))
}

pub fn show_resources<S: HpiService, R: BufRead, W: Write>(
    app: &mut App<S, R, W>,
    args: &str,
) -> io::Result<()> {
    let id = match Scope::parse(args) {
        Scope::All => {
            let out = app.console.out();
            for (i, resource) in app.inventory.resources.iter().enumerate() {
                display::write_resource_line(out, i, resource)?;
            }
            return Ok(());
        }
        Scope::Resource(id) | Scope::Item(id, _) => id,
    };
    match find_resource(&app.inventory, id) {
        Some(i) => display::write_resource_detail(app.console.out(), &app.inventory.resources[i]),
        None => no_rpt(app, id),
    }
}

pub fn show_records<S: HpiService, R: BufRead, W: Write>(
    app: &mut App<S, R, W>,
    args: &str,
) -> io::Result<()> {
    match Scope::parse(args) {
        Scope::All => {
            let out = app.console.out();
            for (i, resource) in app.inventory.resources.iter().enumerate() {
                display::write_resource_line(out, i, resource)?;
                for (j, record) in resource.records.iter().enumerate() {
                    display::write_record_line(out, j, record)?;
                }
            }
            Ok(())
        }
        Scope::Resource(id) => match find_resource(&app.inventory, id) {
            Some(i) => {
                let out = app.console.out();
                let resource = &app.inventory.resources[i];
                display::write_resource_line(out, i, resource)?;
                for (j, record) in resource.records.iter().enumerate() {
                    display::write_record_line(out, j, record)?;
                }
                Ok(())
            }
            None => no_rpt(app, id),
        },
        Scope::Item(id, rdr) => {
            let Some(i) = find_resource(&app.inventory, id) else {
                return no_rpt(app, id);
            };
            let resource = &app.inventory.resources[i];
            let found = u32::try_from(rdr).ok().and_then(|r| resource.find_record(r));
            match found {
                Some(j) => display::write_record_detail(app.console.out(), &resource.records[j]),
                None => not_found(app, &format!("No RDR {} for rpt {}", rdr, id)),
            }
        }
    }
}

pub fn show_sensors<S: HpiService, R: BufRead, W: Write>(
    app: &mut App<S, R, W>,
    args: &str,
) -> io::Result<()> {
    match Scope::parse(args) {
        Scope::All => {
            let out = app.console.out();
            for resource in &app.inventory.resources {
                display::write_sensors_for_resource(out, resource)?;
            }
            Ok(())
        }
        Scope::Resource(id) => match find_resource(&app.inventory, id) {
            Some(i) => display::write_sensors_for_resource(app.console.out(), &app.inventory.resources[i]),
            None => no_rpt(app, id),
        },
        Scope::Item(id, num) => {
            let Some(i) = find_resource(&app.inventory, id) else {
                return no_rpt(app, id);
            };
            let found = u32::try_from(num)
                .ok()
                .and_then(|n| app.inventory.resources[i].find_sensor(n));
            let Some(record) = found else {
                return not_found(app, &format!("No sensor {} for rpt {}", num, id));
            };
            let at = SensorRef { resource: i, record };
            display::write_record_detail(app.console.out(), &app.inventory.resources[i].records[record])?;
            show_reading(app, at)?;
            match fetch_thresholds(app, at) {
                Ok(thresholds) => {
                    let out = app.console.out();
                    writeln!(out, "  Thresholds:")?;
                    display::write_thresholds(out, &thresholds)
                }
                Err(e) => app.console.diag(&format!("sensor thresholds get returned {}", e)),
            }
        }
    }
}

/// Fetch and print the live reading. A failing call is reported and
/// otherwise ignored.
pub fn show_reading<S: HpiService, R: BufRead, W: Write>(
    app: &mut App<S, R, W>,
    at: SensorRef,
) -> io::Result<()> {
    let resource_id = app.inventory.resource(at).resource_id;
    let Some(sensor) = app.inventory.sensor_mut(at) else { return Ok(()) };
    match app.service.get_reading(resource_id, sensor.num) {
        Ok(reading) => {
            display::write_reading(app.console.out(), &reading, &sensor.units)?;
            sensor.state.last_reading = Some(reading);
            Ok(())
        }
        Err(e) => app.console.diag(&format!("sensor reading get returned {}", e)),
    }
}

/// Fetch the sensor's thresholds and seed its undo snapshot if this is the
/// first successful fetch.
pub fn fetch_thresholds<S: HpiService, R, W>(
    app: &mut App<S, R, W>,
    at: SensorRef,
) -> Result<ThresholdSet, HpiError> {
    let resource_id = app.inventory.resource(at).resource_id;
    let Some(sensor) = app.inventory.sensor_mut(at) else {
        return Err(HpiError::NotPresent);
    };
    let thresholds = app.service.get_thresholds(resource_id, sensor.num)?;
    sensor.state.seed_original(&thresholds);
    Ok(thresholds)
}
