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

use std::io::{self, Write};

use crate::hpi::{SensorReading, ThresholdField, ThresholdSet};
use crate::inventory::{Record, Resource, Sensor};

pub fn write_resource_line<W: Write>(w: &mut W, index: usize, resource: &Resource) -> io::Result<()> {
    writeln!(
        w,
        "{:3} RPT: id = {:3}  ResourceId = {:3}  Tag = {}",
        index, resource.entry_id, resource.resource_id.0, resource.tag
    )
}

pub fn write_resource_detail<W: Write>(w: &mut W, resource: &Resource) -> io::Result<()> {
    let sensors = resource.sensors().count();
    writeln!(w, "    Entry Id: {}", resource.entry_id)?;
    writeln!(w, "    Resource Id: {}", resource.resource_id)?;
    if !resource.entity_path.is_empty() {
        writeln!(w, "    Entity Path: {}", resource.entity_path)?;
    }
    writeln!(w, "    Severity: {}", resource.severity)?;
    writeln!(w, "    Failed: {}", if resource.failed { "TRUE" } else { "FALSE" })?;
    writeln!(w, "    Tag: {}", resource.tag)?;
    writeln!(w, "    Records: {} ({} sensors)", resource.records.len(), sensors)
}

pub fn write_record_line<W: Write>(w: &mut W, index: usize, record: &Record) -> io::Result<()> {
    writeln!(w, "    {:3} RDR: id = {:3}  Data = {}", index, record.record_id, record.label)
}

pub fn write_record_detail<W: Write>(w: &mut W, record: &Record) -> io::Result<()> {
    writeln!(w, "        Record Id: {}", record.record_id)?;
    writeln!(w, "        Type: {}", record.kind)?;
    writeln!(w, "        Id String: {}", record.label)?;
    if let Some(sensor) = &record.sensor {
        writeln!(w, "        Sensor Num: {}", sensor.num)?;
        if !sensor.sensor_type.is_empty() {
            writeln!(w, "        Sensor Type: {}", sensor.sensor_type)?;
        }
        if !sensor.units.is_empty() {
            writeln!(w, "        Base Units: {}", sensor.units)?;
        }
    }
    Ok(())
}

pub fn write_sensor_line<W: Write>(
    w: &mut W,
    entry_id: u32,
    record: &Record,
    sensor: &Sensor,
) -> io::Result<()> {
    writeln!(
        w,
        "    RPT id = {:3} RDR id = {:3}  sensornum = {:3}  Data = {}",
        entry_id, record.record_id, sensor.num, record.label
    )
}

pub fn write_sensors_for_resource<W: Write>(w: &mut W, resource: &Resource) -> io::Result<()> {
    for (record, sensor) in resource.sensors() {
        write_sensor_line(w, resource.entry_id, record, sensor)?;
    }
    Ok(())
}

pub fn write_reading<W: Write>(w: &mut W, reading: &SensorReading, units: &str) -> io::Result<()> {
    if !reading.is_supported {
        return writeln!(w, "Reading value: not supported");
    }
    if units.is_empty() {
        writeln!(w, "Reading value: {}", reading.value)
    } else {
        writeln!(w, "Reading value: {} {}", reading.value, units)
    }
}

/// Only supported slots are listed.
pub fn write_thresholds<W: Write>(w: &mut W, thresholds: &ThresholdSet) -> io::Result<()> {
    writeln!(w, "    Supported Thresholds:")?;
    for field in ThresholdField::ALL {
        let slot = thresholds.get(field);
        if slot.is_supported {
            writeln!(w, "      {}: {}", field, slot.value)?;
        }
    }
    writeln!(w)
}
