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

use serde_json::json;

use crate::hpi::{HpiError, HpiService};
use crate::inventory::{Inventory, SensorRef};
use crate::logger;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoReport {
    pub restored: Vec<SensorRef>,
    pub failed: Vec<(SensorRef, HpiError)>,
}

impl UndoReport {
    pub fn is_empty(&self) -> bool {
        self.restored.is_empty() && self.failed.is_empty()
    }
}

/// Write every modified sensor's first-observed thresholds back.
///
/// The modified flag is cleared whether or not the write succeeds, so a
/// failing sensor is not retried by the next undo.
pub fn undo_all<S: HpiService + ?Sized>(inventory: &mut Inventory, service: &mut S) -> UndoReport {
    let mut report = UndoReport::default();
    for at in inventory.modified_sensors() {
        let resource_id = inventory.resource(at).resource_id;
        let Some(sensor) = inventory.sensor_mut(at) else { continue };
        if let Some(original) = sensor.state.original() {
            match service.set_thresholds(resource_id, sensor.num, original) {
                Ok(()) => report.restored.push(at),
                Err(e) => report.failed.push((at, e)),
            }
        }
        sensor.state.clear_modified();
    }
    if !report.is_empty() {
        logger::log_event(
            "undo",
            json!({
                "restored": report.restored.len(),
                "failed": report.failed.iter().map(|(_, e)| e.to_string()).collect::<Vec<_>>(),
            }),
        );
    }
    report
}
