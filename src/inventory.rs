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

use crate::hpi::{
    EntryId, HpiService, RdrEntry, RecordKind, ResourceId, RptEntry, SensorNum, SensorReading,
    Severity, ThresholdSet,
};
use crate::logger;

/// Live and cached state of one sensor.
#[derive(Debug, Clone, Default)]
pub struct SensorState {
    pub last_reading: Option<SensorReading>,
    original_thresholds: Option<ThresholdSet>,
    modified: bool,
}

impl SensorState {
    /// Remember `thresholds` as the pre-change snapshot unless one is
    /// already cached. Returns true when this call seeded the cache.
    pub fn seed_original(&mut self, thresholds: &ThresholdSet) -> bool {
        if self.original_thresholds.is_some() {
            return false;
        }
        self.original_thresholds = Some(thresholds.clone());
        true
    }

    pub fn original(&self) -> Option<&ThresholdSet> {
        self.original_thresholds.as_ref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// A sensor can only be flagged once its snapshot exists; returns false
    /// and leaves the flag alone otherwise.
    pub fn mark_modified(&mut self) -> bool {
        if self.original_thresholds.is_none() {
            return false;
        }
        self.modified = true;
        true
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }
}

#[derive(Debug, Clone)]
pub struct Sensor {
    pub num: SensorNum,
    pub sensor_type: String,
    pub units: String,
    pub state: SensorState,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub record_id: u32,
    pub kind: RecordKind,
    pub label: String,
    pub sensor: Option<Sensor>,
}

impl Record {
    pub(crate) fn from_entry(entry: RdrEntry) -> Self {
        let sensor = match (entry.kind, entry.sensor) {
            (RecordKind::Sensor, Some(info)) => Some(Sensor {
                num: info.num,
                sensor_type: info.sensor_type,
                units: info.base_units,
                state: SensorState::default(),
            }),
            _ => None,
        };
        Record {
            record_id: entry.record_id,
            kind: entry.kind,
            label: entry.id_string.to_text(),
            sensor,
        }
    }

    pub fn is_sensor(&self) -> bool {
        self.sensor.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub entry_id: u32,
    pub resource_id: ResourceId,
    pub tag: String,
    pub entity_path: String,
    pub severity: Severity,
    pub failed: bool,
    pub records: Vec<Record>,
}

impl Resource {
    pub(crate) fn from_entry(entry: RptEntry) -> Self {
        Resource {
            entry_id: entry.entry_id.value(),
            resource_id: entry.resource_id,
            tag: entry.tag.to_text(),
            entity_path: entry.entity_path,
            severity: entry.severity,
            failed: entry.failed,
            records: Vec::new(),
        }
    }

    pub fn find_record(&self, record_id: u32) -> Option<usize> {
        self.records.iter().position(|r| r.record_id == record_id)
    }

    pub fn find_sensor(&self, num: SensorNum) -> Option<usize> {
        self.records
            .iter()
            .position(|r| r.sensor.as_ref().map(|s| s.num) == Some(num))
    }

    pub fn sensors(&self) -> impl Iterator<Item = (&Record, &Sensor)> {
        self.records.iter().filter_map(|r| r.sensor.as_ref().map(|s| (r, s)))
    }
}

/// Index pair locating a sensor record inside the inventory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SensorRef {
    pub resource: usize,
    pub record: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoverySummary {
    pub resources: usize,
    pub records: usize,
    pub sensors: usize,
}

/// Every resource and record seen at startup, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub resources: Vec<Resource>,
}

impl Inventory {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Walk the resource table, then each resource's records. A failing
    /// call ends enumeration of that scope without retrying.
    pub fn discover<S: HpiService + ?Sized>(service: &mut S) -> Inventory {
        let mut inventory = Inventory::default();

        let mut cursor = EntryId::FIRST;
        while !cursor.is_last() {
            match service.next_resource(cursor) {
                Ok((next, entry)) => {
                    inventory.resources.push(Resource::from_entry(entry));
                    cursor = next;
                }
                Err(_) => break,
            }
        }

        for resource in inventory.resources.iter_mut() {
            let mut cursor = EntryId::FIRST;
            while !cursor.is_last() {
                match service.next_record(resource.resource_id, cursor) {
                    Ok((next, entry)) => {
                        resource.records.push(Record::from_entry(entry));
                        cursor = next;
                    }
                    Err(_) => break,
                }
            }
        }

        let summary = inventory.summary();
        logger::log_event(
            "discovery",
            json!({
                "resources": summary.resources,
                "records": summary.records,
                "sensors": summary.sensors,
            }),
        );
        inventory
    }

    pub fn summary(&self) -> DiscoverySummary {
        DiscoverySummary {
            resources: self.resources.len(),
            records: self.resources.iter().map(|r| r.records.len()).sum(),
            sensors: self.resources.iter().map(|r| r.sensors().count()).sum(),
        }
    }

    /// Look a resource up by its entry id, the number operators type.
    pub fn find_resource(&self, entry_id: u32) -> Option<usize> {
        self.resources.iter().position(|r| r.entry_id == entry_id)
    }

    pub fn find_sensor(&self, entry_id: u32, num: SensorNum) -> Option<SensorRef> {
        let resource = self.find_resource(entry_id)?;
        let record = self.resources[resource].find_sensor(num)?;
        Some(SensorRef { resource, record })
    }

    pub fn resource(&self, at: SensorRef) -> &Resource {
        &self.resources[at.resource]
    }

    pub fn sensor(&self, at: SensorRef) -> Option<&Sensor> {
        self.resources
            .get(at.resource)?
            .records
            .get(at.record)?
            .sensor
            .as_ref()
    }

    pub fn sensor_mut(&mut self, at: SensorRef) -> Option<&mut Sensor> {
        self.resources
            .get_mut(at.resource)?
            .records
            .get_mut(at.record)?
            .sensor
            .as_mut()
    }

    /// Every sensor currently flagged as modified.
    pub fn modified_sensors(&self) -> Vec<SensorRef> {
        let mut out = Vec::new();
        for (ri, resource) in self.resources.iter().enumerate() {
            for (di, record) in resource.records.iter().enumerate() {
                if record.sensor.as_ref().map_or(false, |s| s.state.is_modified()) {
                    out.push(SensorRef { resource: ri, record: di });
                }
            }
        }
        out
    }
}
