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

//! In-process HPI backend serving a JSON fixture.
//!
//! A fixture lists resources with their records; sensor records may carry a
//! reading, a threshold structure and failure switches. Every service call
//! is counted and every accepted threshold write is kept, so callers can
//! check exactly what reached the "hardware".

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hpi::{
    EntryId, HpiError, HpiEvent, HpiService, RdrEntry, ResourceId, RptEntry, SensorNum,
    SensorReading, ThresholdSet,
};

pub const THRESHOLD_CHANGE_EVENT: &str = "sensor_threshold_change";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureRecord {
    pub rdr: RdrEntry,
    #[serde(default)]
    pub reading: Option<SensorReading>,
    #[serde(default)]
    pub thresholds: Option<ThresholdSet>,
    #[serde(default)]
    pub fail_reading: bool,
    #[serde(default)]
    pub fail_thresholds_get: bool,
    #[serde(default)]
    pub fail_thresholds_set: bool,
}

impl FixtureRecord {
    fn sensor_num(&self) -> Option<SensorNum> {
        self.rdr.sensor.as_ref().map(|s| s.num)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureResource {
    pub rpt: RptEntry,
    #[serde(default)]
    pub records: Vec<FixtureRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    #[serde(default)]
    pub resources: Vec<FixtureResource>,
    /// Queue a change event after each accepted threshold write.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_emit_events() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid fixture: {0}")]
    Invalid(String),
    #[error("session is closed")]
    Closed,
}

/// One accepted `set_thresholds` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub resource: ResourceId,
    pub num: SensorNum,
    pub thresholds: ThresholdSet,
}

#[derive(Debug)]
pub struct SimulatedService {
    fixture: Fixture,
    open: bool,
    discovered: bool,
    subscribed: bool,
    events: VecDeque<HpiEvent>,
    submissions: Vec<Submission>,
    calls: usize,
}

fn check_ids<I: Iterator<Item = u32>>(ids: I, what: &str) -> Result<(), SimulatorError> {
    let mut seen = HashSet::new();
    for id in ids {
        let entry = EntryId::new_raw(id);
        if entry.is_first() || entry.is_last() {
            return Err(SimulatorError::Invalid(format!("{} id {} is reserved", what, id)));
        }
        if !seen.insert(id) {
            return Err(SimulatorError::Invalid(format!("duplicate {} id {}", what, id)));
        }
    }
    Ok(())
}

pub fn validate_fixture(fixture: &Fixture) -> Result<(), SimulatorError> {
    check_ids(fixture.resources.iter().map(|r| r.rpt.entry_id.value()), "resource entry")?;
    let mut resource_ids = HashSet::new();
    for resource in &fixture.resources {
        if !resource_ids.insert(resource.rpt.resource_id) {
            return Err(SimulatorError::Invalid(format!(
                "duplicate resource id {}",
                resource.rpt.resource_id
            )));
        }
        check_ids(resource.records.iter().map(|r| r.rdr.record_id), "record")?;
        let mut nums = HashSet::new();
        for num in resource.records.iter().filter_map(FixtureRecord::sensor_num) {
            if !nums.insert(num) {
                return Err(SimulatorError::Invalid(format!(
                    "duplicate sensor {} on resource {}",
                    num,
                    resource.rpt.entry_id
                )));
            }
        }
    }
    Ok(())
}

impl SimulatedService {
    /// Load a fixture file and open a session on it.
    pub fn open(path: &Path) -> Result<Self, SimulatorError> {
        let text = fs::read_to_string(path).map_err(|source| SimulatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SimulatorError> {
        let fixture: Fixture = serde_json::from_str(text)?;
        Self::from_fixture(fixture)
    }

    pub fn from_fixture(fixture: Fixture) -> Result<Self, SimulatorError> {
        validate_fixture(&fixture)?;
        Ok(SimulatedService {
            fixture,
            open: true,
            discovered: false,
            subscribed: false,
            events: VecDeque::new(),
            submissions: Vec::new(),
            calls: 0,
        })
    }

    /// Refresh the presence table. Required once before the tables are walked.
    pub fn discover(&mut self) -> Result<(), SimulatorError> {
        if !self.open {
            return Err(SimulatorError::Closed);
        }
        self.discovered = true;
        Ok(())
    }

    pub fn subscribe(&mut self) -> Result<(), SimulatorError> {
        if !self.open {
            return Err(SimulatorError::Closed);
        }
        self.subscribed = true;
        Ok(())
    }

    pub fn close(&mut self) {
        self.open = false;
        self.subscribed = false;
        self.events.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Number of `HpiService` calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    pub fn thresholds_of(&self, resource: ResourceId, num: SensorNum) -> Option<&ThresholdSet> {
        self.fixture
            .resources
            .iter()
            .find(|r| r.rpt.resource_id == resource)?
            .records
            .iter()
            .find(|r| r.sensor_num() == Some(num))?
            .thresholds
            .as_ref()
    }

    fn begin_call(&mut self) -> Result<(), HpiError> {
        self.calls += 1;
        if !self.open {
            return Err(HpiError::InvalidParams("session is closed".to_string()));
        }
        Ok(())
    }

    fn resource(&self, id: ResourceId) -> Result<&FixtureResource, HpiError> {
        self.fixture
            .resources
            .iter()
            .find(|r| r.rpt.resource_id == id)
            .ok_or_else(|| HpiError::InvalidParams(format!("no resource {}", id)))
    }

    fn sensor_record(&self, id: ResourceId, num: SensorNum) -> Result<&FixtureRecord, HpiError> {
        self.resource(id)?
            .records
            .iter()
            .find(|r| r.sensor_num() == Some(num))
            .ok_or(HpiError::NotPresent)
    }

    fn sensor_record_mut(&mut self, id: ResourceId, num: SensorNum) -> Result<&mut FixtureRecord, HpiError> {
        self.fixture
            .resources
            .iter_mut()
            .find(|r| r.rpt.resource_id == id)
            .ok_or_else(|| HpiError::InvalidParams(format!("no resource {}", id)))?
            .records
            .iter_mut()
            .find(|r| r.sensor_num() == Some(num))
            .ok_or(HpiError::NotPresent)
    }
}

/// Position of `cursor` in a table keyed by `ids`, and the cursor following it.
fn walk(ids: &[u32], cursor: EntryId) -> Result<(usize, EntryId), HpiError> {
    let at = if cursor.is_first() {
        0
    } else {
        ids.iter()
            .position(|id| *id == cursor.value())
            .ok_or(HpiError::NotPresent)?
    };
    if at >= ids.len() {
        return Err(HpiError::NotPresent);
    }
    let next = ids.get(at + 1).map_or(EntryId::LAST, |id| EntryId::new_raw(*id));
    Ok((at, next))
}

impl HpiService for SimulatedService {
    fn next_resource(&mut self, cursor: EntryId) -> Result<(EntryId, RptEntry), HpiError> {
        self.begin_call()?;
        if !self.discovered {
            return Err(HpiError::NotPresent);
        }
        let ids: Vec<u32> = self.fixture.resources.iter().map(|r| r.rpt.entry_id.value()).collect();
        let (at, next) = walk(&ids, cursor)?;
        Ok((next, self.fixture.resources[at].rpt.clone()))
    }

    fn next_record(
        &mut self,
        resource: ResourceId,
        cursor: EntryId,
    ) -> Result<(EntryId, RdrEntry), HpiError> {
        self.begin_call()?;
        let res = self.resource(resource)?;
        let ids: Vec<u32> = res.records.iter().map(|r| r.rdr.record_id).collect();
        let (at, next) = walk(&ids, cursor)?;
        Ok((next, res.records[at].rdr.clone()))
    }

    fn get_reading(&mut self, resource: ResourceId, num: SensorNum) -> Result<SensorReading, HpiError> {
        self.begin_call()?;
        let record = self.sensor_record(resource, num)?;
        if record.fail_reading {
            return Err(HpiError::InvalidCmd);
        }
        Ok(record.reading.clone().unwrap_or_default())
    }

    fn get_thresholds(&mut self, resource: ResourceId, num: SensorNum) -> Result<ThresholdSet, HpiError> {
        self.begin_call()?;
        let record = self.sensor_record(resource, num)?;
        if record.fail_thresholds_get {
            return Err(HpiError::InvalidCmd);
        }
        record.thresholds.clone().ok_or(HpiError::InvalidCmd)
    }

    fn set_thresholds(
        &mut self,
        resource: ResourceId,
        num: SensorNum,
        thresholds: &ThresholdSet,
    ) -> Result<(), HpiError> {
        self.begin_call()?;
        let record = self.sensor_record_mut(resource, num)?;
        if record.fail_thresholds_set {
            return Err(HpiError::InvalidData("threshold write rejected".to_string()));
        }
        let Some(current) = record.thresholds.as_mut() else {
            return Err(HpiError::InvalidCmd);
        };
        *current = thresholds.clone();
        self.submissions.push(Submission {
            resource,
            num,
            thresholds: thresholds.clone(),
        });
        if self.subscribed && self.fixture.emit_events {
            self.events.push_back(HpiEvent {
                source: resource,
                sensor_num: Some(num),
                kind: THRESHOLD_CHANGE_EVENT.to_string(),
            });
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<HpiEvent>, HpiError> {
        self.begin_call()?;
        if !self.subscribed {
            return Err(HpiError::InvalidCmd);
        }
        Ok(self.events.pop_front())
    }
}
