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

//! Call contract of the platform hardware-management service.
//!
//! Everything the rest of the crate knows about the service goes through
//! [`HpiService`]. Text fields come back as fixed-capacity buffers with an
//! explicit length and must be converted with [`TextBuffer::to_text`] before
//! being stored anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capacity of a service text buffer, in bytes.
pub const TEXT_BUFFER_CAPACITY: usize = 255;

pub type SensorNum = u32;

/// Cursor used by the enumeration calls.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(u32);

impl EntryId {
    pub const FIRST: Self = Self(0);
    pub const LAST: Self = Self(u32::MAX);

    pub fn new_raw(value: u32) -> Self {
        Self(value)
    }

    pub fn is_first(&self) -> bool {
        self.0 == Self::FIRST.0
    }

    pub fn is_last(&self) -> bool {
        self.0 == Self::LAST.0
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity text as returned by the service. The bytes past
/// `data_length` are undefined and there is no terminator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TextBuffer {
    data_length: u8,
    data: [u8; TEXT_BUFFER_CAPACITY],
}

impl TextBuffer {
    /// Build a buffer from raw parts, exactly as the service would hand it over.
    pub fn from_raw(data: [u8; TEXT_BUFFER_CAPACITY], data_length: u8) -> Self {
        Self { data_length, data }
    }

    /// Copy `bytes` into a new buffer, truncating at capacity.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(TEXT_BUFFER_CAPACITY);
        let mut data = [0u8; TEXT_BUFFER_CAPACITY];
        data[..len].copy_from_slice(&bytes[..len]);
        Self { data_length: len as u8, data }
    }

    pub fn len(&self) -> usize {
        (self.data_length as usize).min(TEXT_BUFFER_CAPACITY)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Owned text cut at the reported length. Invalid UTF-8 is replaced.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextBuffer({:?})", self.to_text())
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<TextBuffer> for String {
    fn from(b: TextBuffer) -> Self {
        b.to_text()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Informational,
    Ok,
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::Major => "MAJOR",
            Severity::Minor => "MINOR",
            Severity::Informational => "INFORMATIONAL",
            Severity::Ok => "OK",
            Severity::Debug => "DEBUG",
        };
        f.write_str(s)
    }
}

/// One resource presence table entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RptEntry {
    pub entry_id: EntryId,
    pub resource_id: ResourceId,
    #[serde(default)]
    pub entity_path: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub failed: bool,
    pub tag: TextBuffer,
}

fn default_severity() -> Severity {
    Severity::Ok
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Control,
    Sensor,
    Inventory,
    Watchdog,
    Annunciator,
    Dimi,
    Fumi,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Control => "Control",
            RecordKind::Sensor => "Sensor",
            RecordKind::Inventory => "Inventory",
            RecordKind::Watchdog => "Watchdog",
            RecordKind::Annunciator => "Annunciator",
            RecordKind::Dimi => "DIMI",
            RecordKind::Fumi => "FUMI",
        };
        f.write_str(s)
    }
}

/// Sensor-specific part of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecordInfo {
    pub num: SensorNum,
    #[serde(default)]
    pub sensor_type: String,
    #[serde(default)]
    pub base_units: String,
}

/// One resource data record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdrEntry {
    pub record_id: u32,
    pub kind: RecordKind,
    pub id_string: TextBuffer,
    #[serde(default)]
    pub sensor: Option<SensorRecordInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingValue {
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Buffer(String),
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingValue::Int64(v) => write!(f, "{}", v),
            ReadingValue::Uint64(v) => write!(f, "{}", v),
            ReadingValue::Float64(v) => write!(f, "{:.3}", v),
            ReadingValue::Buffer(s) => f.write_str(s),
        }
    }
}

/// A sensor reading or one threshold slot. The value is meaningless when
/// `is_supported` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub is_supported: bool,
    pub value: ReadingValue,
}

impl SensorReading {
    pub fn unsupported() -> Self {
        Self { is_supported: false, value: ReadingValue::Float64(0.0) }
    }

    pub fn float(v: f64) -> Self {
        Self { is_supported: true, value: ReadingValue::Float64(v) }
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::unsupported()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ThresholdField {
    LowCritical,
    LowMajor,
    LowMinor,
    UpCritical,
    UpMajor,
    UpMinor,
    PosHysteresis,
    NegHysteresis,
}

impl ThresholdField {
    pub const ALL: [ThresholdField; 8] = [
        ThresholdField::LowCritical,
        ThresholdField::LowMajor,
        ThresholdField::LowMinor,
        ThresholdField::UpCritical,
        ThresholdField::UpMajor,
        ThresholdField::UpMinor,
        ThresholdField::PosHysteresis,
        ThresholdField::NegHysteresis,
    ];

    /// Two-letter operator code.
    pub fn code(self) -> &'static str {
        match self {
            ThresholdField::LowCritical => "lc",
            ThresholdField::LowMajor => "la",
            ThresholdField::LowMinor => "li",
            ThresholdField::UpCritical => "uc",
            ThresholdField::UpMajor => "ua",
            ThresholdField::UpMinor => "ui",
            ThresholdField::PosHysteresis => "ph",
            ThresholdField::NegHysteresis => "nh",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThresholdField::LowCritical => "Lower Critical Threshold",
            ThresholdField::LowMajor => "Lower Major Threshold",
            ThresholdField::LowMinor => "Lower Minor Threshold",
            ThresholdField::UpCritical => "Upper Critical Threshold",
            ThresholdField::UpMajor => "Upper Major Threshold",
            ThresholdField::UpMinor => "Upper Minor Threshold",
            ThresholdField::PosHysteresis => "Positive Threshold Hysteresis",
            ThresholdField::NegHysteresis => "Negative Threshold Hysteresis",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.code() == code)
    }
}

impl fmt::Display for ThresholdField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.code())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("threshold {0} isn't supported")]
    Unsupported(ThresholdField),
    #[error("value {value} cannot be stored in threshold {field} ({kind})")]
    NotRepresentable {
        field: ThresholdField,
        value: f64,
        kind: &'static str,
    },
}

/// The full threshold structure of one sensor. The service reads and
/// replaces it as a unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdSet {
    #[serde(default)]
    pub low_critical: SensorReading,
    #[serde(default)]
    pub low_major: SensorReading,
    #[serde(default)]
    pub low_minor: SensorReading,
    #[serde(default)]
    pub up_critical: SensorReading,
    #[serde(default)]
    pub up_major: SensorReading,
    #[serde(default)]
    pub up_minor: SensorReading,
    #[serde(default)]
    pub pos_hysteresis: SensorReading,
    #[serde(default)]
    pub neg_hysteresis: SensorReading,
}

impl ThresholdSet {
    pub fn get(&self, field: ThresholdField) -> &SensorReading {
        match field {
            ThresholdField::LowCritical => &self.low_critical,
            ThresholdField::LowMajor => &self.low_major,
            ThresholdField::LowMinor => &self.low_minor,
            ThresholdField::UpCritical => &self.up_critical,
            ThresholdField::UpMajor => &self.up_major,
            ThresholdField::UpMinor => &self.up_minor,
            ThresholdField::PosHysteresis => &self.pos_hysteresis,
            ThresholdField::NegHysteresis => &self.neg_hysteresis,
        }
    }

    fn get_mut(&mut self, field: ThresholdField) -> &mut SensorReading {
        match field {
            ThresholdField::LowCritical => &mut self.low_critical,
            ThresholdField::LowMajor => &mut self.low_major,
            ThresholdField::LowMinor => &mut self.low_minor,
            ThresholdField::UpCritical => &mut self.up_critical,
            ThresholdField::UpMajor => &mut self.up_major,
            ThresholdField::UpMinor => &mut self.up_minor,
            ThresholdField::PosHysteresis => &mut self.pos_hysteresis,
            ThresholdField::NegHysteresis => &mut self.neg_hysteresis,
        }
    }

    pub fn is_supported(&self, field: ThresholdField) -> bool {
        self.get(field).is_supported
    }

    /// Overwrite the value of one supported field, keeping the value variant
    /// the hardware reported for it.
    pub fn set_value(&mut self, field: ThresholdField, value: f64) -> Result<(), ValueError> {
        let slot = self.get_mut(field);
        if !slot.is_supported {
            return Err(ValueError::Unsupported(field));
        }
        let not_representable = |kind| ValueError::NotRepresentable { field, value, kind };
        // 2^63 and 2^64 are exact in f64
        let two_63 = 9_223_372_036_854_775_808.0_f64;
        slot.value = match slot.value {
            ReadingValue::Float64(_) => ReadingValue::Float64(value),
            ReadingValue::Int64(_) => {
                if value.fract() != 0.0 || value < -two_63 || value >= two_63 {
                    return Err(not_representable("int64"));
                }
                ReadingValue::Int64(value as i64)
            }
            ReadingValue::Uint64(_) => {
                if value.fract() != 0.0 || value < 0.0 || value >= 2.0 * two_63 {
                    return Err(not_representable("uint64"));
                }
                ReadingValue::Uint64(value as u64)
            }
            ReadingValue::Buffer(_) => return Err(not_representable("buffer")),
        };
        Ok(())
    }

    /// Fields whose supported flag or value differ between `self` and `other`.
    pub fn differing_fields(&self, other: &ThresholdSet) -> Vec<ThresholdField> {
        ThresholdField::ALL
            .iter()
            .copied()
            .filter(|f| self.get(*f) != other.get(*f))
            .collect()
    }
}

/// An asynchronous notification from the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpiEvent {
    pub source: ResourceId,
    #[serde(default)]
    pub sensor_num: Option<SensorNum>,
    pub kind: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HpiError {
    #[error("SA_ERR_HPI_NOT_PRESENT")]
    NotPresent,
    #[error("SA_ERR_HPI_INVALID_PARAMS: {0}")]
    InvalidParams(String),
    #[error("SA_ERR_HPI_INVALID_CMD")]
    InvalidCmd,
    #[error("SA_ERR_HPI_INVALID_DATA: {0}")]
    InvalidData(String),
    #[error("SA_ERR_HPI_BUSY")]
    Busy,
    #[error("SA_ERR_HPI_TIMEOUT")]
    Timeout,
    #[error("SA_ERR_HPI_INTERNAL_ERROR: {0}")]
    Internal(String),
}

/// Calls the tool makes against an open session. Session setup and
/// teardown happen outside of this trait.
#[cfg_attr(test, mockall::automock)]
pub trait HpiService {
    /// Returns the entry at `cursor` and the cursor of the next one;
    /// [`EntryId::LAST`] marks the end.
    fn next_resource(&mut self, cursor: EntryId) -> Result<(EntryId, RptEntry), HpiError>;

    fn next_record(
        &mut self,
        resource: ResourceId,
        cursor: EntryId,
    ) -> Result<(EntryId, RdrEntry), HpiError>;

    fn get_reading(&mut self, resource: ResourceId, num: SensorNum) -> Result<SensorReading, HpiError>;

    fn get_thresholds(&mut self, resource: ResourceId, num: SensorNum) -> Result<ThresholdSet, HpiError>;

    /// Replaces the whole threshold structure of the sensor.
    fn set_thresholds(
        &mut self,
        resource: ResourceId,
        num: SensorNum,
        thresholds: &ThresholdSet,
    ) -> Result<(), HpiError>;

    /// Non-blocking; `Ok(None)` when nothing is queued.
    fn poll_event(&mut self) -> Result<Option<HpiEvent>, HpiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_set() -> ThresholdSet {
        ThresholdSet {
            low_critical: SensorReading::float(5.0),
            low_major: SensorReading::float(8.0),
            low_minor: SensorReading::float(10.0),
            up_critical: SensorReading { is_supported: true, value: ReadingValue::Int64(90) },
            up_major: SensorReading { is_supported: true, value: ReadingValue::Uint64(80) },
            up_minor: SensorReading { is_supported: true, value: ReadingValue::Buffer("70".into()) },
            pos_hysteresis: SensorReading::unsupported(),
            neg_hysteresis: SensorReading::float(1.0),
        }
    }

    #[test]
    fn test_entry_id_sentinels() {
        assert!(EntryId::FIRST.is_first());
        assert!(EntryId::LAST.is_last());
        assert!(!EntryId::new_raw(7).is_last());
        assert_eq!(EntryId::new_raw(7).value(), 7);
    }

    #[test]
    fn test_text_buffer_cut_at_length() {
        let mut data = [b'X'; TEXT_BUFFER_CAPACITY];
        data[..4].copy_from_slice(b"CPU0");
        let buf = TextBuffer::from_raw(data, 4);
        assert_eq!(buf.to_text(), "CPU0");
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_text_buffer_full_capacity_has_no_terminator() {
        let buf = TextBuffer::from_raw([b'a'; TEXT_BUFFER_CAPACITY], 255);
        assert_eq!(buf.to_text().len(), TEXT_BUFFER_CAPACITY);
    }

    #[test]
    fn test_text_buffer_truncates_long_input() {
        let long = "b".repeat(400);
        let buf = TextBuffer::from(long.as_str());
        assert_eq!(buf.len(), TEXT_BUFFER_CAPACITY);
    }

    #[test]
    fn test_text_buffer_invalid_utf8_is_replaced() {
        let buf = TextBuffer::from_bytes(&[b'o', b'k', 0xff]);
        assert_eq!(buf.to_text(), "ok\u{fffd}");
    }

    #[test]
    fn test_text_buffer_deserializes_from_string() {
        let buf: TextBuffer = serde_json::from_str("\"Fan Tray\"").unwrap();
        assert_eq!(buf.to_text(), "Fan Tray");
        assert_eq!(serde_json::to_string(&buf).unwrap(), "\"Fan Tray\"");
    }

    #[test]
    fn test_threshold_field_codes() {
        for field in ThresholdField::ALL {
            assert_eq!(ThresholdField::from_code(field.code()), Some(field));
        }
        assert_eq!(ThresholdField::from_code("li"), Some(ThresholdField::LowMinor));
        assert_eq!(ThresholdField::from_code("LI"), None);
        assert_eq!(ThresholdField::from_code("lix"), None);
        assert_eq!(ThresholdField::from_code(""), None);
    }

    #[test]
    fn test_set_value_float_changes_only_that_field() {
        let before = full_set();
        let mut after = before.clone();
        after.set_value(ThresholdField::LowMinor, 15.0).unwrap();
        assert_eq!(after.low_minor.value, ReadingValue::Float64(15.0));
        assert_eq!(after.differing_fields(&before), vec![ThresholdField::LowMinor]);
    }

    #[test]
    fn test_set_value_keeps_integer_variants() {
        let mut set = full_set();
        set.set_value(ThresholdField::UpCritical, 95.0).unwrap();
        assert_eq!(set.up_critical.value, ReadingValue::Int64(95));
        set.set_value(ThresholdField::UpMajor, 85.0).unwrap();
        assert_eq!(set.up_major.value, ReadingValue::Uint64(85));
    }

    #[test]
    fn test_set_value_rejects_unrepresentable() {
        let mut set = full_set();
        assert!(matches!(
            set.set_value(ThresholdField::UpCritical, 95.5),
            Err(ValueError::NotRepresentable { kind: "int64", .. })
        ));
        assert!(matches!(
            set.set_value(ThresholdField::UpMajor, -1.0),
            Err(ValueError::NotRepresentable { kind: "uint64", .. })
        ));
        assert!(matches!(
            set.set_value(ThresholdField::UpMinor, 1.0),
            Err(ValueError::NotRepresentable { kind: "buffer", .. })
        ));
        assert_eq!(set, full_set());
    }

    #[test]
    fn test_set_value_rejects_unsupported() {
        let mut set = full_set();
        assert_eq!(
            set.set_value(ThresholdField::PosHysteresis, 2.0),
            Err(ValueError::Unsupported(ThresholdField::PosHysteresis))
        );
    }

    #[test]
    fn test_reading_value_display() {
        assert_eq!(ReadingValue::Float64(10.0).to_string(), "10.000");
        assert_eq!(ReadingValue::Int64(-3).to_string(), "-3");
        assert_eq!(ReadingValue::Uint64(7).to_string(), "7");
        assert_eq!(ReadingValue::Buffer("n/a".into()).to_string(), "n/a");
    }

    #[test]
    fn test_reading_value_json_shape() {
        let r: SensorReading =
            serde_json::from_str(r#"{"is_supported": true, "value": {"float64": 42.5}}"#).unwrap();
        assert_eq!(r, SensorReading::float(42.5));
    }

    #[test]
    fn test_hpi_error_display() {
        assert_eq!(HpiError::NotPresent.to_string(), "SA_ERR_HPI_NOT_PRESENT");
        assert!(HpiError::Internal("boom".into()).to_string().contains("boom"));
    }
}
