/*
 * Test utilities and mock helpers for hpithres
 *
 * Sample inventories, service entries and scripted consoles shared by the
 * unit tests of the individual modules.
 */

#[cfg(test)]
pub mod test_utils {
    use crate::app::App;
    use crate::config::ToolConfig;
    use crate::console::Console;
    use crate::hpi::{
        EntryId, HpiService, MockHpiService, RdrEntry, RecordKind, ResourceId, RptEntry,
        SensorReading, SensorRecordInfo, Severity, ThresholdSet,
    };
    use crate::inventory::{Inventory, Record, Resource};
    use std::io::Cursor;

    pub type TestConsole = Console<Cursor<Vec<u8>>, Vec<u8>>;
    pub type TestApp = App<MockHpiService, Cursor<Vec<u8>>, Vec<u8>>;

    /// Float thresholds with every slot but the positive hysteresis supported
    pub fn sample_thresholds() -> ThresholdSet {
        ThresholdSet {
            low_critical: SensorReading::float(5.0),
            low_major: SensorReading::float(8.0),
            low_minor: SensorReading::float(10.0),
            up_critical: SensorReading::float(90.0),
            up_major: SensorReading::float(80.0),
            up_minor: SensorReading::float(70.0),
            pos_hysteresis: SensorReading::unsupported(),
            neg_hysteresis: SensorReading::float(1.0),
        }
    }

    pub fn rpt_entry(entry: u32, resource_id: u32, tag: &str) -> RptEntry {
        RptEntry {
            entry_id: EntryId::new_raw(entry),
            resource_id: ResourceId(resource_id),
            entity_path: format!("{{SYSTEM_CHASSIS,{}}}", entry),
            severity: Severity::Ok,
            failed: false,
            tag: tag.into(),
        }
    }

    pub fn sensor_rdr(record_id: u32, num: u32, label: &str) -> RdrEntry {
        RdrEntry {
            record_id,
            kind: RecordKind::Sensor,
            id_string: label.into(),
            sensor: Some(SensorRecordInfo {
                num,
                sensor_type: "TEMPERATURE".to_string(),
                base_units: "Degrees C".to_string(),
            }),
        }
    }

    pub fn control_rdr(record_id: u32, label: &str) -> RdrEntry {
        RdrEntry {
            record_id,
            kind: RecordKind::Control,
            id_string: label.into(),
            sensor: None,
        }
    }

    fn resource_with(entry: RptEntry, records: Vec<RdrEntry>) -> Resource {
        let mut resource = Resource::from_entry(entry);
        resource.records = records.into_iter().map(Record::from_entry).collect();
        resource
    }

    /// Two resources:
    /// entry 3 (Chassis) with sensor 1 and a control record,
    /// entry 5 (Blade 5) with sensors 12 and 13.
    pub fn sample_inventory() -> Inventory {
        Inventory::new(vec![
            resource_with(
                rpt_entry(3, 103, "Chassis"),
                vec![sensor_rdr(1, 1, "Chassis Temp"), control_rdr(2, "Fan Control")],
            ),
            resource_with(
                rpt_entry(5, 105, "Blade 5"),
                vec![sensor_rdr(10, 12, "CPU Temp"), sensor_rdr(11, 13, "Inlet Temp")],
            ),
        ])
    }

    pub fn test_console(input: &str) -> TestConsole {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), Vec::new())
    }

    /// No pauses between acknowledgment polls and no colour codes.
    pub fn test_config() -> ToolConfig {
        ToolConfig { ack_interval_ms: 0, color: false, ..ToolConfig::default() }
    }

    pub fn test_app(mock: MockHpiService, input: &str) -> TestApp {
        App::new(sample_inventory(), mock, test_config(), test_console(input))
    }

    /// Consume the app and return what it wrote to stdout and stderr.
    pub fn output<S: HpiService>(app: App<S, Cursor<Vec<u8>>, Vec<u8>>) -> (String, String) {
        let (_, _, console) = app.into_parts();
        let (_, out, err) = console.into_parts();
        (
            String::from_utf8(out).expect("utf-8 stdout"),
            String::from_utf8(err).expect("utf-8 stderr"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::hpi::ThresholdField;

    #[test]
    fn test_sample_inventory_layout() {
        let inv = sample_inventory();
        assert_eq!(inv.resources.len(), 2);
        let summary = inv.summary();
        assert_eq!(summary.records, 4);
        assert_eq!(summary.sensors, 3);
        assert!(inv.find_sensor(3, 1).is_some());
        assert!(inv.find_sensor(5, 13).is_some());
    }

    #[test]
    fn test_sample_thresholds_support() {
        let t = sample_thresholds();
        assert!(!t.is_supported(ThresholdField::PosHysteresis));
        assert!(t.is_supported(ThresholdField::NegHysteresis));
        assert!(t.is_supported(ThresholdField::LowMinor));
    }
}
