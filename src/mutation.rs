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

//! The `mod` wizard.
//!
//! The service only accepts a sensor's thresholds as one whole structure, so
//! every change starts from a fresh read of that structure and edits exactly
//! one slot before writing it back. The wizard is a linear state machine:
//! each state either moves forward or ends in [`WizardState::Aborted`], and
//! nothing is sent to the hardware before the operator typed `yes`.

use std::io::{self, BufRead, Write};
use std::thread;

use serde_json::json;
use thiserror::Error;

use crate::app::App;
use crate::display;
use crate::hpi::{HpiError, HpiService, ThresholdField, ThresholdSet, ValueError};
use crate::inventory::SensorRef;
use crate::logger;
use crate::query;

pub const FIELD_PROMPT: &str = "threshold type (lc, la, li, uc, ua, ui, ph, nh): ";
pub const CONFIRM_PROMPT: &str = "Is it correct (yes, no)?: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    SelectResource,
    SelectSensor,
    Snapshot,
    SelectField,
    ValidateSupport,
    EnterValue,
    Apply,
    Confirm,
    Submit,
    AwaitAck,
    Verify,
    Aborted,
    Done,
}

impl WizardState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WizardState::Aborted | WizardState::Done)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardAbort {
    #[error("no RPT number")]
    NoResourceNumber,
    #[error("invalid RPT number: No RPT for id: {0}")]
    InvalidResource(i64),
    #[error("no Sensor number")]
    NoSensorNumber,
    #[error("invalid sensor number: No sensor {num} for rpt {rpt}")]
    InvalidSensor { rpt: u32, num: i64 },
    #[error("sensor thresholds get returned {0}")]
    ThresholdsGet(HpiError),
    #[error("unknown threshold type: {0}")]
    UnknownField(String),
    #[error("this threshold isn't supported: {0}")]
    Unsupported(ThresholdField),
    #[error("no value")]
    NoValue,
    #[error("{0}")]
    Value(ValueError),
    #[error("thresholds not changed")]
    Cancelled,
    #[error("sensor thresholds set returned {0}")]
    Submit(HpiError),
    #[error("input closed")]
    InputClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardOutcome {
    Applied {
        sensor: SensorRef,
        field: ThresholdField,
        submitted: ThresholdSet,
        acknowledged: bool,
    },
    Aborted(WizardAbort),
}

/// Result of one state's work: the next state, or why the wizard stops.
type Transition = Result<WizardState, WizardAbort>;

#[derive(Debug, Clone)]
pub struct ThresholdWizard {
    state: WizardState,
    resource: Option<usize>,
    sensor: Option<SensorRef>,
    snapshot: Option<ThresholdSet>,
    field: Option<ThresholdField>,
    value: Option<f64>,
    proposed: Option<ThresholdSet>,
    acknowledged: bool,
    abort: Option<WizardAbort>,
}

impl Default for ThresholdWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper bound on events drained by a single poll attempt.
const MAX_EVENTS_PER_POLL: usize = 64;

/// Empty the event queue so that nothing raised before a write can be
/// mistaken for its acknowledgment. Returns how many events were dropped.
fn discard_pending_events<S: HpiService>(service: &mut S) -> usize {
    let mut dropped = 0;
    while dropped < MAX_EVENTS_PER_POLL {
        match service.poll_event() {
            Ok(Some(_)) => dropped += 1,
            _ => break,
        }
    }
    dropped
}

fn first_token(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

impl ThresholdWizard {
    pub fn new() -> Self {
        ThresholdWizard {
            state: WizardState::SelectResource,
            resource: None,
            sensor: None,
            snapshot: None,
            field: None,
            value: None,
            proposed: None,
            acknowledged: false,
            abort: None,
        }
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn abort_reason(&self) -> Option<&WizardAbort> {
        self.abort.as_ref()
    }

    /// Drive the wizard until it finishes or aborts.
    pub fn run<S: HpiService, R: BufRead, W: Write>(
        app: &mut App<S, R, W>,
    ) -> io::Result<WizardOutcome> {
        let mut wizard = ThresholdWizard::new();
        while !wizard.state.is_terminal() {
            wizard.step(app)?;
        }
        Ok(wizard.outcome())
    }

    pub fn outcome(&self) -> WizardOutcome {
        match (&self.abort, self.sensor, self.field, &self.proposed) {
            (None, Some(sensor), Some(field), Some(submitted)) if self.state == WizardState::Done => {
                WizardOutcome::Applied {
                    sensor,
                    field,
                    submitted: submitted.clone(),
                    acknowledged: self.acknowledged,
                }
            }
            (Some(abort), ..) => WizardOutcome::Aborted(abort.clone()),
            _ => WizardOutcome::Aborted(WizardAbort::InputClosed),
        }
    }

    /// Perform the current state's work and move to the next state. Only
    /// console I/O errors are returned; every other failure aborts.
    pub fn step<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<WizardState> {
        let transition = match self.state {
            WizardState::SelectResource => self.select_resource(app)?,
            WizardState::SelectSensor => self.select_sensor(app)?,
            WizardState::Snapshot => self.snapshot(app)?,
            WizardState::SelectField => self.select_field(app)?,
            WizardState::ValidateSupport => self.validate_support(),
            WizardState::EnterValue => self.enter_value(app)?,
            WizardState::Apply => self.apply(),
            WizardState::Confirm => self.confirm(app)?,
            WizardState::Submit => self.submit(app),
            WizardState::AwaitAck => self.await_ack(app),
            WizardState::Verify => self.verify(app)?,
            WizardState::Aborted | WizardState::Done => return Ok(self.state),
        };
        match transition {
            Ok(next) => self.state = next,
            Err(abort) => {
                logger::log_event(
                    "mutation_aborted",
                    json!({ "state": format!("{:?}", self.state), "reason": abort.to_string() }),
                );
                if abort == WizardAbort::Cancelled {
                    writeln!(app.console.out(), "Thresholds not changed")?;
                } else {
                    app.console.diag(&abort.to_string())?;
                }
                self.abort = Some(abort);
                self.state = WizardState::Aborted;
            }
        }
        Ok(self.state)
    }

    fn ask<S, R: BufRead, W: Write>(
        app: &mut App<S, R, W>,
        msg: &str,
    ) -> io::Result<Result<String, WizardAbort>> {
        Ok(app.console.prompt(msg)?.ok_or(WizardAbort::InputClosed))
    }

    fn select_resource<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let line = match Self::ask(app, "RPT number: ")? {
            Ok(l) => l,
            Err(e) => return Ok(Err(e)),
        };
        let Ok(id) = first_token(&line).parse::<i64>() else {
            return Ok(Err(WizardAbort::NoResourceNumber));
        };
        let found = u32::try_from(id).ok().and_then(|id| app.inventory.find_resource(id));
        Ok(match found {
            Some(i) => {
                self.resource = Some(i);
                Ok(WizardState::SelectSensor)
            }
            None => Err(WizardAbort::InvalidResource(id)),
        })
    }

    fn select_sensor<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let Some(ri) = self.resource else {
            return Ok(Err(WizardAbort::NoResourceNumber));
        };
        display::write_sensors_for_resource(app.console.out(), &app.inventory.resources[ri])?;
        let line = match Self::ask(app, "Sensor number: ")? {
            Ok(l) => l,
            Err(e) => return Ok(Err(e)),
        };
        let Ok(num) = first_token(&line).parse::<i64>() else {
            return Ok(Err(WizardAbort::NoSensorNumber));
        };
        let resource = &app.inventory.resources[ri];
        let found = u32::try_from(num).ok().and_then(|n| resource.find_sensor(n));
        Ok(match found {
            Some(record) => {
                self.sensor = Some(SensorRef { resource: ri, record });
                Ok(WizardState::Snapshot)
            }
            None => Err(WizardAbort::InvalidSensor { rpt: resource.entry_id, num }),
        })
    }

    fn snapshot<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let Some(at) = self.sensor else {
            return Ok(Err(WizardAbort::NoSensorNumber));
        };
        let record = &app.inventory.resources[at.resource].records[at.record];
        display::write_record_detail(app.console.out(), record)?;
        query::show_reading(app, at)?;
        let thresholds = match query::fetch_thresholds(app, at) {
            Ok(t) => t,
            Err(e) => return Ok(Err(WizardAbort::ThresholdsGet(e))),
        };
        let out = app.console.out();
        writeln!(out, "  Thresholds:")?;
        display::write_thresholds(out, &thresholds)?;
        self.snapshot = Some(thresholds);
        Ok(Ok(WizardState::SelectField))
    }

    fn select_field<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let line = match Self::ask(app, FIELD_PROMPT)? {
            Ok(l) => l,
            Err(e) => return Ok(Err(e)),
        };
        let code = line.trim();
        Ok(match ThresholdField::from_code(code) {
            Some(field) => {
                self.field = Some(field);
                Ok(WizardState::ValidateSupport)
            }
            None => Err(WizardAbort::UnknownField(code.to_string())),
        })
    }

    // Checked before the value prompt so an unsupported slot never gets
    // as far as asking for a number.
    fn validate_support(&mut self) -> Transition {
        match (&self.snapshot, self.field) {
            (Some(snapshot), Some(field)) if snapshot.is_supported(field) => Ok(WizardState::EnterValue),
            (_, Some(field)) => Err(WizardAbort::Unsupported(field)),
            _ => Err(WizardAbort::UnknownField(String::new())),
        }
    }

    fn enter_value<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let line = match Self::ask(app, "new value: ")? {
            Ok(l) => l,
            Err(e) => return Ok(Err(e)),
        };
        Ok(match first_token(&line).parse::<f64>() {
            Ok(v) if v.is_finite() => {
                self.value = Some(v);
                Ok(WizardState::Apply)
            }
            _ => Err(WizardAbort::NoValue),
        })
    }

    fn apply(&mut self) -> Transition {
        let (Some(snapshot), Some(field), Some(value)) = (&self.snapshot, self.field, self.value) else {
            return Err(WizardAbort::NoValue);
        };
        let mut proposed = snapshot.clone();
        proposed.set_value(field, value).map_err(WizardAbort::Value)?;
        self.proposed = Some(proposed);
        Ok(WizardState::Confirm)
    }

    fn confirm<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let Some(proposed) = &self.proposed else {
            return Ok(Err(WizardAbort::Cancelled));
        };
        let out = app.console.out();
        writeln!(out)?;
        writeln!(out, "  New thresholds:")?;
        display::write_thresholds(out, proposed)?;
        let answer = match Self::ask(app, CONFIRM_PROMPT)? {
            Ok(l) => l,
            Err(_) => return Ok(Err(WizardAbort::Cancelled)),
        };
        Ok(if answer.trim() == "yes" {
            Ok(WizardState::Submit)
        } else {
            Err(WizardAbort::Cancelled)
        })
    }

    fn submit<S: HpiService, R, W>(&mut self, app: &mut App<S, R, W>) -> Transition {
        let (Some(at), Some(proposed)) = (self.sensor, &self.proposed) else {
            return Err(WizardAbort::Cancelled);
        };
        let resource_id = app.inventory.resource(at).resource_id;
        let Some(num) = app.inventory.sensor(at).map(|s| s.num) else {
            return Err(WizardAbort::NoSensorNumber);
        };
        let stale = discard_pending_events(&mut app.service);
        if stale > 0 {
            logger::log_event("events_discarded", json!({ "count": stale }));
        }
        app.service
            .set_thresholds(resource_id, num, proposed)
            .map_err(WizardAbort::Submit)?;
        logger::log_event(
            "thresholds_submitted",
            json!({
                "resource_id": resource_id.0,
                "sensor_num": num,
                "field": self.field.map(|f| f.code()),
                "value": self.value,
            }),
        );
        Ok(WizardState::AwaitAck)
    }

    /// Best effort: whether an event shows up has no bearing on the result.
    /// Only an event raised by the changed sensor counts.
    fn await_ack<S: HpiService, R, W>(&mut self, app: &mut App<S, R, W>) -> Transition {
        let Some(at) = self.sensor else {
            return Err(WizardAbort::NoSensorNumber);
        };
        let resource_id = app.inventory.resource(at).resource_id;
        let Some(sensor) = app.inventory.sensor_mut(at) else {
            return Err(WizardAbort::NoSensorNumber);
        };
        sensor.state.mark_modified();
        let num = sensor.num;

        let attempts = app.config.ack_attempts;
        let interval = app.config.ack_interval();
        'attempts: for attempt in 1..=attempts {
            for _ in 0..MAX_EVENTS_PER_POLL {
                let Ok(Some(event)) = app.service.poll_event() else { break };
                if event.source == resource_id && event.sensor_num.map_or(true, |n| n == num) {
                    logger::log_event(
                        "ack_observed",
                        json!({
                            "attempt": attempt,
                            "source": event.source.0,
                            "sensor_num": event.sensor_num,
                            "kind": event.kind,
                        }),
                    );
                    self.acknowledged = true;
                    break 'attempts;
                }
                logger::log_event(
                    "event_ignored",
                    json!({ "source": event.source.0, "sensor_num": event.sensor_num }),
                );
            }
            if attempt < attempts && !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        if !self.acknowledged {
            logger::log_event("ack_timeout", json!({ "attempts": attempts }));
        }
        Ok(WizardState::Verify)
    }

    fn verify<S: HpiService, R: BufRead, W: Write>(
        &mut self,
        app: &mut App<S, R, W>,
    ) -> io::Result<Transition> {
        let Some(at) = self.sensor else {
            return Ok(Ok(WizardState::Done));
        };
        let resource_id = app.inventory.resource(at).resource_id;
        let Some(num) = app.inventory.sensor(at).map(|s| s.num) else {
            return Ok(Ok(WizardState::Done));
        };
        match app.service.get_thresholds(resource_id, num) {
            Ok(current) => {
                let out = app.console.out();
                writeln!(out, "Current thresholds:")?;
                display::write_thresholds(out, &current)?;
            }
            Err(e) => app.console.diag(&format!("sensor thresholds get returned {}", e))?,
        }
        Ok(Ok(WizardState::Done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpi::{HpiEvent, MockHpiService, ReadingValue, ResourceId, SensorReading};
    use crate::test_utils::test_utils::*;
    use mockall::predicate::eq;
    use std::time::{Duration, Instant};

    fn mock_with_snapshot() -> MockHpiService {
        let mut mock = MockHpiService::new();
        mock.expect_get_reading()
            .returning(|_, _| Ok(SensorReading::float(35.0)));
        mock.expect_get_thresholds()
            .with(eq(ResourceId(105)), eq(12))
            .returning(|_, _| Ok(sample_thresholds()));
        mock
    }

    fn run(app: &mut TestApp) -> WizardOutcome {
        ThresholdWizard::run(app).unwrap()
    }

    fn event(resource: u32, sensor_num: Option<u32>) -> HpiEvent {
        HpiEvent { source: ResourceId(resource), sensor_num, kind: "threshold".into() }
    }

    fn acknowledged(outcome: WizardOutcome) -> bool {
        match outcome {
            WizardOutcome::Applied { acknowledged, .. } => acknowledged,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_lower_minor_scenario() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds()
            .withf(|rid, num, t| {
                *rid == ResourceId(105)
                    && *num == 12
                    && t.low_minor.value == ReadingValue::Float64(15.0)
                    && t.differing_fields(&sample_thresholds()) == vec![ThresholdField::LowMinor]
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut seq = mockall::Sequence::new();
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(event(105, Some(12)))));

        let mut app = test_app(mock, "5\n12\nli\n15.0\nyes\n");
        let outcome = run(&mut app);
        match outcome {
            WizardOutcome::Applied { field, acknowledged, submitted, .. } => {
                assert_eq!(field, ThresholdField::LowMinor);
                assert!(acknowledged);
                assert_eq!(submitted.low_minor.value, ReadingValue::Float64(15.0));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let at = app.inventory.find_sensor(5, 12).unwrap();
        let state = &app.inventory.sensor(at).unwrap().state;
        assert!(state.is_modified());
        assert_eq!(state.original(), Some(&sample_thresholds()));

        let (out, err) = output(app);
        assert!(out.contains("New thresholds:"));
        assert!(out.contains("Lower Minor Threshold(li): 15.000"));
        assert!(out.contains("Current thresholds:"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_unknown_resource_aborts_without_calls() {
        let mut app = test_app(MockHpiService::new(), "42\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::InvalidResource(42)));
        let (_, err) = output(app);
        assert!(err.contains("No RPT for id: 42"));
    }

    #[test]
    fn test_missing_numbers_abort() {
        let mut app = test_app(MockHpiService::new(), "abc\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::NoResourceNumber));

        let mut app = test_app(MockHpiService::new(), "5\n\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::NoSensorNumber));

        let mut app = test_app(MockHpiService::new(), "5\n99\n");
        assert_eq!(
            run(&mut app),
            WizardOutcome::Aborted(WizardAbort::InvalidSensor { rpt: 5, num: 99 })
        );
    }

    #[test]
    fn test_threshold_fetch_failure_aborts() {
        let mut mock = MockHpiService::new();
        mock.expect_get_reading().returning(|_, _| Err(HpiError::Busy));
        mock.expect_get_thresholds().returning(|_, _| Err(HpiError::InvalidCmd));
        let mut app = test_app(mock, "5\n12\n");
        assert_eq!(
            run(&mut app),
            WizardOutcome::Aborted(WizardAbort::ThresholdsGet(HpiError::InvalidCmd))
        );
    }

    #[test]
    fn test_unknown_field_aborts() {
        let mut app = test_app(mock_with_snapshot(), "5\n12\nzz\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::UnknownField("zz".into())));
    }

    #[test]
    fn test_unsupported_field_aborts_before_value_prompt() {
        // ph is unsupported in the sample set; no set/poll expectations
        let mut app = test_app(mock_with_snapshot(), "5\n12\nph\n15.0\nyes\n");
        assert_eq!(
            run(&mut app),
            WizardOutcome::Aborted(WizardAbort::Unsupported(ThresholdField::PosHysteresis))
        );
        let at = app.inventory.find_sensor(5, 12).unwrap();
        assert!(!app.inventory.sensor(at).unwrap().state.is_modified());
        let (out, err) = output(app);
        assert!(!out.contains("new value: "));
        assert!(err.contains("isn't supported"));
    }

    #[test]
    fn test_bad_value_aborts() {
        let mut app = test_app(mock_with_snapshot(), "5\n12\nli\nabc\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::NoValue));

        let mut app = test_app(mock_with_snapshot(), "5\n12\nli\nNaN\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::NoValue));
    }

    #[test]
    fn test_confirmation_other_than_yes_cancels() {
        for answer in ["no", "y", "YES", "yess", ""] {
            let mut app = test_app(mock_with_snapshot(), &format!("5\n12\nli\n15\n{}\n", answer));
            assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::Cancelled));
            let at = app.inventory.find_sensor(5, 12).unwrap();
            assert!(!app.inventory.sensor(at).unwrap().state.is_modified());
        }
    }

    #[test]
    fn test_input_closed_at_confirmation_cancels() {
        let mut app = test_app(mock_with_snapshot(), "5\n12\nli\n15\n");
        assert_eq!(run(&mut app), WizardOutcome::Aborted(WizardAbort::Cancelled));
    }

    #[test]
    fn test_submit_failure_leaves_sensor_unmodified() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds()
            .times(1)
            .returning(|_, _, _| Err(HpiError::InvalidData("range".into())));
        mock.expect_poll_event().returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nli\n15\n yes \n");
        assert!(matches!(run(&mut app), WizardOutcome::Aborted(WizardAbort::Submit(_))));
        let at = app.inventory.find_sensor(5, 12).unwrap();
        let state = &app.inventory.sensor(at).unwrap().state;
        assert!(!state.is_modified());
        assert!(state.original().is_some());
    }

    #[test]
    fn test_ack_poll_gives_up_after_configured_attempts() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds().returning(|_, _, _| Ok(()));
        // one drain before the write, then one poll per attempt
        mock.expect_poll_event().times(4).returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        app.config.ack_attempts = 3;
        match run(&mut app) {
            WizardOutcome::Applied { acknowledged, .. } => assert!(!acknowledged),
            other => panic!("unexpected outcome {:?}", other),
        }
        let at = app.inventory.find_sensor(5, 12).unwrap();
        assert!(app.inventory.sensor(at).unwrap().state.is_modified());
    }

    #[test]
    fn test_ack_poll_errors_are_ignored() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds().returning(|_, _, _| Ok(()));
        let mut seq = mockall::Sequence::new();
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(HpiError::Timeout));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(event(105, None))));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        match run(&mut app) {
            WizardOutcome::Applied { acknowledged, .. } => assert!(acknowledged),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_events_queued_before_write_are_not_an_ack() {
        let mut mock = mock_with_snapshot();
        let mut seq = mockall::Sequence::new();
        // left over from an earlier write to the same sensor
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(event(105, Some(12)))));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));
        mock.expect_set_thresholds()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        app.config.ack_attempts = 1;
        assert!(!acknowledged(run(&mut app)));
    }

    #[test]
    fn test_event_from_another_sensor_is_ignored() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds().returning(|_, _, _| Ok(()));
        let mut seq = mockall::Sequence::new();
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(event(105, Some(13)))));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(event(103, Some(12)))));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(None));
        mock.expect_poll_event()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Some(event(105, Some(12)))));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        app.config.ack_attempts = 2;
        assert!(acknowledged(run(&mut app)));
    }

    #[test]
    fn test_ack_pauses_between_attempts_only() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds().returning(|_, _, _| Ok(()));
        mock.expect_poll_event().returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        app.config.ack_attempts = 3;
        app.config.ack_interval_ms = 20;
        let started = Instant::now();
        assert!(!acknowledged(run(&mut app)));
        assert!(started.elapsed() >= Duration::from_millis(40));

        // a single attempt never sleeps
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds().returning(|_, _, _| Ok(()));
        mock.expect_poll_event().returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        app.config.ack_attempts = 1;
        app.config.ack_interval_ms = 5_000;
        let started = Instant::now();
        assert!(!acknowledged(run(&mut app)));
        assert!(started.elapsed() < Duration::from_millis(5_000));
    }

    #[test]
    fn test_step_walks_states_in_order() {
        let mut mock = mock_with_snapshot();
        mock.expect_set_thresholds().returning(|_, _, _| Ok(()));
        mock.expect_poll_event().returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nli\n15\nyes\n");
        app.config.ack_attempts = 1;

        let mut wizard = ThresholdWizard::new();
        let mut seen = vec![wizard.state()];
        while !wizard.state().is_terminal() {
            seen.push(wizard.step(&mut app).unwrap());
        }
        assert_eq!(
            seen,
            vec![
                WizardState::SelectResource,
                WizardState::SelectSensor,
                WizardState::Snapshot,
                WizardState::SelectField,
                WizardState::ValidateSupport,
                WizardState::EnterValue,
                WizardState::Apply,
                WizardState::Confirm,
                WizardState::Submit,
                WizardState::AwaitAck,
                WizardState::Verify,
                WizardState::Done,
            ]
        );
        assert!(wizard.abort_reason().is_none());
    }

    #[test]
    fn test_integer_slot_keeps_its_type() {
        let mut mock = MockHpiService::new();
        mock.expect_get_reading().returning(|_, _| Ok(SensorReading::float(35.0)));
        mock.expect_get_thresholds().returning(|_, _| {
            let mut t = sample_thresholds();
            t.up_major = SensorReading { is_supported: true, value: ReadingValue::Int64(80) };
            Ok(t)
        });
        mock.expect_set_thresholds()
            .withf(|_, _, t| t.up_major.value == ReadingValue::Int64(85))
            .times(1)
            .returning(|_, _, _| Ok(()));
        mock.expect_poll_event().returning(|| Ok(None));
        let mut app = test_app(mock, "5\n12\nua\n85\nyes\n");
        app.config.ack_attempts = 1;
        assert!(matches!(run(&mut app), WizardOutcome::Applied { .. }));

        let mut mock = MockHpiService::new();
        mock.expect_get_reading().returning(|_, _| Ok(SensorReading::float(35.0)));
        mock.expect_get_thresholds().returning(|_, _| {
            let mut t = sample_thresholds();
            t.up_major = SensorReading { is_supported: true, value: ReadingValue::Int64(80) };
            Ok(t)
        });
        let mut app = test_app(mock, "5\n12\nua\n85.5\nyes\n");
        assert!(matches!(
            run(&mut app),
            WizardOutcome::Aborted(WizardAbort::Value(ValueError::NotRepresentable { .. }))
        ));
    }
}
