//! Control channels
//!
//! A channel binds one temperature input, one PWM output, a curve and the
//! filter memory that goes with them. A bound trigger overrides the input,
//! curve and filter parameters.

use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::{Curve, FilterState, SharedTrigger};
use crate::data::{validate_percentage, CouplingRecord, FilterConfig, OutputId, SensorId, TemperaturePoint};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    #[default]
    Auto,
    Manual,
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub sensor: SensorId,
    pub sensor_path: PathBuf,
    pub output: OutputId,
    curve: Curve,
    filter: FilterConfig,
    mode: ChannelMode,
    manual_duty: f32,
    trigger: Option<SharedTrigger>,
    state: FilterState,
}

impl Channel {
    pub fn new(name: impl Into<String>, sensor: &TemperaturePoint, output: OutputId, curve: Curve) -> Self {
        Self {
            name: name.into(),
            sensor: sensor.id.clone(),
            sensor_path: sensor.path.clone(),
            output,
            curve,
            filter: FilterConfig::default(),
            mode: ChannelMode::Auto,
            manual_duty: 0.0,
            trigger: None,
            state: FilterState::new(),
        }
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Accept a coupling result with the default curve
    ///
    /// Returns `None` if the coupled sensor is not in `temps`.
    pub fn from_coupling(record: &CouplingRecord, temps: &[TemperaturePoint], filter: &FilterConfig) -> Option<Self> {
        let sensor = temps.iter().find(|t| t.id == record.sensor)?;
        let name = format!("{} -> {}", record.output, record.sensor_label);
        Some(Self::new(name, sensor, record.output.clone(), Curve::default()).with_filter(filter.clone()))
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn manual_duty(&self) -> f32 {
        self.manual_duty
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn trigger(&self) -> Option<&SharedTrigger> {
        self.trigger.as_ref()
    }

    /// Sensor file read each tick: the trigger's when one is bound
    pub fn input_path(&self) -> PathBuf {
        match &self.trigger {
            Some(trigger) => trigger.read().sensor_path.clone(),
            None => self.sensor_path.clone(),
        }
    }

    /// Follow a shared trigger instead of the channel's own source
    pub fn bind_trigger(&mut self, trigger: SharedTrigger) {
        debug!(channel = %self.name, trigger = %trigger.read().name, "Trigger bound");
        self.trigger = Some(trigger);
        self.state.reset();
    }

    pub fn unbind_trigger(&mut self) -> Option<SharedTrigger> {
        let previous = self.trigger.take();
        if previous.is_some() {
            self.state.reset();
        }
        previous
    }

    /// Replace curve and filter parameters; filter memory starts over
    pub fn reconfigure(&mut self, curve: Curve, filter: FilterConfig) {
        debug!(channel = %self.name, "Channel reconfigured");
        self.curve = curve;
        self.filter = filter;
        self.state.reset();
    }

    /// Switch to a fixed duty; rejects values outside 0-100
    pub fn set_manual(&mut self, duty: f32) -> Result<()> {
        self.manual_duty = validate_percentage(duty)?;
        self.mode = ChannelMode::Manual;
        Ok(())
    }

    pub fn set_auto(&mut self) {
        self.mode = ChannelMode::Auto;
    }

    /// Duty to command this tick
    pub fn evaluate(&mut self, temp: f32, now: Duration) -> f32 {
        match self.mode {
            ChannelMode::Manual => self.manual_duty,
            ChannelMode::Auto => match &self.trigger {
                Some(trigger) => {
                    let trigger = trigger.read();
                    self.state.step(&trigger.curve, temp, now, &trigger.filter)
                }
                None => self.state.step(&self.curve, temp, now, &self.filter),
            },
        }
    }
}
