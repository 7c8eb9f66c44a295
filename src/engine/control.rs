//! Periodic control loop
//!
//! Each tick reads every channel's sensor, runs its filter and writes the
//! duty through the safety layer. An output whose lock is held elsewhere
//! (a coupling or calibration sweep) is left alone for that tick.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::Channel;
use crate::data::{ControlConfig, OutputId};
use crate::detection::{wait_cancellable, CancelToken};
use crate::hw::{command_duty, Clock, HwmonIo, SharedOutput};

/// What happened to one channel in one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickOutcome {
    Written,
    /// Output owned by a sweep
    Busy,
    ReadOnly,
    SensorUnavailable,
    UnknownOutput,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTick {
    pub channel: String,
    pub output: OutputId,
    pub temperature: Option<f32>,
    pub duty: Option<f32>,
    pub outcome: TickOutcome,
}

pub struct ControlLoop {
    io: Arc<dyn HwmonIo>,
    clock: Arc<dyn Clock>,
    outputs: HashMap<OutputId, SharedOutput>,
    channels: Vec<Channel>,
    config: ControlConfig,
}

impl ControlLoop {
    pub fn new(
        io: Arc<dyn HwmonIo>,
        clock: Arc<dyn Clock>,
        outputs: &[SharedOutput],
        config: ControlConfig,
    ) -> Self {
        let outputs = outputs
            .iter()
            .map(|shared| (shared.lock().id.clone(), Arc::clone(shared)))
            .collect();
        Self {
            io,
            clock,
            outputs,
            channels: Vec::new(),
            config,
        }
    }

    pub fn add_channel(&mut self, channel: Channel) {
        debug!(channel = %channel.name, output = %channel.output, "Channel added");
        self.channels.push(channel);
    }

    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        let index = self.channels.iter().position(|c| c.name == name)?;
        Some(self.channels.remove(index))
    }

    /// Replace every channel, e.g. when switching profiles
    pub fn set_channels(&mut self, channels: Vec<Channel>) {
        info!(count = channels.len(), "Loading channels");
        self.channels = channels;
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.name == name)
    }

    /// Evaluate and write every channel once
    pub fn tick(&mut self) -> Vec<ChannelTick> {
        let now = self.clock.now();
        let io = self.io.as_ref();
        let mut report = Vec::with_capacity(self.channels.len());

        for channel in &mut self.channels {
            let temperature = io.read_temperature(&channel.input_path());
            let mut tick = ChannelTick {
                channel: channel.name.clone(),
                output: channel.output.clone(),
                temperature,
                duty: None,
                outcome: TickOutcome::Written,
            };

            let Some(shared) = self.outputs.get(&channel.output) else {
                tick.outcome = TickOutcome::UnknownOutput;
                report.push(tick);
                continue;
            };
            let Some(mut output) = shared.try_lock() else {
                trace!(output = %channel.output, "Output busy, skipping");
                tick.outcome = TickOutcome::Busy;
                report.push(tick);
                continue;
            };

            let duty = match (channel.mode(), temperature) {
                (super::ChannelMode::Manual, _) => channel.manual_duty(),
                (super::ChannelMode::Auto, Some(temp)) => channel.evaluate(temp, now),
                (super::ChannelMode::Auto, None) => {
                    tick.outcome = TickOutcome::SensorUnavailable;
                    report.push(tick);
                    continue;
                }
            };

            tick.outcome = match command_duty(io, &mut output, duty, 0.0) {
                Ok(Some(written)) => {
                    tick.duty = Some(written);
                    TickOutcome::Written
                }
                Ok(None) => TickOutcome::ReadOnly,
                Err(e) => {
                    warn!(channel = %channel.name, error = %e, "Duty write failed");
                    TickOutcome::Failed { reason: e.to_string() }
                }
            };
            report.push(tick);
        }
        report
    }

    /// Tick until cancelled, handing each tick's report to `on_tick`
    pub fn run(&mut self, cancel: &CancelToken, on_tick: &mut dyn FnMut(&[ChannelTick])) {
        info!(
            channels = self.channels.len(),
            interval_ms = self.config.tick_interval_ms,
            "Control loop started"
        );
        while !cancel.is_cancelled() {
            let report = self.tick();
            on_tick(&report);
            if !wait_cancellable(self.clock.as_ref(), self.config.tick_interval(), cancel) {
                break;
            }
        }
        info!("Control loop stopped");
    }
}
