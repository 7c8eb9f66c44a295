//! Control engine: curves, the hysteresis/slew filter, channels, triggers,
//! profiles and the periodic loop that drives them.

mod channel;
mod control;
mod curve;
mod filter;
mod profile;
mod trigger;

pub use channel::{Channel, ChannelMode};
pub use control::{ChannelTick, ControlLoop, TickOutcome};
pub use curve::{Curve, CurvePreset};
pub use filter::FilterState;
pub use profile::{Profile, ProfileSet};
pub use trigger::{SharedTrigger, Trigger, TriggerSet};
