//! Hardware interaction modules
//!
//! Inventory and classification of the hwmon tree, the file capability the
//! engine reads and writes through, and the safety layer that owns writes.

mod classify;
mod clock;
mod fake;
mod inventory;
mod io;
mod safety;
mod sysfs;

pub use classify::{classify_sensor, suggest_label};
pub use clock::{Clock, FakeClock, MonotonicClock};
pub use fake::{FakeHwmon, TachModel, WriteFailure, WriteRecord};
pub use inventory::{discover_pwm_outputs, discover_temperatures, HwmonInventory};
pub use io::HwmonIo;
#[cfg(test)]
pub use io::MockHwmonIo;
pub use safety::{
    clamp_duty, command_duty, probe_writable, restore, share_outputs, snapshot, SharedOutput,
    Snapshot,
};
pub use sysfs::SysfsIo;
