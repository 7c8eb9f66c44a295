//! Reusable control sources
//!
//! A trigger bundles a sensor with a curve and filter parameters so several
//! channels can follow the same source. Channels hold a shared handle, so
//! editing a trigger through its set is seen by every bound channel.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::Curve;
use crate::data::{FilterConfig, SensorId, TemperaturePoint};

pub type SharedTrigger = Arc<RwLock<Trigger>>;

#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub sensor: SensorId,
    pub sensor_path: PathBuf,
    pub curve: Curve,
    pub filter: FilterConfig,
}

impl Trigger {
    pub fn new(name: impl Into<String>, sensor: &TemperaturePoint, curve: Curve) -> Self {
        Self {
            name: name.into(),
            sensor: sensor.id.clone(),
            sensor_path: sensor.path.clone(),
            curve,
            filter: FilterConfig::default(),
        }
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }
}

/// Triggers by name
#[derive(Debug, Clone, Default)]
pub struct TriggerSet {
    triggers: BTreeMap<String, SharedTrigger>,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger and return its shared handle
    ///
    /// An existing trigger with the same name is updated in place, so
    /// channels already bound to it pick up the new settings.
    pub fn add(&mut self, trigger: Trigger) -> SharedTrigger {
        if let Some(existing) = self.triggers.get(&trigger.name) {
            debug!(trigger = %trigger.name, "Trigger replaced");
            *existing.write() = trigger;
            return Arc::clone(existing);
        }
        debug!(trigger = %trigger.name, sensor = %trigger.sensor, "Trigger added");
        let shared = Arc::new(RwLock::new(trigger));
        self.triggers.insert(shared.read().name.clone(), Arc::clone(&shared));
        shared
    }

    pub fn get(&self, name: &str) -> Option<SharedTrigger> {
        self.triggers.get(name).cloned()
    }

    /// Drop a trigger from the set; bound channels keep their handle
    pub fn remove(&mut self, name: &str) -> Option<SharedTrigger> {
        self.triggers.remove(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.triggers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensorType;

    fn sensor(index: u32) -> TemperaturePoint {
        TemperaturePoint {
            id: SensorId::new("hwmon0", index),
            chip_name: "k10temp".into(),
            path: PathBuf::from(format!("/temp{}", index)),
            raw_label: format!("temp{}", index),
            label: format!("CPU: temp{}", index),
            sensor_type: SensorType::Cpu,
            value: None,
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut set = TriggerSet::new();
        set.add(Trigger::new("cpu", &sensor(1), Curve::default()));
        set.add(Trigger::new("water", &sensor(2), Curve::default()));

        assert_eq!(set.names(), vec!["cpu", "water"]);
        assert_eq!(set.get("water").unwrap().read().sensor, SensorId::new("hwmon0", 2));
        assert!(set.get("gpu").is_none());
    }

    #[test]
    fn test_replace_updates_existing_handle() {
        let mut set = TriggerSet::new();
        let handle = set.add(Trigger::new("cpu", &sensor(1), Curve::default()));

        set.add(Trigger::new("cpu", &sensor(3), Curve::default()));

        assert_eq!(set.len(), 1);
        assert_eq!(handle.read().sensor_path, PathBuf::from("/temp3"));
    }

    #[test]
    fn test_remove_leaves_handle_alive() {
        let mut set = TriggerSet::new();
        let handle = set.add(Trigger::new("cpu", &sensor(1), Curve::default()));

        assert!(set.remove("cpu").is_some());
        assert!(set.is_empty());
        assert_eq!(handle.read().name, "cpu");
    }
}
