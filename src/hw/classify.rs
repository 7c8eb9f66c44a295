//! Sensor classification
//!
//! Classification is an ordered list of `(predicate, type)` rules; the
//! first rule that matches wins. Device-path hints come first, then the
//! driver name, then the sensor label. Embedded-controller and super-I/O
//! drivers carry many unrelated inputs, so their rule sits after the
//! label tables and only catches what the labels could not place.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

use crate::data::SensorType;

const PCI_GPU_HINTS: [&str; 3] = ["/drm/card", "/pci", "/0000:"];
const GPU_DRIVER_HINTS: [&str; 3] = ["amdgpu", "drm", "nvidia"];
const NVME_HINTS: [&str; 2] = ["/nvme", "/block/nvme"];

/// What a rule looks at
enum Predicate {
    /// Resolved `device` symlink of the chip
    Device(fn(&str) -> bool),
    /// Driver name from the chip's `name` file
    Chip(Regex),
    /// Per-sensor label
    Label(Regex),
}

struct Rule {
    predicate: Predicate,
    sensor_type: SensorType,
}

fn gpu_device(path: &str) -> bool {
    PCI_GPU_HINTS.iter().any(|h| path.contains(h)) && GPU_DRIVER_HINTS.iter().any(|h| path.contains(h))
}

fn nvme_device(path: &str) -> bool {
    NVME_HINTS.iter().any(|h| path.contains(h))
}

fn pattern(re: &str) -> Option<Regex> {
    RegexBuilder::new(re).case_insensitive(true).build().ok()
}

fn rule(predicate: Option<Predicate>, sensor_type: SensorType) -> Option<Rule> {
    predicate.map(|predicate| Rule { predicate, sensor_type })
}

fn chip(re: &str, sensor_type: SensorType) -> Option<Rule> {
    rule(pattern(re).map(Predicate::Chip), sensor_type)
}

fn label(re: &str, sensor_type: SensorType) -> Option<Rule> {
    rule(pattern(re).map(Predicate::Label), sensor_type)
}

lazy_static! {
    static ref RULES: Vec<Rule> = [
        rule(Some(Predicate::Device(gpu_device)), SensorType::Gpu),
        rule(Some(Predicate::Device(nvme_device)), SensorType::Nvme),
        chip(r"k10temp|coretemp|zenpower|pkgtemp", SensorType::Cpu),
        chip(r"amdgpu|nvidia", SensorType::Gpu),
        chip(r"nvme", SensorType::Nvme),
        label(r"\bcpu\b|tctl|package|tdie|core", SensorType::Cpu),
        label(r"\bgpu\b|junction|hotspot|edge|vram|hbm", SensorType::Gpu),
        label(r"chip|pch|smu|south|north", SensorType::Chipset),
        label(r"mobo|mb|board|system|systin|case", SensorType::Motherboard),
        label(r"vrm|mos|vcore", SensorType::Vrm),
        label(r"nvme|ssd|composite", SensorType::Nvme),
        label(r"water|coolant|liquid", SensorType::Water),
        label(r"ambient|room", SensorType::Ambient),
        chip(r"asus[-_]?ec|ibm-ec|ec|it8\d+|nct\d+|w83\d+", SensorType::Motherboard),
    ]
    .into_iter()
    .flatten()
    .collect();
}

/// Classify one temperature input
///
/// `device` is the resolved `device` symlink of the chip, when there is one.
pub fn classify_sensor(device: Option<&str>, chip_name: &str, label: &str) -> SensorType {
    RULES
        .iter()
        .find(|rule| match &rule.predicate {
            Predicate::Device(matches) => device.is_some_and(|d| matches(d)),
            Predicate::Chip(re) => re.is_match(chip_name),
            Predicate::Label(re) => re.is_match(label),
        })
        .map(|rule| rule.sensor_type)
        .unwrap_or(SensorType::Unknown)
}

/// Prefix a raw label with its type, e.g. `CPU: Tctl`
pub fn suggest_label(sensor_type: SensorType, raw_label: &str) -> String {
    let raw = raw_label.trim();
    let prefix = format!("{}:", sensor_type.as_str().to_lowercase());
    if sensor_type != SensorType::Unknown && !raw.to_lowercase().starts_with(&prefix) {
        return format!("{}: {}", sensor_type, raw);
    }
    if raw.is_empty() {
        sensor_type.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path_wins() {
        let gpu = "/sys/devices/pci0000:00/0000:03:00.0/drm/card0";
        assert_eq!(classify_sensor(Some(gpu), "weird", "temp1"), SensorType::Gpu);

        let nvme = "/sys/devices/pci0000:00/0000:01:00.0/nvme/nvme0";
        assert_eq!(classify_sensor(Some(nvme), "nvme", "Composite"), SensorType::Nvme);
    }

    #[test]
    fn test_pci_path_without_gpu_driver_falls_through() {
        let dev = "/sys/devices/pci0000:00/0000:00:18.3";
        assert_eq!(classify_sensor(Some(dev), "k10temp", "Tctl"), SensorType::Cpu);
    }

    #[test]
    fn test_chip_names() {
        assert_eq!(classify_sensor(None, "coretemp", "temp1"), SensorType::Cpu);
        assert_eq!(classify_sensor(None, "amdgpu", "temp1"), SensorType::Gpu);
        assert_eq!(classify_sensor(None, "nvme", "temp1"), SensorType::Nvme);
    }

    #[test]
    fn test_labels() {
        assert_eq!(classify_sensor(None, "acpitz", "CPU Temp"), SensorType::Cpu);
        assert_eq!(classify_sensor(None, "acpitz", "GPU Hotspot"), SensorType::Gpu);
        assert_eq!(classify_sensor(None, "acpitz", "PCH"), SensorType::Chipset);
        assert_eq!(classify_sensor(None, "acpitz", "VRM"), SensorType::Vrm);
        assert_eq!(classify_sensor(None, "acpitz", "Coolant In"), SensorType::Water);
        assert_eq!(classify_sensor(None, "acpitz", "Room"), SensorType::Ambient);
    }

    #[test]
    fn test_superio_defers_to_label() {
        assert_eq!(classify_sensor(None, "nct6798", "CPUTIN"), SensorType::Motherboard);
        assert_eq!(classify_sensor(None, "nct6798", "CPU"), SensorType::Cpu);
        assert_eq!(classify_sensor(None, "it8688", "temp3"), SensorType::Motherboard);
        assert_eq!(classify_sensor(None, "asus-ec", "Water_In"), SensorType::Water);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify_sensor(None, "acpitz", "temp1"), SensorType::Unknown);
    }

    #[test]
    fn test_suggest_label() {
        assert_eq!(suggest_label(SensorType::Cpu, "Tctl"), "CPU: Tctl");
        assert_eq!(suggest_label(SensorType::Cpu, "cpu: Tctl"), "cpu: Tctl");
        assert_eq!(suggest_label(SensorType::Unknown, "temp1"), "temp1");
        assert_eq!(suggest_label(SensorType::Unknown, ""), "Unknown");
    }
}
