//! Hardware inventory for the hwmon tree
//!
//! One directory per physical chip, each holding:
//! - **Temperature**: `tempN_input` (millidegrees Celsius) and optional `tempN_label`
//! - **Fan**: `fanN_input` (RPM), paired with the PWM of the same index
//! - **PWM**: `pwmN` duty, optional `pwmN_enable` mode and `pwmN_max` range
//!
//! Unreadable files are skipped; a partial or empty inventory is a valid
//! result.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use super::classify::{classify_sensor, suggest_label};
use super::{HwmonIo, SysfsIo};
use crate::constants::paths;
use crate::data::{OutputId, PwmOutput, SensorId, TemperaturePoint};
use crate::error::{LfcError, Result};

/// One chip directory with its interesting files
#[derive(Debug)]
struct ChipDir {
    dir_name: String,
    name: String,
    device: Option<String>,
    files: BTreeMap<String, PathBuf>,
}

impl ChipDir {
    fn file(&self, name: &str) -> Option<&PathBuf> {
        self.files.get(name)
    }

    /// Indices `N` of files named `{prefix}N{suffix}`, ascending
    fn indices(&self, prefix: &str, suffix: &str) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .files
            .keys()
            .filter_map(|name| name.strip_prefix(prefix)?.strip_suffix(suffix)?.parse().ok())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

fn read_chip_dirs(base: &Path) -> Result<Vec<ChipDir>> {
    let entries = fs::read_dir(base).map_err(|e| LfcError::TreeUnavailable {
        path: base.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut chips = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        trace!("Checking hwmon device: {:?}", path);

        let name = fs::read_to_string(path.join("name"))
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| dir_name.clone());
        let device = fs::canonicalize(path.join("device"))
            .ok()
            .map(|p| p.to_string_lossy().into_owned());

        let files: BTreeMap<String, PathBuf> = match fs::read_dir(&path) {
            Ok(listing) => listing
                .flatten()
                .map(|f| (f.file_name().to_string_lossy().into_owned(), f.path()))
                .collect(),
            Err(e) => {
                debug!(chip = %dir_name, error = %e, "Skipping unreadable chip directory");
                continue;
            }
        };

        chips.push(ChipDir {
            dir_name,
            name,
            device,
            files,
        });
    }

    chips.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
    Ok(chips)
}

fn chip_temperatures(chip: &ChipDir, io: &dyn HwmonIo) -> Vec<TemperaturePoint> {
    chip.indices("temp", "_input")
        .into_iter()
        .filter_map(|index| {
            let path = chip.file(&format!("temp{}_input", index))?.clone();
            let raw_label = chip
                .file(&format!("temp{}_label", index))
                .and_then(|p| fs::read_to_string(p).ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("temp{}", index));
            let sensor_type = classify_sensor(chip.device.as_deref(), &chip.name, &raw_label);
            let value = io.read_temperature(&path);

            Some(TemperaturePoint {
                id: SensorId::new(chip.dir_name.clone(), index),
                chip_name: chip.name.clone(),
                path,
                label: suggest_label(sensor_type, &raw_label),
                raw_label,
                sensor_type,
                value,
            })
        })
        .collect()
}

fn chip_outputs(chip: &ChipDir) -> Vec<PwmOutput> {
    chip.indices("pwm", "")
        .into_iter()
        .filter_map(|index| {
            let pwm_path = chip.file(&format!("pwm{}", index))?;
            let mut output = PwmOutput::new(
                OutputId::new(chip.dir_name.clone(), index),
                chip.name.clone(),
                pwm_path.clone(),
            );
            if let Some(enable) = chip.file(&format!("pwm{}_enable", index)) {
                output = output.with_enable(enable.clone());
            }
            if let Some(tach) = chip.file(&format!("fan{}_input", index)) {
                output = output.with_tach(tach.clone());
            }
            let raw_max = chip
                .file(&format!("pwm{}_max", index))
                .and_then(|p| fs::read_to_string(p).ok())
                .and_then(|s| s.trim().parse::<u32>().ok());
            if let Some(raw_max) = raw_max {
                output = output.with_raw_max(raw_max);
            }
            Some(output)
        })
        .collect()
}

/// All temperature inputs under `base`, classified and labelled
///
/// A missing tree yields an empty list.
pub fn discover_temperatures(base: &Path) -> Vec<TemperaturePoint> {
    match HwmonInventory::scan(base, &SysfsIo) {
        Ok(inventory) => inventory.temperatures,
        Err(e) => {
            warn!(error = %e, "No hardware monitoring tree");
            Vec::new()
        }
    }
}

/// All PWM outputs under `base`, with enable and tach paths resolved
pub fn discover_pwm_outputs(base: &Path) -> Vec<PwmOutput> {
    match HwmonInventory::scan(base, &SysfsIo) {
        Ok(inventory) => inventory.outputs,
        Err(e) => {
            warn!(error = %e, "No hardware monitoring tree");
            Vec::new()
        }
    }
}

/// Snapshot of every temperature input and PWM output on the host
#[derive(Debug, Clone, Default)]
pub struct HwmonInventory {
    pub temperatures: Vec<TemperaturePoint>,
    pub outputs: Vec<PwmOutput>,
}

impl HwmonInventory {
    /// Walk the tree at `base`
    ///
    /// Fails only when `base` itself cannot be listed.
    pub fn scan(base: &Path, io: &dyn HwmonIo) -> Result<Self> {
        debug!("Scanning hwmon chips in {:?}", base);
        let mut inventory = Self::default();

        for chip in read_chip_dirs(base)? {
            let temps = chip_temperatures(&chip, io);
            let outputs = chip_outputs(&chip);
            if temps.is_empty() && outputs.is_empty() {
                trace!("Skipped {} (no useful sensors)", chip.dir_name);
                continue;
            }
            info!(
                chip = %chip.name,
                dir = %chip.dir_name,
                temps = temps.len(),
                pwms = outputs.len(),
                "Found hwmon chip"
            );
            inventory.temperatures.extend(temps);
            inventory.outputs.extend(outputs);
        }

        if inventory.is_empty() {
            info!("Hardware inventory is empty");
        }
        Ok(inventory)
    }

    /// Walk the system tree at `/sys/class/hwmon`
    pub fn scan_system(io: &dyn HwmonIo) -> Result<Self> {
        Self::scan(Path::new(paths::HWMON_BASE), io)
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty() && self.outputs.is_empty()
    }

    pub fn temperature(&self, id: &SensorId) -> Option<&TemperaturePoint> {
        self.temperatures.iter().find(|t| &t.id == id)
    }

    pub fn output(&self, id: &OutputId) -> Option<&PwmOutput> {
        self.outputs.iter().find(|o| &o.id == id)
    }

    /// Re-read every temperature value
    pub fn refresh(&mut self, io: &dyn HwmonIo) {
        for point in &mut self.temperatures {
            point.refresh(io);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensorType;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn chip(base: &Path, dir: &str, name: Option<&str>) -> PathBuf {
        let path = base.join(dir);
        fs::create_dir_all(&path).unwrap();
        if let Some(name) = name {
            write(&path, "name", &format!("{}\n", name));
        }
        path
    }

    #[test]
    fn test_scan_pairs_pwm_enable_and_tach() {
        let tmp = TempDir::new().unwrap();
        let hw = chip(tmp.path(), "hwmon3", Some("nct6798"));
        write(&hw, "temp1_input", "35000");
        write(&hw, "temp1_label", "SYSTIN");
        write(&hw, "pwm1", "128");
        write(&hw, "pwm1_enable", "2");
        write(&hw, "fan1_input", "900");
        write(&hw, "pwm2", "0");
        write(&hw, "pwm2_max", "100");

        let inv = HwmonInventory::scan(tmp.path(), &SysfsIo).unwrap();

        assert_eq!(inv.temperatures.len(), 1);
        assert_eq!(inv.temperatures[0].sensor_type, SensorType::Motherboard);
        assert_eq!(inv.temperatures[0].label, "Motherboard: SYSTIN");
        assert_eq!(inv.outputs.len(), 2);

        let pwm1 = &inv.outputs[0];
        assert_eq!(pwm1.id, OutputId::new("hwmon3", 1));
        assert!(pwm1.enable_path.is_some());
        assert_eq!(pwm1.tach_path, Some(hw.join("fan1_input")));

        let pwm2 = &inv.outputs[1];
        assert!(pwm2.enable_path.is_none());
        assert!(pwm2.tach_path.is_none());
        assert_eq!(pwm2.raw_max, 100);
    }

    #[test]
    fn test_name_falls_back_to_directory() {
        let tmp = TempDir::new().unwrap();
        let hw = chip(tmp.path(), "hwmon0", None);
        write(&hw, "temp2_input", "41000");

        let temps = discover_temperatures(tmp.path());
        assert_eq!(temps.len(), 1);
        assert_eq!(temps[0].chip_name, "hwmon0");
        assert_eq!(temps[0].raw_label, "temp2");
        assert_eq!(temps[0].sensor_type, SensorType::Unknown);
    }

    #[test]
    fn test_indices_sorted_numerically() {
        let tmp = TempDir::new().unwrap();
        let hw = chip(tmp.path(), "hwmon1", Some("it8688"));
        for n in [10, 2, 1] {
            write(&hw, &format!("pwm{}", n), "50");
        }

        let outputs = discover_pwm_outputs(tmp.path());
        let indices: Vec<u32> = outputs.iter().map(|o| o.id.index).collect();
        assert_eq!(indices, vec![1, 2, 10]);
    }

    #[test]
    fn test_missing_tree() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        assert!(discover_temperatures(&missing).is_empty());
        assert!(matches!(
            HwmonInventory::scan(&missing, &SysfsIo),
            Err(LfcError::TreeUnavailable { .. })
        ));
    }

    #[test]
    fn test_empty_tree_is_valid() {
        let tmp = TempDir::new().unwrap();
        let inv = HwmonInventory::scan(tmp.path(), &SysfsIo).unwrap();
        assert!(inv.is_empty());
    }

    #[test]
    fn test_scan_system_never_panics() {
        // Containers may have no hwmon tree at all
        match HwmonInventory::scan_system(&SysfsIo) {
            Ok(_) | Err(LfcError::TreeUnavailable { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
}
