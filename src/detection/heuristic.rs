//! Static fallback coupling
//!
//! Used when perturbation is disabled or inconclusive: prefer sensors on the
//! output's own chip, picking by type priority; with none there, apply the
//! same priority to the whole inventory.

use tracing::debug;

use crate::data::{CouplingEvidence, CouplingRecord, CouplingTable, OutputId, SensorType, TemperaturePoint};

const PRIORITY: [SensorType; 7] = [
    SensorType::Water,
    SensorType::Cpu,
    SensorType::Gpu,
    SensorType::Ambient,
    SensorType::Nvme,
    SensorType::Chipset,
    SensorType::Motherboard,
];

/// Highest-priority sensor among `candidates`, or the first one
pub fn pick_sensor<'a>(candidates: &[&'a TemperaturePoint]) -> Option<&'a TemperaturePoint> {
    PRIORITY
        .iter()
        .find_map(|ty| candidates.iter().find(|t| t.sensor_type == *ty))
        .or_else(|| candidates.first())
        .copied()
}

pub fn heuristic_record(output: &OutputId, temps: &[TemperaturePoint]) -> Option<CouplingRecord> {
    let same_chip: Vec<&TemperaturePoint> = temps.iter().filter(|t| t.id.chip == output.chip).collect();
    let (chosen, evidence) = if same_chip.is_empty() {
        let all: Vec<&TemperaturePoint> = temps.iter().collect();
        (pick_sensor(&all)?, CouplingEvidence::AnyChip)
    } else {
        (pick_sensor(&same_chip)?, CouplingEvidence::SameChip)
    };

    Some(CouplingRecord {
        output: output.clone(),
        sensor: chosen.id.clone(),
        sensor_label: chosen.label.clone(),
        evidence,
    })
}

pub fn heuristic_coupling(outputs: &[OutputId], temps: &[TemperaturePoint]) -> CouplingTable {
    let mut table = CouplingTable::new();
    fill_missing(&mut table, outputs, temps);
    table
}

/// Add heuristic records for outputs the table does not cover yet
///
/// Returns how many records were added.
pub fn fill_missing(table: &mut CouplingTable, outputs: &[OutputId], temps: &[TemperaturePoint]) -> usize {
    let mut added = 0;
    for output in outputs {
        if table.contains(output) {
            continue;
        }
        if let Some(record) = heuristic_record(output, temps) {
            debug!(output = %output, sensor = %record.sensor, evidence = ?record.evidence, "Heuristic coupling");
            table.insert(record);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensorId;
    use std::path::PathBuf;

    fn temp(chip: &str, index: u32, sensor_type: SensorType) -> TemperaturePoint {
        TemperaturePoint {
            id: SensorId::new(chip, index),
            chip_name: chip.to_string(),
            path: PathBuf::from(format!("/{}/temp{}_input", chip, index)),
            raw_label: format!("temp{}", index),
            label: format!("{}: temp{}", sensor_type, index),
            sensor_type,
            value: None,
        }
    }

    #[test]
    fn test_priority_on_same_chip() {
        let temps = vec![
            temp("hwmon2", 1, SensorType::Motherboard),
            temp("hwmon2", 2, SensorType::Cpu),
            temp("hwmon2", 3, SensorType::Water),
            temp("hwmon0", 1, SensorType::Cpu),
        ];
        let record = heuristic_record(&OutputId::new("hwmon2", 1), &temps).unwrap();

        assert_eq!(record.sensor, SensorId::new("hwmon2", 3));
        assert_eq!(record.evidence, CouplingEvidence::SameChip);
    }

    #[test]
    fn test_falls_back_to_whole_inventory() {
        let temps = vec![temp("hwmon0", 1, SensorType::Nvme), temp("hwmon1", 1, SensorType::Gpu)];
        let record = heuristic_record(&OutputId::new("hwmon5", 1), &temps).unwrap();

        assert_eq!(record.sensor, SensorId::new("hwmon1", 1));
        assert_eq!(record.evidence, CouplingEvidence::AnyChip);
    }

    #[test]
    fn test_first_available_when_all_unknown() {
        let temps = vec![temp("hwmon0", 4, SensorType::Unknown), temp("hwmon0", 1, SensorType::Vrm)];
        let record = heuristic_record(&OutputId::new("hwmon0", 1), &temps).unwrap();
        assert_eq!(record.sensor.index, 4);
    }

    #[test]
    fn test_no_temperatures_no_record() {
        assert!(heuristic_record(&OutputId::new("hwmon0", 1), &[]).is_none());
    }

    #[test]
    fn test_fill_keeps_measured_records() {
        let temps = vec![temp("hwmon0", 1, SensorType::Cpu), temp("hwmon0", 2, SensorType::Gpu)];
        let mut table = CouplingTable::new();
        table.insert(CouplingRecord {
            output: OutputId::new("hwmon0", 1),
            sensor: SensorId::new("hwmon0", 2),
            sensor_label: "GPU: temp2".into(),
            evidence: CouplingEvidence::Measured { delta_c: 2.0 },
        });

        let added = fill_missing(&mut table, &[OutputId::new("hwmon0", 1), OutputId::new("hwmon0", 2)], &temps);

        assert_eq!(added, 1);
        assert_eq!(table.get(&OutputId::new("hwmon0", 1)).unwrap().sensor.index, 2);
        assert_eq!(table.get(&OutputId::new("hwmon0", 2)).unwrap().sensor.index, 1);
    }
}
