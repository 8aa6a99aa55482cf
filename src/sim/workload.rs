use rand::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::{Burst, Pid, Process, Time};

/// Reasons a workload is refused before any event is scheduled.
#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("process {pid} has no bursts")]
    EmptyBursts { pid: Pid },

    #[error("process {pid} burst {index} has CPU length {cpu}; must be positive")]
    NonPositiveCpu { pid: Pid, index: usize, cpu: Time },

    #[error("process {pid} burst {index} has I/O length {io}; must be zero or positive")]
    NegativeIo { pid: Pid, index: usize, io: Time },

    #[error("process {pid} has arrival time {arrival}; must be zero or positive")]
    NegativeArrival { pid: Pid, arrival: Time },

    #[error("process id {pid} appears more than once")]
    DuplicatePid { pid: Pid },

    #[error("simulation requires at least one core")]
    NoCores,

    #[error("failed to read workload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse workload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A process as handed to the simulator, before any runtime bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub pid: Pid,
    pub arrival: Time,
    pub bursts: Vec<Burst>,
    #[serde(default)]
    pub priority: i32,
}

impl ProcessSpec {
    pub fn new(pid: &str, arrival: Time, bursts: Vec<Burst>, priority: i32) -> Self {
        Self {
            pid: Pid::from(pid),
            arrival,
            bursts,
            priority,
        }
    }

    fn validate(&self) -> Result<(), WorkloadError> {
        let pid = || self.pid.clone();

        // NaN fails every one of these comparisons, so it is rejected too
        if !(self.arrival >= 0.0 && self.arrival.is_finite()) {
            return Err(WorkloadError::NegativeArrival {
                pid: pid(),
                arrival: self.arrival,
            });
        }
        if self.bursts.is_empty() {
            return Err(WorkloadError::EmptyBursts { pid: pid() });
        }
        for (index, burst) in self.bursts.iter().enumerate() {
            if !(burst.cpu > 0.0 && burst.cpu.is_finite()) {
                return Err(WorkloadError::NonPositiveCpu {
                    pid: pid(),
                    index,
                    cpu: burst.cpu,
                });
            }
            if !(burst.io >= 0.0 && burst.io.is_finite()) {
                return Err(WorkloadError::NegativeIo {
                    pid: pid(),
                    index,
                    io: burst.io,
                });
            }
        }
        Ok(())
    }

    pub fn into_process(self) -> Process {
        Process::new(self.pid, self.arrival, self.bursts, self.priority)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub processes: Vec<ProcessSpec>,
}

impl From<Vec<ProcessSpec>> for Workload {
    fn from(processes: Vec<ProcessSpec>) -> Self {
        Self { processes }
    }
}

impl Workload {
    pub fn from_json(json: &str) -> Result<Self, WorkloadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorkloadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), WorkloadError> {
        let mut seen = FxHashSet::default();
        for spec in &self.processes {
            spec.validate()?;
            if !seen.insert(&spec.pid) {
                return Err(WorkloadError::DuplicatePid {
                    pid: spec.pid.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Shape of a randomly generated workload.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    pub count: usize,
    pub arrival_rate: f64,
    pub cpu_mean: f64,
    pub io_prob: f64,
    pub io_mean: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 8,
            arrival_rate: 1.0,
            cpu_mean: 5.0,
            io_prob: 0.3,
            io_mean: 2.0,
        }
    }
}

const BURST_COUNTS: [usize; 5] = [1, 1, 2, 2, 3];
const MIN_DURATION: Time = 0.1;

/// Poisson arrivals with exponentially distributed burst lengths, reproducible
/// from `seed`. Only non-final bursts get I/O.
pub fn generate(config: &GeneratorConfig, seed: u64) -> Workload {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut processes = Vec::with_capacity(config.count);
    let mut t = 0.0;

    for i in 1..=config.count {
        t += exponential(&mut rng, config.arrival_rate);

        let num_bursts = BURST_COUNTS[rng.random_range(0..BURST_COUNTS.len())];
        let bursts = (0..num_bursts)
            .map(|b| {
                let cpu = exponential(&mut rng, 1.0 / config.cpu_mean).max(MIN_DURATION);
                let io = if b + 1 < num_bursts && rng.random::<f64>() < config.io_prob {
                    exponential(&mut rng, 1.0 / config.io_mean).max(MIN_DURATION)
                } else {
                    0.0
                };
                Burst::with_io(round3(cpu), round3(io))
            })
            .collect();

        processes.push(ProcessSpec {
            pid: Pid(format!("P{i}")),
            arrival: round3(t),
            bursts,
            priority: rng.random_range(0..=4),
        });
    }

    Workload { processes }
}

fn exponential(rng: &mut StdRng, rate: f64) -> f64 {
    -(1.0 - rng.random::<f64>()).ln() / rate
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_with_defaults() {
        let json = r#"{
            "processes": [
                {"pid": "P1", "arrival": 0, "bursts": [{"cpu": 3, "io": 2}, {"cpu": 1}]},
                {"pid": "P2", "arrival": 1.5, "bursts": [{"cpu": 2}], "priority": 3}
            ]
        }"#;
        let workload = Workload::from_json(json).unwrap();

        assert_eq!(workload.len(), 2);
        assert_eq!(
            workload.processes[0],
            ProcessSpec::new(
                "P1",
                0.0,
                vec![Burst::with_io(3.0, 2.0), Burst::cpu(1.0)],
                0
            )
        );
        assert_eq!(workload.processes[1].priority, 3);
        workload.validate().unwrap();
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Workload::from_json("{\"processes\": [{\"pid\": \"P1\"}]}").unwrap_err();
        assert!(matches!(err, WorkloadError::Parse(_)));
    }

    #[test]
    fn rejects_empty_bursts() {
        let workload = Workload::from(vec![ProcessSpec::new("P1", 0.0, vec![], 0)]);
        assert!(matches!(
            workload.validate(),
            Err(WorkloadError::EmptyBursts { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_cpu() {
        let workload = Workload::from(vec![ProcessSpec::new(
            "P1",
            0.0,
            vec![Burst::cpu(1.0), Burst::cpu(0.0)],
            0,
        )]);
        assert!(matches!(
            workload.validate(),
            Err(WorkloadError::NonPositiveCpu { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_negative_io_and_arrival() {
        let io = Workload::from(vec![ProcessSpec::new(
            "P1",
            0.0,
            vec![Burst::with_io(1.0, -1.0)],
            0,
        )]);
        assert!(matches!(io.validate(), Err(WorkloadError::NegativeIo { .. })));

        let arrival = Workload::from(vec![ProcessSpec::new("P1", -0.5, vec![Burst::cpu(1.0)], 0)]);
        assert!(matches!(
            arrival.validate(),
            Err(WorkloadError::NegativeArrival { .. })
        ));

        let nan = Workload::from(vec![ProcessSpec::new("P1", f64::NAN, vec![Burst::cpu(1.0)], 0)]);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_pids() {
        let workload = Workload::from(vec![
            ProcessSpec::new("P1", 0.0, vec![Burst::cpu(1.0)], 0),
            ProcessSpec::new("P1", 2.0, vec![Burst::cpu(1.0)], 0),
        ]);
        let err = workload.validate().unwrap_err();
        assert_eq!(err.to_string(), "process id P1 appears more than once");
    }

    #[test]
    fn generation_is_seeded() {
        let config = GeneratorConfig::default();
        let a = generate(&config, 42);
        let b = generate(&config, 42);
        assert_eq!(a, b);
        assert_ne!(a, generate(&config, 43));
    }

    #[test]
    fn generated_workloads_are_valid() {
        let config = GeneratorConfig {
            count: 50,
            ..GeneratorConfig::default()
        };
        let workload = generate(&config, 7);
        workload.validate().unwrap();
        assert_eq!(workload.len(), 50);

        let mut last = 0.0;
        for spec in &workload.processes {
            assert!(spec.arrival >= last);
            last = spec.arrival;
            assert!((1..=3).contains(&spec.bursts.len()));
            assert!((0..=4).contains(&spec.priority));
            assert_eq!(spec.bursts.last().map(|b| b.io), Some(0.0));
        }
    }
}
