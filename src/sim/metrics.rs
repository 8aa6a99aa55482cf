use average::{Estimate, Max, Mean};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::{Pid, Process, SimCtx, Time};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessReport {
    pub arrival: Time,
    pub completion: Option<Time>,
    pub turnaround: Option<Time>,
    pub waiting: Option<Time>,
    pub response: Option<Time>,
    pub ready_wait: Time,
    /// CPU time charged so far. A slice is charged in full when it is
    /// dispatched, so after a bounded run this includes the unelapsed part of
    /// a dispatch whose end lies past the horizon.
    pub service: Time,
}

impl From<&Process> for ProcessReport {
    fn from(p: &Process) -> Self {
        Self {
            arrival: p.arrival,
            completion: p.completion_time,
            turnaround: p.turnaround(),
            waiting: p.waiting(),
            response: p.response_time,
            ready_wait: p.ready_wait,
            service: p.service_received,
        }
    }
}

/// End-of-run summary. Averages are `None` when nothing completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub avg_turnaround: Option<f64>,
    pub avg_waiting: Option<f64>,
    pub avg_response: Option<f64>,
    pub throughput: f64,
    pub completed: usize,
    pub makespan: Option<Time>,
    pub per_process: BTreeMap<Pid, ProcessReport>,
}

impl Metrics {
    pub fn collect(ctx: &SimCtx) -> Self {
        let completed: Vec<&Process> = ctx
            .processes
            .values()
            .filter(|p| p.completion_time.is_some())
            .collect();

        let per_process = ctx
            .processes
            .values()
            .map(|p| (p.pid.clone(), ProcessReport::from(p)))
            .collect();

        if completed.is_empty() {
            return Self {
                avg_turnaround: None,
                avg_waiting: None,
                avg_response: None,
                throughput: 0.0,
                completed: 0,
                makespan: None,
                per_process,
            };
        }

        let makespan = completed
            .iter()
            .filter_map(|p| p.completion_time)
            .collect::<Max>()
            .max();

        Self {
            avg_turnaround: avg(completed.iter().filter_map(|p| p.turnaround())),
            avg_waiting: avg(completed.iter().filter_map(|p| p.waiting())),
            avg_response: avg(completed.iter().filter_map(|p| p.response_time)),
            throughput: completed.len() as f64 / makespan.max(1.0),
            completed: completed.len(),
            makespan: Some(makespan),
            per_process,
        }
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> Option<f64> {
    let mean = iter.collect::<Mean>();
    (!mean.is_empty()).then(|| mean.estimate())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| format!("{v:.3}"))
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PID\tARRIVE\tDONE\tTAT\tWAIT\tRESP\tREADY")?;
        for (pid, r) in &self.per_process {
            writeln!(
                f,
                "{}\t{:.3}\t{}\t{}\t{}\t{}\t{:.3}",
                pid,
                r.arrival,
                fmt_opt(r.completion),
                fmt_opt(r.turnaround),
                fmt_opt(r.waiting),
                fmt_opt(r.response),
                r.ready_wait
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Average turnaround: {}", fmt_opt(self.avg_turnaround))?;
        writeln!(f, "Average waiting:    {}", fmt_opt(self.avg_waiting))?;
        writeln!(f, "Average response:   {}", fmt_opt(self.avg_response))?;
        write!(
            f,
            "Throughput:         {:.4} ({} completed)",
            self.throughput, self.completed
        )
    }
}
