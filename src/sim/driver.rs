use super::{
    metrics::Metrics,
    workload::{Workload, WorkloadError},
};
use crate::{
    core::{
        driver::SchedCore,
        event::TraceRecord,
        observer::DispatchRecord,
        state::{Process, SimCtx, Time},
    },
    scheduler::Scheduler,
};

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub num_cores: usize,
    // Keep one TraceRecord per applied event
    pub trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_cores: 1,
            trace: false,
        }
    }
}

/// A validated workload loaded into the engine, ready to run under a policy.
pub struct Sim {
    pub core: SchedCore,
}

impl Sim {
    /// Validate `workload` and schedule every arrival. Processes that arrive at
    /// the same instant join the ready queue in workload order.
    pub fn new(workload: Workload, config: SimConfig) -> Result<Self, WorkloadError> {
        if config.num_cores == 0 {
            return Err(WorkloadError::NoCores);
        }
        workload.validate()?;

        let mut core = SchedCore::new(config.num_cores, config.trace);
        for spec in workload.processes {
            core.admit(spec.into_process());
        }

        Ok(Self { core })
    }

    pub fn run<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, horizon: Option<Time>) -> Metrics {
        log::info!(
            "running {} processes on {} cores{}",
            self.ctx().processes.len(),
            self.ctx().cores.len(),
            horizon.map_or_else(String::new, |h| format!(" until t={h}"))
        );

        self.core.run(scheduler, horizon);
        let metrics = Metrics::collect(self.ctx());

        log::info!(
            "t={:.3}: {} of {} processes completed after {} events ({} stale)",
            self.core.now(),
            metrics.completed,
            self.ctx().processes.len(),
            self.core.observer().steps(),
            self.core.observer().stale_events()
        );
        metrics
    }

    pub fn ctx(&self) -> &SimCtx {
        &self.core.ctx
    }

    pub fn now(&self) -> Time {
        self.core.now()
    }

    pub fn all_processes_completed(&self) -> bool {
        self.ctx()
            .processes
            .values()
            .all(|p| p.completion_time.is_some())
    }

    pub fn processes_map<'a, T>(
        &'a self,
        f: impl Fn(&Process) -> T + 'a,
    ) -> impl Iterator<Item = T> + 'a {
        self.ctx().processes.values().map(f)
    }

    pub fn trace(&self) -> &[TraceRecord] {
        self.core.observer().trace()
    }

    pub fn timeline(&self) -> &[DispatchRecord] {
        self.core.observer().timeline()
    }
}
