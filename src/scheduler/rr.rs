use super::{CoreId, DEFAULT_QUANTUM, Dispatch, ProcessKey, Scheduler, SimCtx, Time};

/// Round robin: the head of the ready queue runs for at most one quantum.
///
/// A preempted process goes to the back of the ready queue (the engine puts
/// it there), so the queue rotates.
#[derive(Debug, Clone, Copy)]
pub struct RoundRobinScheduler {
    quantum: Time,
}

impl Default for RoundRobinScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTUM)
    }
}

impl RoundRobinScheduler {
    pub fn new(quantum: Time) -> Self {
        assert!(
            quantum.is_finite() && quantum > 0.0,
            "Round robin quantum must be positive, got {quantum}"
        );
        Self { quantum }
    }

    pub fn quantum(&self) -> Time {
        self.quantum
    }
}

impl Scheduler for RoundRobinScheduler {
    fn on_preempt(&mut self, ctx: &SimCtx, process: ProcessKey, core: CoreId, now: Time) {
        log::debug!(
            "t={now:.3} quantum expired for {} on core {core}",
            ctx.process(process).pid
        );
    }

    fn select_next(&mut self, ctx: &SimCtx, _core: CoreId, _now: Time) -> Option<Dispatch> {
        ctx.ready_front().map(|process| Dispatch {
            process,
            run_for: self.quantum,
        })
    }
}
