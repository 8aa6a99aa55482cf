use super::event::TraceRecord;
use super::state::{CoreId, Pid, ProcessState, SimCtx, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    BurstComplete,
    QuantumExpire,
}

/// One stretch of a process on a core; the rows of a Gantt chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub core: CoreId,
    pub pid: Pid,
    pub start: Time,
    pub end: Time,
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
    stale: u64,
    last_time: Time,
    trace: Option<Vec<TraceRecord>>,
    timeline: Vec<DispatchRecord>,
}

impl Observer {
    pub fn new(trace: bool) -> Self {
        Self {
            trace: trace.then(Vec::new),
            ..Self::default()
        }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn stale_events(&self) -> u64 {
        self.stale
    }

    pub fn trace(&self) -> &[TraceRecord] {
        self.trace.as_deref().unwrap_or_default()
    }

    pub fn timeline(&self) -> &[DispatchRecord] {
        &self.timeline
    }

    pub fn record_event(&mut self, record: TraceRecord) {
        log::trace!("{record}");
        if let Some(trace) = &mut self.trace {
            trace.push(record);
        }
    }

    pub fn record_stale(&mut self) {
        self.stale += 1;
    }

    pub fn record_dispatch(&mut self, record: DispatchRecord) {
        self.timeline.push(record);
    }

    pub fn observe(&mut self, ctx: &SimCtx) {
        self.step += 1;

        debug_assert!(
            ctx.now >= self.last_time,
            "Clock went backwards: {} -> {}",
            self.last_time,
            ctx.now
        );
        self.last_time = ctx.now;

        for core in &ctx.cores {
            if let Some(key) = core.current {
                let process = ctx.process(key);
                debug_assert_eq!(
                    process.state,
                    ProcessState::Running,
                    "core.current process {} must be Running",
                    process.pid
                );
                debug_assert_eq!(
                    process.current_core,
                    Some(core.id),
                    "Process {} metadata current_core mismatch",
                    process.pid
                );
                debug_assert!(
                    !ctx.is_ready(key) && !ctx.is_blocked(key),
                    "Running process {} must not be queued",
                    process.pid
                );
            }
        }

        for &key in ctx.ready_queue() {
            let process = ctx.process(key);
            debug_assert_eq!(
                process.state,
                ProcessState::Ready,
                "Process {} in ready queue but not Ready",
                process.pid
            );
        }

        for (key, until) in ctx.blocked() {
            let process = ctx.process(key);
            debug_assert_eq!(
                process.state,
                ProcessState::Blocked,
                "Process {} in blocked set but not Blocked",
                process.pid
            );
            debug_assert!(
                until >= ctx.now,
                "Process {} should have left I/O at {until}",
                process.pid
            );
        }

        for (_, process) in &ctx.processes {
            if process.completion_time.is_some() {
                debug_assert!(
                    process.is_done() && process.state == ProcessState::Done,
                    "Process {} completed with bursts left",
                    process.pid
                );
            } else if process.is_done() {
                // Service is charged at dispatch, so the final burst stays
                // Running until its BurstComplete is applied.
                debug_assert_eq!(
                    process.state,
                    ProcessState::Running,
                    "Process {} finished its bursts but never completed",
                    process.pid
                );
            }
        }
    }
}
