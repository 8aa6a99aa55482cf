use super::{
    event::{Event, EventKind, EventQueue, TraceRecord},
    observer::{DispatchOutcome, DispatchRecord, Observer},
    state::{CoreId, Process, ProcessKey, SimCtx, Time},
};
use crate::scheduler::{Dispatch, Scheduler};

/// The event loop: owns the clock, the event queue and the process table.
pub struct SchedCore {
    pub ctx: SimCtx,
    events: EventQueue,
    observer: Observer,
}

impl SchedCore {
    pub fn new(num_cores: usize, trace: bool) -> Self {
        assert!(num_cores > 0, "Simulation requires at least one core");
        Self {
            ctx: SimCtx::new(num_cores),
            events: EventQueue::new(),
            observer: Observer::new(trace),
        }
    }

    /// Add a process to the table and schedule its arrival.
    pub fn admit(&mut self, process: Process) -> ProcessKey {
        let arrival = process.arrival;
        let key = self.ctx.create_process(process);
        self.events.schedule(arrival, EventKind::Arrival { process: key });
        key
    }

    /// Apply events until the queue drains or the next one lies past `horizon`.
    ///
    /// An event past the horizon stays queued, so a later call with a larger
    /// horizon picks up exactly where this one stopped.
    pub fn run<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, horizon: Option<Time>) {
        scheduler.on_sim_start(&self.ctx);

        while let Some(next) = self.events.peek_time() {
            if horizon.is_some_and(|limit| next > limit) {
                log::debug!("stopping before t={next:.3}, past horizon");
                break;
            }
            let Some(event) = self.events.pop_next() else {
                break;
            };
            self.step(scheduler, event);
        }

        scheduler.on_sim_end(&self.ctx);
    }

    fn step<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, event: Event) {
        self.ctx.advance_to(event.time);
        let record = self.trace_record(&event);
        self.observer.record_event(record);

        self.apply(scheduler, event.kind);
        self.dispatch_idle(scheduler);

        self.observer.observe(&self.ctx);
    }

    fn apply<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, kind: EventKind) {
        let now = self.ctx.now;
        match kind {
            EventKind::Arrival { process } => {
                self.ctx.mark_ready(process);
                scheduler.on_new_process(&self.ctx, process, now);
            }
            EventKind::IoComplete { process } => {
                self.ctx.unblock(process);
                self.ctx.mark_ready(process);
                scheduler.on_io_complete(&self.ctx, process, now);
            }
            EventKind::QuantumExpire { core, process } => {
                if !self.occupies(core, process) {
                    self.ignore_stale(kind);
                    return;
                }
                self.ctx.clear_core(core);
                self.ctx.mark_ready(process);
                scheduler.on_preempt(&self.ctx, process, core, now);
            }
            EventKind::BurstComplete { core, process } => {
                if !self.occupies(core, process) {
                    self.ignore_stale(kind);
                    return;
                }
                self.ctx.clear_core(core);

                let done = self.ctx.process(process).is_done();
                let io = self.ctx.process(process).io_after_last_burst();
                if done {
                    self.ctx.mark_completed(process);
                    scheduler.on_complete(&self.ctx, process, core, now);
                } else if io > 0.0 {
                    let until = now + io;
                    self.ctx.mark_blocked(process, until);
                    self.events
                        .schedule(until, EventKind::IoComplete { process });
                    scheduler.on_block(&self.ctx, process, core, now, io);
                } else {
                    self.ctx.mark_ready(process);
                    scheduler.on_return_from_io(&self.ctx, process, core, now);
                }
            }
        }
    }

    fn occupies(&self, core: CoreId, process: ProcessKey) -> bool {
        self.ctx.cores[core].current == Some(process)
    }

    fn ignore_stale(&mut self, kind: EventKind) {
        log::debug!(
            "t={:.3} ignoring stale {} for {}",
            self.ctx.now,
            kind.name(),
            self.ctx.process(kind.process()).pid
        );
        self.observer.record_stale();
    }

    fn dispatch_idle<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        for core in 0..self.ctx.cores.len() {
            if !self.ctx.core_is_idle(core) {
                continue;
            }
            if let Some(dispatch) = scheduler.select_next(&self.ctx, core, self.ctx.now) {
                self.dispatch(core, dispatch);
            }
        }
    }

    fn dispatch(&mut self, core: CoreId, Dispatch { process, run_for }: Dispatch) {
        assert!(
            run_for.is_finite() && run_for > 0.0,
            "Scheduler asked for a run of {run_for} on core {core}"
        );
        assert!(
            self.ctx.take_ready(process),
            "Scheduler selected {} which is not ready",
            self.ctx.process(process).pid
        );
        self.ctx.set_running(core, process);

        let now = self.ctx.now;
        let target = self.ctx.process_mut(process);
        let burst_before = target.burst_index();
        let used = target.consume(run_for);
        let burst_finished = target.burst_index() != burst_before;
        let pid = target.pid.clone();

        let end = now + used;
        let (kind, outcome) = if burst_finished {
            (
                EventKind::BurstComplete { core, process },
                DispatchOutcome::BurstComplete,
            )
        } else {
            (
                EventKind::QuantumExpire { core, process },
                DispatchOutcome::QuantumExpire,
            )
        };
        log::debug!("t={now:.3} core {core} <- {pid} for {used:.3}");

        self.events.schedule(end, kind);
        self.observer.record_dispatch(DispatchRecord {
            core,
            pid,
            start: now,
            end,
            outcome,
        });
    }

    fn trace_record(&self, event: &Event) -> TraceRecord {
        let pid = &self.ctx.process(event.kind.process()).pid;
        let payload = match event.kind.core() {
            Some(core) => format!("({core}, {pid})"),
            None => pid.to_string(),
        };
        TraceRecord {
            time: event.time,
            kind: event.kind.name(),
            payload,
        }
    }

    pub fn now(&self) -> Time {
        self.ctx.now
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
