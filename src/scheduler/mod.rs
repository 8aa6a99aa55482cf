pub mod fcfs;
pub mod priority;
pub mod rr;
pub mod sjf;

use crate::core::{CoreId, ProcessKey, SimCtx, Time};
pub use fcfs::FcfsScheduler;
pub use priority::PriorityScheduler;
pub use rr::RoundRobinScheduler;
pub use sjf::SjfScheduler;

pub const DEFAULT_QUANTUM: Time = 2.0;

/// A scheduling decision: run `process` on the asking core for at most `run_for`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    pub process: ProcessKey,
    pub run_for: Time,
}

impl Dispatch {
    /// Run `process` until its current burst ends.
    pub fn to_completion(ctx: &SimCtx, process: ProcessKey) -> Self {
        Self {
            process,
            run_for: ctx.process(process).current_service(),
        }
    }
}

/// Policy callbacks invoked by the engine.
///
/// Every notification has a no-op default; only [`Scheduler::select_next`] is
/// required. The engine owns the ready queue and moves processes in and out of
/// it itself (including after a preemption), so policies only observe and pick.
pub trait Scheduler {
    fn on_sim_start(&mut self, _ctx: &SimCtx) {}

    fn on_sim_end(&mut self, _ctx: &SimCtx) {}

    fn on_new_process(&mut self, _ctx: &SimCtx, _process: ProcessKey, _now: Time) {}

    fn on_io_complete(&mut self, _ctx: &SimCtx, _process: ProcessKey, _now: Time) {}

    fn on_preempt(&mut self, _ctx: &SimCtx, _process: ProcessKey, _core: CoreId, _now: Time) {}

    fn on_complete(&mut self, _ctx: &SimCtx, _process: ProcessKey, _core: CoreId, _now: Time) {}

    fn on_block(
        &mut self,
        _ctx: &SimCtx,
        _process: ProcessKey,
        _core: CoreId,
        _now: Time,
        _io: Time,
    ) {
    }

    // Burst finished with no I/O attached; the process is back on the ready queue
    fn on_return_from_io(
        &mut self,
        _ctx: &SimCtx,
        _process: ProcessKey,
        _core: CoreId,
        _now: Time,
    ) {
    }

    fn select_next(&mut self, ctx: &SimCtx, core: CoreId, now: Time) -> Option<Dispatch>;
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn on_sim_start(&mut self, ctx: &SimCtx) {
        (**self).on_sim_start(ctx)
    }

    fn on_sim_end(&mut self, ctx: &SimCtx) {
        (**self).on_sim_end(ctx)
    }

    fn on_new_process(&mut self, ctx: &SimCtx, process: ProcessKey, now: Time) {
        (**self).on_new_process(ctx, process, now)
    }

    fn on_io_complete(&mut self, ctx: &SimCtx, process: ProcessKey, now: Time) {
        (**self).on_io_complete(ctx, process, now)
    }

    fn on_preempt(&mut self, ctx: &SimCtx, process: ProcessKey, core: CoreId, now: Time) {
        (**self).on_preempt(ctx, process, core, now)
    }

    fn on_complete(&mut self, ctx: &SimCtx, process: ProcessKey, core: CoreId, now: Time) {
        (**self).on_complete(ctx, process, core, now)
    }

    fn on_block(&mut self, ctx: &SimCtx, process: ProcessKey, core: CoreId, now: Time, io: Time) {
        (**self).on_block(ctx, process, core, now, io)
    }

    fn on_return_from_io(&mut self, ctx: &SimCtx, process: ProcessKey, core: CoreId, now: Time) {
        (**self).on_return_from_io(ctx, process, core, now)
    }

    fn select_next(&mut self, ctx: &SimCtx, core: CoreId, now: Time) -> Option<Dispatch> {
        (**self).select_next(ctx, core, now)
    }
}

/// The built-in policies by name, round robin using `quantum`.
pub fn standard_policies(quantum: Time) -> Vec<(&'static str, Box<dyn Scheduler>)> {
    vec![
        ("fcfs", Box::new(FcfsScheduler)),
        ("sjf", Box::new(SjfScheduler)),
        ("rr", Box::new(RoundRobinScheduler::new(quantum))),
        ("priority", Box::new(PriorityScheduler)),
    ]
}

/// First ready process minimising `key`; earlier queue position wins ties.
pub(crate) fn min_ready_by<K, F>(ctx: &SimCtx, mut key: F) -> Option<ProcessKey>
where
    F: FnMut(&crate::core::Process) -> K,
    K: PartialOrd,
{
    let mut best: Option<(ProcessKey, K)> = None;
    for &candidate in ctx.ready_queue() {
        let k = key(ctx.process(candidate));
        if best.as_ref().is_none_or(|(_, best_k)| k < *best_k) {
            best = Some((candidate, k));
        }
    }
    best.map(|(process, _)| process)
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::core::{Burst, Pid, Process, ProcessKey, SimCtx};

    /// A context with one core and the given (pid, service, priority) processes on
    /// the ready queue, in order.
    pub fn ready_ctx(procs: &[(&str, f64, i32)]) -> (SimCtx, Vec<ProcessKey>) {
        let mut ctx = SimCtx::new(1);
        let keys = procs
            .iter()
            .map(|&(pid, cpu, priority)| {
                let key = ctx.create_process(Process::new(
                    Pid::from(pid),
                    0.0,
                    vec![Burst::cpu(cpu)],
                    priority,
                ));
                ctx.mark_ready(key);
                key
            })
            .collect();
        (ctx, keys)
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::ready_ctx;
    use super::*;

    #[test]
    fn min_ready_by_prefers_queue_order_on_ties() {
        let (ctx, keys) = ready_ctx(&[("A", 3.0, 0), ("B", 1.0, 0), ("C", 1.0, 0)]);
        assert_eq!(min_ready_by(&ctx, |p| p.current_service()), Some(keys[1]));
    }

    #[test]
    fn min_ready_by_empty_queue() {
        let (ctx, _) = ready_ctx(&[]);
        assert_eq!(min_ready_by(&ctx, |p| p.priority), None);
    }

    #[test]
    fn standard_policies_are_named_and_distinct() {
        let (ctx, keys) = ready_ctx(&[("A", 3.0, 2), ("B", 1.0, 1)]);
        let picks: Vec<_> = standard_policies(0.5)
            .into_iter()
            .map(|(name, mut policy)| (name, policy.select_next(&ctx, 0, 0.0)))
            .collect();

        let dispatch = |i: usize, run_for: f64| {
            Some(Dispatch {
                process: keys[i],
                run_for,
            })
        };
        assert_eq!(
            picks,
            vec![
                ("fcfs", dispatch(0, 3.0)),
                ("sjf", dispatch(1, 1.0)),
                ("rr", dispatch(0, 0.5)),
                ("priority", dispatch(1, 1.0)),
            ]
        );
    }

    #[test]
    fn boxed_scheduler_forwards_selection() {
        let (ctx, keys) = ready_ctx(&[("A", 3.0, 0)]);
        let mut boxed: Box<dyn Scheduler> = Box::new(FcfsScheduler);
        let dispatch = boxed.select_next(&ctx, 0, 0.0);
        assert_eq!(
            dispatch,
            Some(Dispatch {
                process: keys[0],
                run_for: 3.0
            })
        );
    }
}
