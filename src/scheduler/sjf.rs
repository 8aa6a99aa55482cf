use super::{CoreId, Dispatch, Scheduler, SimCtx, Time, min_ready_by};

/// Non-preemptive shortest job first, judged on the current burst's remaining service.
pub struct SjfScheduler;

impl Scheduler for SjfScheduler {
    fn select_next(&mut self, ctx: &SimCtx, _core: CoreId, _now: Time) -> Option<Dispatch> {
        min_ready_by(ctx, |p| p.current_service())
            .map(|process| Dispatch::to_completion(ctx, process))
    }
}
