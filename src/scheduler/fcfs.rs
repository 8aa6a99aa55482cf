use super::{CoreId, Dispatch, Scheduler, SimCtx, Time};

/// First come, first served: the head of the ready queue runs its whole burst.
pub struct FcfsScheduler;

impl Scheduler for FcfsScheduler {
    fn select_next(&mut self, ctx: &SimCtx, _core: CoreId, _now: Time) -> Option<Dispatch> {
        ctx.ready_front()
            .map(|process| Dispatch::to_completion(ctx, process))
    }
}
