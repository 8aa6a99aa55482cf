use super::{CoreId, Dispatch, Scheduler, SimCtx, Time, min_ready_by};

/// Non-preemptive priority scheduling. Lower numbers run first.
pub struct PriorityScheduler;

impl Scheduler for PriorityScheduler {
    fn select_next(&mut self, ctx: &SimCtx, _core: CoreId, _now: Time) -> Option<Dispatch> {
        min_ready_by(ctx, |p| p.priority).map(|process| Dispatch::to_completion(ctx, process))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testutil::ready_ctx;

    #[test]
    fn lower_value_wins() {
        let (ctx, keys) = ready_ctx(&[("P1", 1.0, 3), ("P2", 6.0, 1)]);
        let dispatch = PriorityScheduler.select_next(&ctx, 0, 0.0);
        assert_eq!(
            dispatch,
            Some(Dispatch {
                process: keys[1],
                run_for: 6.0
            })
        );
    }

    #[test]
    fn ties_go_to_earlier_arrival_in_queue() {
        let (ctx, keys) = ready_ctx(&[("P1", 1.0, 2), ("P2", 1.0, 0), ("P3", 1.0, 0)]);
        let dispatch = PriorityScheduler.select_next(&ctx, 0, 0.0);
        assert_eq!(dispatch.map(|d| d.process), Some(keys[1]));
    }
}
