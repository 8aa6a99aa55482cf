use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;
use std::fmt;

pub type CoreId = usize;
pub type Time = f64;

// Remaining service at or below this is treated as a finished burst
pub const SERVICE_EPSILON: Time = 1e-9;

new_key_type! {
    pub struct ProcessKey;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub String);

impl From<&str> for Pid {
    fn from(pid: &str) -> Self {
        Self(pid.to_owned())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One CPU burst and the I/O wait that follows it (0 means none).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Burst {
    pub cpu: Time,
    #[serde(default)]
    pub io: Time,
}

impl Burst {
    pub fn cpu(cpu: Time) -> Self {
        Self { cpu, io: 0.0 }
    }

    pub fn with_io(cpu: Time, io: Time) -> Self {
        Self { cpu, io }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Done,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub arrival: Time,
    pub priority: i32,
    pub state: ProcessState,
    pub current_core: Option<CoreId>,
    pub start_time: Option<Time>,
    pub completion_time: Option<Time>,
    pub response_time: Option<Time>,
    pub ready_wait: Time,
    pub service_received: Time,
    bursts: Vec<Burst>,
    burst_index: usize,
    remaining: Time,
    ready_since: Option<Time>,
}

impl Process {
    pub fn new(pid: Pid, arrival: Time, bursts: Vec<Burst>, priority: i32) -> Self {
        assert!(!bursts.is_empty(), "Process {pid} has no bursts");
        let remaining = bursts[0].cpu;

        Self {
            pid,
            arrival,
            priority,
            state: ProcessState::New,
            current_core: None,
            start_time: None,
            completion_time: None,
            response_time: None,
            ready_wait: 0.0,
            service_received: 0.0,
            bursts,
            burst_index: 0,
            remaining,
            ready_since: None,
        }
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    pub fn burst_index(&self) -> usize {
        self.burst_index
    }

    pub fn is_done(&self) -> bool {
        self.burst_index >= self.bursts.len()
    }

    /// Service left on the active burst; the full burst if it has not run yet.
    pub fn current_service(&self) -> Time {
        if self.is_done() { 0.0 } else { self.remaining }
    }

    pub fn total_service(&self) -> Time {
        self.bursts.iter().map(|b| b.cpu).sum()
    }

    /// Apply up to `amount` of service to the active burst and return what was
    /// actually used. Finishing the burst advances to the next one (or Done).
    pub fn consume(&mut self, amount: Time) -> Time {
        debug_assert!(amount >= 0.0, "Cannot consume negative service");
        if self.is_done() {
            return 0.0;
        }

        let used = if amount >= self.remaining - SERVICE_EPSILON {
            self.remaining
        } else {
            amount
        };
        self.remaining -= used;
        self.service_received += used;
        debug_assert!(self.remaining >= 0.0, "{} remaining went negative", self.pid);

        if self.remaining <= SERVICE_EPSILON {
            self.burst_index += 1;
            self.remaining = self.bursts.get(self.burst_index).map_or(0.0, |b| b.cpu);
        }

        used
    }

    /// I/O attached to the burst that just finished.
    pub fn io_after_last_burst(&self) -> Time {
        self.burst_index
            .checked_sub(1)
            .and_then(|idx| self.bursts.get(idx))
            .map_or(0.0, |b| b.io)
    }

    pub fn turnaround(&self) -> Option<Time> {
        self.completion_time.map(|done| done - self.arrival)
    }

    pub fn waiting(&self) -> Option<Time> {
        self.turnaround()
            .map(|turnaround| turnaround - self.service_received)
    }
}

#[derive(Debug)]
pub struct CoreSlot {
    pub id: CoreId,
    pub current: Option<ProcessKey>,
}

/// The process table and every queue that refers into it.
///
/// Ready, blocked and running structures only ever hold [`ProcessKey`]s, so
/// a mutation made through [`SimCtx::process_mut`] is seen by all of them.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Time,
    pub cores: Vec<CoreSlot>,
    pub processes: SlotMap<ProcessKey, Process>,
    ready: VecDeque<ProcessKey>,
    // Process --> time its I/O completes
    blocked: FxHashMap<ProcessKey, Time>,
    pids: FxHashMap<Pid, ProcessKey>,
}

impl SimCtx {
    pub fn new(num_cores: usize) -> Self {
        Self {
            now: 0.0,
            cores: (0..num_cores)
                .map(|id| CoreSlot { id, current: None })
                .collect(),
            processes: SlotMap::with_key(),
            ready: VecDeque::new(),
            blocked: FxHashMap::default(),
            pids: FxHashMap::default(),
        }
    }

    pub fn create_process(&mut self, process: Process) -> ProcessKey {
        assert!(
            !self.pids.contains_key(&process.pid),
            "Process {} already in process table",
            process.pid
        );
        let pid = process.pid.clone();
        let key = self.processes.insert(process);
        self.pids.insert(pid, key);
        key
    }

    pub fn advance_to(&mut self, time: Time) {
        debug_assert!(time >= self.now, "Clock moved backwards: {} -> {time}", self.now);
        self.now = time;
    }

    pub fn process(&self, key: ProcessKey) -> &Process {
        &self.processes[key]
    }

    pub fn process_mut(&mut self, key: ProcessKey) -> &mut Process {
        &mut self.processes[key]
    }

    pub fn lookup(&self, pid: &Pid) -> Option<ProcessKey> {
        self.pids.get(pid).copied()
    }

    pub fn ready_queue(&self) -> &VecDeque<ProcessKey> {
        &self.ready
    }

    pub fn ready_front(&self) -> Option<ProcessKey> {
        self.ready.front().copied()
    }

    pub fn is_ready(&self, key: ProcessKey) -> bool {
        self.ready.contains(&key)
    }

    pub fn is_blocked(&self, key: ProcessKey) -> bool {
        self.blocked.contains_key(&key)
    }

    pub fn blocked(&self) -> impl Iterator<Item = (ProcessKey, Time)> + '_ {
        self.blocked.iter().map(|(&key, &until)| (key, until))
    }

    pub fn core_is_idle(&self, core: CoreId) -> bool {
        self.cores[core].current.is_none()
    }

    pub fn mark_ready(&mut self, key: ProcessKey) {
        let now = self.now;
        let process = self.process_mut(key);
        debug_assert!(
            matches!(
                process.state,
                ProcessState::New | ProcessState::Blocked | ProcessState::Running
            ),
            "Process {} cannot become ready from {:?}",
            process.pid,
            process.state
        );
        process.state = ProcessState::Ready;
        process.current_core = None;
        process.ready_since = Some(now);

        debug_assert!(!self.ready.contains(&key), "Process enqueued twice");
        self.ready.push_back(key);
    }

    // Remove from the ready queue, preserving the order of everyone else
    pub fn take_ready(&mut self, key: ProcessKey) -> bool {
        let Some(pos) = self.ready.iter().position(|&k| k == key) else {
            return false;
        };
        self.ready.remove(pos);

        let now = self.now;
        let process = self.process_mut(key);
        if let Some(since) = process.ready_since.take() {
            process.ready_wait += now - since;
        }
        true
    }

    pub fn mark_blocked(&mut self, key: ProcessKey, until: Time) {
        debug_assert!(!self.ready.contains(&key), "Blocking a process that is still ready");
        let process = self.process_mut(key);
        process.state = ProcessState::Blocked;
        process.current_core = None;
        self.blocked.insert(key, until);
    }

    pub fn unblock(&mut self, key: ProcessKey) {
        let removed = self.blocked.remove(&key);
        debug_assert!(removed.is_some(), "Process was not blocked");
    }

    pub fn mark_completed(&mut self, key: ProcessKey) {
        let now = self.now;
        let process = self.process_mut(key);
        debug_assert_eq!(
            process.state,
            ProcessState::Running,
            "Process {} must have been running before completing",
            process.pid
        );
        assert!(process.is_done(), "Process {} completed with bursts left", process.pid);
        assert!(
            process.completion_time.is_none(),
            "Process {} completed twice",
            process.pid
        );

        process.state = ProcessState::Done;
        process.current_core = None;
        process.completion_time = Some(now);
    }

    /// Put `key` on `core`, recording first-dispatch timestamps.
    pub fn set_running(&mut self, core: CoreId, key: ProcessKey) {
        debug_assert!(!self.ready.contains(&key), "Running process must not be ready");
        assert!(
            self.cores[core].current.is_none(),
            "Core {core} already running a process"
        );

        self.cores[core].current = Some(key);
        let now = self.now;
        let process = self.process_mut(key);
        process.state = ProcessState::Running;
        process.current_core = Some(core);
        if process.start_time.is_none() {
            process.start_time = Some(now);
            process.response_time = Some(now - process.arrival);
        }
    }

    pub fn clear_core(&mut self, core: CoreId) -> Option<ProcessKey> {
        self.cores[core].current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(bursts: Vec<Burst>) -> Process {
        Process::new(Pid::from("P1"), 0.0, bursts, 0)
    }

    #[test]
    fn current_service_is_full_burst_before_running() {
        let p = single(vec![Burst::cpu(4.0), Burst::cpu(2.0)]);
        assert_eq!(p.current_service(), 4.0);
        assert_eq!(p.total_service(), 6.0);
    }

    #[test]
    fn consume_caps_at_remaining_and_advances() {
        let mut p = single(vec![Burst::with_io(3.0, 1.5), Burst::cpu(2.0)]);

        assert_eq!(p.consume(1.0), 1.0);
        assert_eq!(p.burst_index(), 0);
        assert_eq!(p.current_service(), 2.0);

        assert_eq!(p.consume(10.0), 2.0);
        assert_eq!(p.burst_index(), 1);
        assert_eq!(p.current_service(), 2.0);
        assert_eq!(p.io_after_last_burst(), 1.5);

        assert_eq!(p.consume(2.0), 2.0);
        assert!(p.is_done());
        assert_eq!(p.current_service(), 0.0);
        assert_eq!(p.io_after_last_burst(), 0.0);
        assert_eq!(p.consume(1.0), 0.0);
        assert_eq!(p.service_received, 5.0);
    }

    #[test]
    fn consume_within_epsilon_finishes_burst() {
        let mut p = single(vec![Burst::cpu(1.0)]);
        let used = p.consume(1.0 - SERVICE_EPSILON / 2.0);
        assert_eq!(used, 1.0);
        assert!(p.is_done());
    }

    #[test]
    fn io_after_last_burst_is_zero_before_any_progress() {
        let p = single(vec![Burst::with_io(1.0, 5.0)]);
        assert_eq!(p.io_after_last_burst(), 0.0);
    }

    #[test]
    fn ready_queue_preserves_order_on_removal() {
        let mut ctx = SimCtx::new(1);
        let keys: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|pid| {
                ctx.create_process(Process::new(Pid::from(*pid), 0.0, vec![Burst::cpu(1.0)], 0))
            })
            .collect();
        for &k in &keys {
            ctx.mark_ready(k);
        }

        assert!(ctx.take_ready(keys[1]));
        assert!(!ctx.take_ready(keys[1]));
        let order: Vec<_> = ctx.ready_queue().iter().copied().collect();
        assert_eq!(order, vec![keys[0], keys[2]]);
    }

    #[test]
    fn ready_wait_accumulates_between_enqueue_and_dispatch() {
        let mut ctx = SimCtx::new(1);
        let key = ctx.create_process(Process::new(Pid::from("P1"), 1.0, vec![Burst::cpu(1.0)], 0));
        ctx.advance_to(1.0);
        ctx.mark_ready(key);
        ctx.advance_to(3.5);
        assert!(ctx.take_ready(key));
        ctx.set_running(0, key);

        let p = ctx.process(key);
        assert_eq!(p.ready_wait, 2.5);
        assert_eq!(p.start_time, Some(3.5));
        assert_eq!(p.response_time, Some(2.5));
        assert_eq!(p.current_core, Some(0));
    }

    #[test]
    fn lookup_by_pid() {
        let mut ctx = SimCtx::new(2);
        let key = ctx.create_process(single(vec![Burst::cpu(1.0)]));
        assert_eq!(ctx.lookup(&Pid::from("P1")), Some(key));
        assert_eq!(ctx.lookup(&Pid::from("P2")), None);
    }
}
