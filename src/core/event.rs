use keyed_priority_queue::KeyedPriorityQueue;
use std::cmp::Ordering;
use std::fmt;

use crate::core::{CoreId, ProcessKey, Time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Arrival { process: ProcessKey },
    IoComplete { process: ProcessKey },
    QuantumExpire { core: CoreId, process: ProcessKey },
    BurstComplete { core: CoreId, process: ProcessKey },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arrival { .. } => "Arrival",
            Self::IoComplete { .. } => "IoComplete",
            Self::QuantumExpire { .. } => "QuantumExpire",
            Self::BurstComplete { .. } => "BurstComplete",
        }
    }

    pub fn process(&self) -> ProcessKey {
        match *self {
            Self::Arrival { process }
            | Self::IoComplete { process }
            | Self::QuantumExpire { process, .. }
            | Self::BurstComplete { process, .. } => process,
        }
    }

    pub fn core(&self) -> Option<CoreId> {
        match *self {
            Self::QuantumExpire { core, .. } | Self::BurstComplete { core, .. } => Some(core),
            Self::Arrival { .. } | Self::IoComplete { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub time: Time,
    pub seq: u64,
    pub kind: EventKind,
}

// KeyedPriorityQueue is a max-heap: the earliest (time, seq) must compare greatest
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events ordered by time, then by creation order.
#[derive(Debug)]
pub struct EventQueue {
    events: KeyedPriorityQueue<u64, Event>,
    next_seq: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: KeyedPriorityQueue::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, time: Time, kind: EventKind) -> u64 {
        assert!(time.is_finite(), "Event {} scheduled at non-finite time", kind.name());
        let seq = self.next_seq;
        self.next_seq += 1;

        let displaced = self.events.push(seq, Event { time, seq, kind });
        debug_assert!(displaced.is_none(), "Event sequence {seq} reused");
        seq
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        self.events.pop().map(|(_, event)| event)
    }

    pub fn peek_time(&self) -> Option<Time> {
        self.events.peek().map(|(_, event)| event.time)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// One applied event, as written to the diagnostic trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub time: Time,
    pub kind: &'static str,
    pub payload: String,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[t={:.3}] Event: {} -> {}", self.time, self.kind, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<ProcessKey> {
        let mut map = SlotMap::<ProcessKey, ()>::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn pops_in_time_order() {
        let k = keys(3);
        let mut q = EventQueue::new();
        q.schedule(5.0, EventKind::Arrival { process: k[0] });
        q.schedule(1.0, EventKind::Arrival { process: k[1] });
        q.schedule(3.0, EventKind::IoComplete { process: k[2] });

        let times: Vec<_> = std::iter::from_fn(|| q.pop_next()).map(|e| e.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn equal_times_pop_fifo() {
        let k = keys(4);
        let mut q = EventQueue::new();
        for &process in &k {
            q.schedule(2.0, EventKind::Arrival { process });
        }
        q.schedule(1.0, EventKind::Arrival { process: k[3] });

        assert_eq!(q.pop_next().map(|e| e.time), Some(1.0));
        let order: Vec<_> = std::iter::from_fn(|| q.pop_next())
            .map(|e| e.kind.process())
            .collect();
        assert_eq!(order, k);
    }

    #[test]
    fn sequence_breaks_ties_across_kinds() {
        let k = keys(2);
        let mut q = EventQueue::new();
        let first = q.schedule(4.0, EventKind::BurstComplete { core: 0, process: k[0] });
        let second = q.schedule(4.0, EventKind::Arrival { process: k[1] });
        assert!(first < second);

        assert_eq!(q.pop_next().map(|e| e.seq), Some(first));
        assert_eq!(q.pop_next().map(|e| e.seq), Some(second));
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn peek_does_not_remove() {
        let k = keys(1);
        let mut q = EventQueue::new();
        q.schedule(7.5, EventKind::Arrival { process: k[0] });
        assert_eq!(q.peek_time(), Some(7.5));
        assert_eq!(q.len(), 1);
        assert!(q.pop_next().is_some());
        assert!(q.is_empty());
        assert_eq!(q.peek_time(), None);
    }

    #[test]
    fn trace_line_format() {
        let record = TraceRecord {
            time: 2.0,
            kind: "QuantumExpire",
            payload: "(0, P3)".to_owned(),
        };
        assert_eq!(record.to_string(), "[t=2.000] Event: QuantumExpire -> (0, P3)");
    }
}
