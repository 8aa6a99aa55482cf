pub mod driver;
pub mod event;
pub mod observer;
pub mod state;

pub use driver::SchedCore;
pub use event::{Event, EventKind, EventQueue, TraceRecord};
pub use observer::{DispatchOutcome, DispatchRecord, Observer};
pub use state::{
    Burst, CoreId, CoreSlot, Pid, Process, ProcessKey, ProcessState, SERVICE_EPSILON, SimCtx,
    Time,
};
