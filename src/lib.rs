pub mod core;
pub mod scheduler;
pub mod sim;

pub use crate::core::{Burst, Pid, Time};
pub use scheduler::{Dispatch, Scheduler};
pub use sim::{Metrics, ProcessSpec, Sim, SimConfig, Workload, WorkloadError};
