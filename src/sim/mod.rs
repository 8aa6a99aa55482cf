pub mod driver;
pub mod metrics;
pub mod workload;

pub use driver::{Sim, SimConfig};
pub use metrics::{Metrics, ProcessReport};
pub use workload::{GeneratorConfig, ProcessSpec, Workload, WorkloadError, generate};
