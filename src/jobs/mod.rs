// Job exports
pub mod monthly;

pub use monthly::{CycleOptions, CycleOutcome, JobError, MonthlyCycle};
