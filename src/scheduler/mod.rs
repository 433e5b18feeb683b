pub mod assignment;
pub mod decision;
pub mod policy;
mod scheduler;

pub use decision::{CycleOutcome, Placement};
pub use policy::AssignmentAlgorithm;
pub use scheduler::Scheduler;
