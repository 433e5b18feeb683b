pub mod simulator;
pub mod trace;

pub use simulator::{ProgressInfo, Simulator, Snapshot, TraceEntry};
pub use trace::TraceWriter;
