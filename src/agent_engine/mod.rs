pub mod engine;
pub mod history;
pub mod planner;
pub mod state;

pub use engine::InstructionExecutor;
pub use history::{ExecutionReport, StepRecord};
pub use planner::Planner;
pub use state::{Action, ExecutionState};
