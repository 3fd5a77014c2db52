mod cache;
mod dispatch;
mod engine;
mod host;
mod options;
mod state;

pub use cache::{IdleCache, ProgramCache, PROGRAM_IDLE_TICKS, RESOURCE_IDLE_TICKS};
pub use engine::{
    Interpreter, InterpreterSnapshot, SnapshotFrame, StepOutcome, YieldReason, SNAPSHOT_SCHEMA,
};
pub use host::EventHost;
pub use options::{CacheOptions, EngineOptions, DEFAULT_ITERATION_CAP, DEFAULT_MAX_CALL_DEPTH};
pub use state::{BranchResult, ExecutionState};
