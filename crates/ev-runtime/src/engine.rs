use ev_core::EventRef;

use crate::options::EngineOptions;
use crate::state::ExecutionState;

mod lifecycle;
mod snapshot;
mod step;

pub use snapshot::{InterpreterSnapshot, SnapshotFrame, SNAPSHOT_SCHEMA};

/// Why a slot ended while the interpreter still has work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldReason {
    Waiting,
    SceneChanging,
    /// A handler could not finish yet and will run again next slot.
    HandlerBlocked,
    BudgetExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing attached.
    Idle,
    Yielded(YieldReason),
    /// The root program ran past its last command during this slot.
    Exhausted,
}

/// Cooperative interpreter for one event: a root program plus the common
/// events it called, deepest last.
#[derive(Debug, Clone)]
pub struct Interpreter {
    stack: Vec<ExecutionState>,
    event: EventRef,
    options: EngineOptions,
}
