use ev_core::{EventRef, Program};

use super::Interpreter;
use crate::options::EngineOptions;
use crate::state::ExecutionState;

impl Interpreter {
    pub fn new(options: EngineOptions) -> Self {
        Self::for_event(EventRef::default(), options)
    }

    /// Interpreter owned by a map event; self switches and `this` resolve to it.
    pub fn for_event(event: EventRef, options: EngineOptions) -> Self {
        Self {
            stack: Vec::new(),
            event,
            options,
        }
    }

    /// Starts `program` at `entry_offset`, discarding whatever was running.
    pub fn attach(&mut self, program: Program, entry_offset: usize) {
        tracing::debug!(
            program = %program.id(),
            entry_offset,
            map_id = self.event.map_id,
            event_id = self.event.event_id,
            "attaching event program"
        );
        self.stack.clear();
        self.stack
            .push(ExecutionState::new(program, entry_offset, self.event, 0));
    }

    /// Drops the root program and every child it called.
    pub fn detach(&mut self) {
        self.stack.clear();
    }

    pub fn is_running(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Number of execution states on the call stack, root included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pointer of the state that runs next.
    pub fn instruction_pointer(&self) -> Option<usize> {
        self.stack.last().map(ExecutionState::pointer)
    }

    pub fn current(&self) -> Option<&ExecutionState> {
        self.stack.last()
    }

    pub fn event(&self) -> EventRef {
        self.event
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }
}
