use std::collections::BTreeMap;

use ev_core::{EventRef, Program};
use serde::{Deserialize, Serialize};

/// Outcome recorded by a branching command for the block at its indent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum BranchResult {
    Condition(bool),
    Choice(i64),
}

/// One running program on the interpreter's call stack.
///
/// Holds only the raw program and structural position; the compiled form is
/// looked up again on every step.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub(crate) program: Program,
    pub(crate) pointer: usize,
    pub(crate) wait_count: u64,
    pub(crate) branch: BTreeMap<i32, BranchResult>,
    pub(crate) event: EventRef,
    pub(crate) depth: usize,
}

impl ExecutionState {
    pub fn new(program: Program, entry_offset: usize, event: EventRef, depth: usize) -> Self {
        Self {
            program,
            pointer: entry_offset,
            wait_count: 0,
            branch: BTreeMap::new(),
            event,
            depth,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn wait_count(&self) -> u64 {
        self.wait_count
    }

    pub fn branch(&self, indent: i32) -> Option<BranchResult> {
        self.branch.get(&indent).copied()
    }

    pub fn event(&self) -> EventRef {
        self.event
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_exhausted(&self) -> bool {
        self.pointer >= self.program.len()
    }
}
