use std::collections::BTreeMap;

use ev_core::{Command, EventError, EventRef, Program};
use serde::{Deserialize, Serialize};

use super::Interpreter;
use crate::state::{BranchResult, ExecutionState};

pub const SNAPSHOT_SCHEMA: &str = "interpreter-snapshot.v1";

/// Persistable call stack. Carries raw commands only; programs restored
/// from it get fresh identities and are compiled again on first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterSnapshot {
    pub schema_version: String,
    pub event: EventRef,
    pub frames: Vec<SnapshotFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFrame {
    pub commands: Vec<Command>,
    pub pointer: usize,
    pub wait_count: u64,
    #[serde(default)]
    pub branch: BTreeMap<i32, BranchResult>,
    pub event: EventRef,
}

impl Interpreter {
    pub fn snapshot(&self) -> InterpreterSnapshot {
        InterpreterSnapshot {
            schema_version: SNAPSHOT_SCHEMA.to_string(),
            event: self.event,
            frames: self
                .stack
                .iter()
                .map(|state| SnapshotFrame {
                    commands: state.program.commands().to_vec(),
                    pointer: state.pointer,
                    wait_count: state.wait_count,
                    branch: state.branch.clone(),
                    event: state.event,
                })
                .collect(),
        }
    }

    /// Replaces the call stack with a saved one.
    pub fn resume(&mut self, snapshot: InterpreterSnapshot) -> Result<(), EventError> {
        if snapshot.schema_version != SNAPSHOT_SCHEMA {
            return Err(EventError::new(
                "SNAPSHOT_SCHEMA",
                format!(
                    "Snapshot schema \"{}\" is not supported; expected \"{}\".",
                    snapshot.schema_version, SNAPSHOT_SCHEMA
                ),
            ));
        }
        if snapshot.frames.len() > self.options.max_call_depth {
            return Err(EventError::new(
                "SNAPSHOT_DEPTH_EXCEEDED",
                format!(
                    "Snapshot holds {} frames; the call depth limit is {}.",
                    snapshot.frames.len(),
                    self.options.max_call_depth
                ),
            ));
        }

        self.event = snapshot.event;
        self.stack = snapshot
            .frames
            .into_iter()
            .enumerate()
            .map(|(depth, frame)| ExecutionState {
                program: Program::new(frame.commands),
                pointer: frame.pointer,
                wait_count: frame.wait_count,
                branch: frame.branch,
                event: frame.event,
                depth,
            })
            .collect();
        Ok(())
    }
}
