use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One event instruction: an integer opcode, its block depth and raw parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub code: i32,
    #[serde(default)]
    pub indent: i32,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl Command {
    pub fn new(code: i32, indent: i32, parameters: Vec<Value>) -> Self {
        Self {
            code,
            indent,
            parameters,
        }
    }

    pub fn param(&self, index: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.parameters.get(index).unwrap_or(&NULL)
    }

    pub fn param_i64(&self, index: usize) -> i64 {
        self.param(index).as_i64().unwrap_or(0)
    }

    pub fn param_str(&self, index: usize) -> &str {
        self.param(index).as_string().unwrap_or("")
    }
}

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub u64);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// Shared, immutable command list with a stable identity.
///
/// Identity is assigned at construction and shared by clones; two programs
/// built from equal command lists are still distinct. Deserializing always
/// yields a fresh identity, so restored state never aliases a live cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Command>", into = "Vec<Command>")]
pub struct Program {
    id: ProgramId,
    commands: Rc<[Command]>,
}

impl Program {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            id: ProgramId(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed)),
            commands: commands.into(),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn same_identity(&self, other: &Program) -> bool {
        self.id == other.id
    }
}

impl Deref for Program {
    type Target = [Command];

    fn deref(&self) -> &Self::Target {
        &self.commands
    }
}

impl From<Vec<Command>> for Program {
    fn from(commands: Vec<Command>) -> Self {
        Self::new(commands)
    }
}

impl From<Program> for Vec<Command> {
    fn from(program: Program) -> Self {
        program.commands.to_vec()
    }
}

/// The event that owns a running program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRef {
    pub map_id: i64,
    pub event_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLocation {
    pub program: ProgramId,
    pub index: usize,
}

impl fmt::Display for CommandLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.program, self.index)
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn clones_share_identity_and_rebuilds_do_not() {
        let commands = vec![Command::new(0, 0, Vec::new())];
        let program = Program::new(commands.clone());
        let clone = program.clone();
        let rebuilt = Program::new(commands);
        assert!(program.same_identity(&clone));
        assert!(!program.same_identity(&rebuilt));
        assert_eq!(program.commands(), rebuilt.commands());
    }

    #[test]
    fn deserialized_program_gets_fresh_identity() {
        let program = Program::new(vec![Command::new(230, 0, vec![Value::from(5)])]);
        let json = serde_json::to_string(&program).expect("serialize");
        assert_eq!(json, r#"[{"code":230,"indent":0,"parameters":[5.0]}]"#);
        let restored: Program = serde_json::from_str(&json).expect("deserialize");
        assert_ne!(restored.id(), program.id());
        assert_eq!(restored.commands(), program.commands());
    }

    #[test]
    fn command_param_helpers_default_missing_values() {
        let command: Command =
            serde_json::from_str(r#"{"code":356,"parameters":["Say hello"]}"#).expect("json");
        assert_eq!(command.indent, 0);
        assert_eq!(command.param_str(0), "Say hello");
        assert_eq!(command.param_str(3), "");
        assert_eq!(command.param_i64(1), 0);
        assert_eq!(command.param(9), &Value::Null);
    }
}
