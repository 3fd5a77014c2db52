use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ev_core::{EventError, Opcode, Program, ProgramId};

mod expression;
mod jump_table;
mod rewrite;
mod rhai_bridge;
mod script_compile;

pub use expression::{
    CompiledExpression, ExpressionCompiler, ExpressionContext, ExpressionFn, ExpressionMode,
};
pub use rewrite::{
    rewrite_expression, EVENT_BINDING, SELF_SWITCHES_BINDING, SWITCHES_BINDING, VARIABLES_BINDING,
};
pub use rhai_bridge::{
    dynamic_to_value, value_to_dynamic, RhaiExpressionCompiler, MAX_SCRIPT_OPERATIONS,
};

/// Host hook applied to every rewritten expression before it is compiled.
pub type ScriptPostProcessor = Rc<dyn Fn(&str) -> String>;

#[derive(Clone, Default)]
pub struct CompilerOptions {
    pub script_post_processor: Option<ScriptPostProcessor>,
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerOptions")
            .field("script_post_processor", &self.script_post_processor.is_some())
            .finish()
    }
}

/// A compiled expression and the last command it consumed.
#[derive(Clone)]
pub struct ExpressionEntry {
    pub expression: ExpressionFn,
    pub end_index: usize,
}

/// Side tables computed once per program; the command list itself stays shared.
pub struct CompiledProgram {
    program_id: ProgramId,
    jump_table: Vec<Option<usize>>,
    expressions: BTreeMap<usize, ExpressionEntry>,
    opcodes: Vec<Option<Opcode>>,
}

/// Comparable structure of a [`CompiledProgram`], without the closures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShape {
    pub jump_table: Vec<Option<usize>>,
    pub expressions: Vec<(usize, usize)>,
    pub opcodes: Vec<Option<Opcode>>,
}

impl CompiledProgram {
    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn jump_target(&self, index: usize) -> Option<usize> {
        self.jump_table.get(index).copied().flatten()
    }

    pub fn expression(&self, index: usize) -> Option<&ExpressionEntry> {
        self.expressions.get(&index)
    }

    pub fn opcode(&self, index: usize) -> Option<Opcode> {
        self.opcodes.get(index).copied().flatten()
    }

    pub fn is_executable(&self, index: usize) -> bool {
        self.opcode(index).is_some()
    }

    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    pub fn shape(&self) -> CompiledShape {
        CompiledShape {
            jump_table: self.jump_table.clone(),
            expressions: self
                .expressions
                .iter()
                .map(|(index, entry)| (*index, entry.end_index))
                .collect(),
            opcodes: self.opcodes.clone(),
        }
    }
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("program_id", &self.program_id)
            .field("jump_table", &self.jump_table)
            .field("expressions", &self.expressions.keys().collect::<Vec<_>>())
            .field("opcodes", &self.opcodes)
            .finish()
    }
}

/// Builds the jump table, expression table and executable mask for `program`.
///
/// Fails on the first expression that does not compile and on block
/// structure that leaves a control-flow command without a target.
pub fn compile_program(
    program: &Program,
    compiler: &dyn ExpressionCompiler,
    options: &CompilerOptions,
) -> Result<CompiledProgram, EventError> {
    let jump_table = jump_table::resolve_jumps(program);
    jump_table::validate_jumps(program, &jump_table)?;
    let expressions = script_compile::compile_expressions(program, compiler, options)?;
    let opcodes = program
        .commands()
        .iter()
        .map(|command| Opcode::from_code(command.code))
        .collect::<Vec<_>>();

    tracing::debug!(
        program = %program.id(),
        commands = program.len(),
        expressions = expressions.len(),
        "compiled event program"
    );

    Ok(CompiledProgram {
        program_id: program.id(),
        jump_table,
        expressions,
        opcodes,
    })
}
