use std::collections::BTreeMap;

use ev_core::{
    Command, CommandLocation, EventError, Opcode, Program, CONDITION_KIND_SCRIPT,
    OPERAND_KIND_SCRIPT, SCRIPT_CONTINUATION_CODE,
};

use crate::expression::{ExpressionCompiler, ExpressionMode};
use crate::rewrite::rewrite_expression;
use crate::{CompilerOptions, ExpressionEntry};

/// Expression text embedded at one command, before rewriting.
struct EmbeddedSource {
    text: String,
    mode: ExpressionMode,
    end_index: usize,
}

pub(crate) fn compile_expressions(
    program: &Program,
    compiler: &dyn ExpressionCompiler,
    options: &CompilerOptions,
) -> Result<BTreeMap<usize, ExpressionEntry>, EventError> {
    let commands = program.commands();
    let mut expressions = BTreeMap::new();

    for (index, command) in commands.iter().enumerate() {
        let Some(source) = embedded_source(commands, index, command) else {
            continue;
        };
        let mut text = rewrite_expression(&source.text);
        if let Some(post_process) = &options.script_post_processor {
            text = post_process(&text);
        }
        let expression = compiler.compile(&text, source.mode).map_err(|error| {
            let location = CommandLocation {
                program: program.id(),
                index,
            };
            EventError::at(
                "COMPILE_EXPRESSION",
                format!("Expression at {} failed to compile: {}", location, error),
                location,
            )
        })?;
        expressions.insert(
            index,
            ExpressionEntry {
                expression,
                end_index: source.end_index,
            },
        );
    }

    Ok(expressions)
}

fn embedded_source(commands: &[Command], index: usize, command: &Command) -> Option<EmbeddedSource> {
    match Opcode::from_code(command.code)? {
        Opcode::Script => {
            let mut lines = vec![command.param_str(0)];
            let mut end_index = index;
            while let Some(next) = commands
                .get(end_index + 1)
                .filter(|next| next.code == SCRIPT_CONTINUATION_CODE)
            {
                lines.push(next.param_str(0));
                end_index += 1;
            }
            let text = lines
                .into_iter()
                .filter(|line| !line.trim_start().starts_with("//"))
                .collect::<Vec<_>>()
                .join("\n");
            Some(EmbeddedSource {
                text,
                mode: ExpressionMode::Block,
                end_index,
            })
        }
        Opcode::ConditionalBranch if command.param_i64(0) == CONDITION_KIND_SCRIPT => {
            Some(EmbeddedSource {
                text: command.param_str(1).to_string(),
                mode: ExpressionMode::Value,
                end_index: index,
            })
        }
        Opcode::ControlVariables if command.param_i64(3) == OPERAND_KIND_SCRIPT => {
            Some(EmbeddedSource {
                text: command.param_str(4).to_string(),
                mode: ExpressionMode::Value,
                end_index: index,
            })
        }
        _ => None,
    }
}
