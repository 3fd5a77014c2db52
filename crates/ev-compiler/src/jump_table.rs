use std::collections::HashMap;

use ev_core::{Command, CommandLocation, EventError, Opcode, Program, COMMENT_CONTINUATION_CODE};

const LOOP_CODE: i32 = Opcode::Loop.code();
const REPEAT_ABOVE_CODE: i32 = Opcode::RepeatAbove.code();

/// Resolves every control-flow target in one forward pass.
///
/// Targets are "resume after" indices: the interpreter lands on `target + 1`
/// after a jump, the same way it advances past any other command.
pub(crate) fn resolve_jumps(program: &Program) -> Vec<Option<usize>> {
    let commands = program.commands();
    let mut jump_table = vec![None; commands.len()];
    let mut branch_start: Vec<Option<usize>> = Vec::new();
    let mut repeat_start: Vec<Option<usize>> = Vec::new();
    let labels = collect_labels(commands);

    for (index, command) in commands.iter().enumerate() {
        let depth = depth_slot(command.indent);
        let next_indent = commands
            .get(index + 1)
            .map(|next| next.indent)
            .unwrap_or(-1);

        if command.code == REPEAT_ABOVE_CODE {
            jump_table[index] = slot(&repeat_start, depth);
        }
        set_slot(&mut repeat_start, depth, Some(index));

        if next_indent > command.indent {
            set_slot(&mut branch_start, depth, Some(index));
        } else {
            for level in depth_slot(next_indent)..=depth {
                if let Some(start) = branch_start.get_mut(level).and_then(Option::take) {
                    jump_table[start] = Some(index);
                }
            }
            // Blocks deeper than the next command are closed; a later sibling
            // block at those depths starts a fresh loop scope.
            let open_depths = usize::try_from(next_indent + 1).unwrap_or(0);
            for stale in repeat_start.iter_mut().skip(open_depths) {
                *stale = None;
            }
        }

        match Opcode::from_code(command.code) {
            Some(Opcode::Comment) => {
                jump_table[index] = Some(last_continuation(commands, index));
            }
            Some(Opcode::BreakLoop) => {
                jump_table[index] = resolve_break(commands, index);
            }
            Some(Opcode::JumpToLabel) => {
                let name = command.param_str(0);
                jump_table[index] = labels.get(name).copied();
                if jump_table[index].is_none() {
                    tracing::warn!(
                        program = %program.id(),
                        index,
                        label = name,
                        "jump to missing label is a no-op"
                    );
                }
            }
            _ => {}
        }
    }

    jump_table
}

/// Rejects programs whose block structure left a required target unresolved.
pub(crate) fn validate_jumps(
    program: &Program,
    jump_table: &[Option<usize>],
) -> Result<(), EventError> {
    for (index, command) in program.commands().iter().enumerate() {
        let Some(opcode) = Opcode::from_code(command.code) else {
            continue;
        };
        if !opcode.requires_jump_target() {
            continue;
        }
        let location = CommandLocation {
            program: program.id(),
            index,
        };
        let Some(target) = jump_table[index] else {
            return Err(EventError::at(
                "COMPILE_JUMP_UNRESOLVED",
                format!(
                    "{:?} at {} has no resolvable jump target; block nesting is unbalanced.",
                    opcode, location
                ),
                location,
            ));
        };
        if opcode == Opcode::RepeatAbove && program[target].code != LOOP_CODE {
            return Err(EventError::at(
                "COMPILE_LOOP_UNMATCHED",
                format!(
                    "RepeatAbove at {} resolves to command {} (code {}) instead of a loop opener.",
                    location, target, program[target].code
                ),
                location,
            ));
        }
    }
    Ok(())
}

/// First loop close strictly shallower than the break, skipping loops that
/// open and close in between.
fn resolve_break(commands: &[Command], index: usize) -> Option<usize> {
    let break_indent = commands[index].indent;
    let mut depth = 0usize;
    for (target, command) in commands.iter().enumerate().skip(index + 1) {
        if command.indent >= break_indent {
            continue;
        }
        if command.code == LOOP_CODE {
            depth += 1;
        } else if command.code == REPEAT_ABOVE_CODE {
            if depth == 0 {
                return Some(target);
            }
            depth -= 1;
        }
    }
    None
}

fn last_continuation(commands: &[Command], index: usize) -> usize {
    let mut cursor = index;
    while commands
        .get(cursor + 1)
        .is_some_and(|next| next.code == COMMENT_CONTINUATION_CODE)
    {
        cursor += 1;
    }
    cursor
}

fn collect_labels(commands: &[Command]) -> HashMap<&str, usize> {
    let mut labels = HashMap::new();
    for (index, command) in commands.iter().enumerate() {
        if command.code == Opcode::Label.code() {
            labels.entry(command.param_str(0)).or_insert(index);
        }
    }
    labels
}

fn depth_slot(indent: i32) -> usize {
    usize::try_from(indent).unwrap_or(0)
}

fn slot(slots: &[Option<usize>], depth: usize) -> Option<usize> {
    slots.get(depth).copied().flatten()
}

fn set_slot(slots: &mut Vec<Option<usize>>, depth: usize, value: Option<usize>) {
    if depth >= slots.len() {
        slots.resize(depth + 1, None);
    }
    slots[depth] = value;
}
