use std::ops::RangeInclusive;

use ev_compiler::{CompiledProgram, ExpressionContext};
use ev_core::{
    Command, CommandLocation, EventError, Opcode, SelfSwitchKey, SharedStore, Value,
    CONDITION_KIND_SCRIPT, OPERAND_KIND_SCRIPT,
};

use crate::host::EventHost;
use crate::state::{BranchResult, ExecutionState};

/// Returns `false` to stop the current slot without advancing the pointer.
pub(crate) type Handler = fn(&mut StepContext<'_>) -> Result<bool, EventError>;

/// Inputs of one handler invocation.
pub(crate) struct StepContext<'a> {
    pub(crate) command: &'a Command,
    pub(crate) index: usize,
    pub(crate) state: &'a mut ExecutionState,
    pub(crate) compiled: &'a CompiledProgram,
    pub(crate) host: &'a mut dyn EventHost,
    pub(crate) store: &'a SharedStore,
    pub(crate) max_call_depth: usize,
    /// Most ids one switch or variable range command touches.
    pub(crate) max_range_ids: usize,
    /// Set by a call handler; the stepper pushes it after advancing.
    pub(crate) child: Option<ExecutionState>,
}

impl StepContext<'_> {
    fn location(&self) -> CommandLocation {
        CommandLocation {
            program: self.state.program.id(),
            index: self.index,
        }
    }

    /// Moves to the resolved target; the stepper's advance lands after it.
    fn jump(&mut self) {
        if let Some(target) = self.compiled.jump_target(self.index) {
            self.state.pointer = target;
        }
    }

    fn branch(&self) -> Option<BranchResult> {
        self.state.branch(self.command.indent)
    }

    fn set_branch(&mut self, result: BranchResult) {
        self.state.branch.insert(self.command.indent, result);
    }

    fn evaluate(&self) -> Result<(Value, usize), EventError> {
        let Some(entry) = self.compiled.expression(self.index) else {
            return Err(EventError::at(
                "ENGINE_EXPRESSION_MISSING",
                format!("No compiled expression at {}.", self.location()),
                self.location(),
            ));
        };
        let context = ExpressionContext {
            store: self.store.clone(),
            event: self.state.event,
        };
        let value = entry
            .expression
            .call(&context)
            .map_err(|error| EventError::at(error.code, error.message, self.location()))?;
        Ok((value, entry.end_index))
    }

    /// Id range named by params 0 and 1. Negative ids address nothing and
    /// are skipped; the range is cut to `max_range_ids` ids.
    fn id_range(&self) -> RangeInclusive<i64> {
        let first = self.command.param_i64(0).max(0);
        let last = self.command.param_i64(1);
        let span = i64::try_from(self.max_range_ids.max(1)).unwrap_or(i64::MAX);
        let limit = first.saturating_add(span - 1);
        if last > limit {
            tracing::warn!(
                program = %self.state.program.id(),
                index = self.index,
                first,
                last,
                limit,
                "id range truncated"
            );
        }
        first..=last.min(limit)
    }

    fn variable_number(&self, id: i64) -> f64 {
        self.store.borrow().variable(id).as_number().unwrap_or(0.0)
    }
}

pub(crate) static DISPATCH_TABLE: [Handler; Opcode::COUNT] = build_dispatch_table();

pub(crate) fn dispatch(opcode: Opcode, context: &mut StepContext<'_>) -> Result<bool, EventError> {
    DISPATCH_TABLE[opcode.index()](context)
}

const fn build_dispatch_table() -> [Handler; Opcode::COUNT] {
    let noop: Handler = command_noop;
    let mut table = [noop; Opcode::COUNT];
    let mut slot = 0;
    while slot < Opcode::COUNT {
        let opcode = Opcode::ALL[slot];
        table[opcode.index()] = handler_for(opcode);
        slot += 1;
    }
    table
}

const fn handler_for(opcode: Opcode) -> Handler {
    match opcode {
        Opcode::Empty
        | Opcode::ChoicesEnd
        | Opcode::BranchEnd
        | Opcode::Loop
        | Opcode::Label => command_noop,
        Opcode::Comment | Opcode::RepeatAbove | Opcode::BreakLoop | Opcode::JumpToLabel => {
            command_jump
        }
        Opcode::ShowChoices => command_show_choices,
        Opcode::WhenChoice => command_when_choice,
        Opcode::WhenCancel => command_when_cancel,
        Opcode::ConditionalBranch => command_conditional_branch,
        Opcode::Else => command_else,
        Opcode::ExitEventProcessing => command_exit_event,
        Opcode::CommonEvent => command_common_event,
        Opcode::ControlSwitches => command_control_switches,
        Opcode::ControlVariables => command_control_variables,
        Opcode::ControlSelfSwitch => command_control_self_switch,
        Opcode::Wait => command_wait,
        Opcode::Script => command_script,
        Opcode::PluginCommand => command_plugin,
    }
}

fn command_noop(_context: &mut StepContext<'_>) -> Result<bool, EventError> {
    Ok(true)
}

fn command_jump(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    context.jump();
    Ok(true)
}

fn command_show_choices(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    match context.host.show_choices(&context.command.parameters) {
        Some(choice) => {
            context.set_branch(BranchResult::Choice(choice));
            Ok(true)
        }
        None => Ok(false),
    }
}

fn command_when_choice(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let choice = context.command.param_i64(0);
    if context.branch() != Some(BranchResult::Choice(choice)) {
        context.jump();
    }
    Ok(true)
}

fn command_when_cancel(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    if matches!(context.branch(), Some(BranchResult::Choice(choice)) if choice >= 0) {
        context.jump();
    }
    Ok(true)
}

fn command_conditional_branch(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let command = context.command;
    let result = match command.param_i64(0) {
        0 => {
            let on = context.store.borrow().switch(command.param_i64(1));
            on == (command.param_i64(2) == 0)
        }
        1 => {
            let lhs = context.variable_number(command.param_i64(1));
            let rhs = if command.param_i64(2) == 0 {
                command.param(3).as_number().unwrap_or(0.0)
            } else {
                context.variable_number(command.param_i64(3))
            };
            compare(command.param_i64(4), lhs, rhs)
        }
        2 => {
            let event = context.state.event;
            event.event_id > 0 && {
                let key = SelfSwitchKey::new(event.map_id, event.event_id, command.param_str(1));
                context.store.borrow().self_switch(&key) == (command.param_i64(2) == 0)
            }
        }
        CONDITION_KIND_SCRIPT => context.evaluate()?.0.is_truthy(),
        _ => context.host.check_condition(&command.parameters),
    };

    context.set_branch(BranchResult::Condition(result));
    if !result {
        context.jump();
    }
    Ok(true)
}

fn compare(operation: i64, lhs: f64, rhs: f64) -> bool {
    match operation {
        0 => lhs == rhs,
        1 => lhs >= rhs,
        2 => lhs <= rhs,
        3 => lhs > rhs,
        4 => lhs < rhs,
        5 => lhs != rhs,
        _ => false,
    }
}

fn command_else(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    if context.branch() != Some(BranchResult::Condition(false)) {
        context.jump();
    }
    Ok(true)
}

fn command_exit_event(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    // Resume after the last command, which exhausts the state.
    context.state.pointer = context.state.program.len().saturating_sub(1);
    Ok(true)
}

fn command_common_event(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let id = context.command.param_i64(0);
    let Some(program) = context.host.common_event(id) else {
        return Ok(true);
    };
    let depth = context.state.depth + 1;
    if depth >= context.max_call_depth {
        return Err(EventError::at(
            "ENGINE_CALL_DEPTH_EXCEEDED",
            format!(
                "Common event {} at {} would exceed the call depth limit of {}.",
                id,
                context.location(),
                context.max_call_depth
            ),
            context.location(),
        ));
    }
    tracing::trace!(common_event = id, depth, "calling common event");
    context.child = Some(ExecutionState::new(program, 0, context.state.event, depth));
    Ok(true)
}

fn command_control_switches(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let command = context.command;
    let on = command.param_i64(2) == 0;
    let ids = context.id_range();
    let mut store = context.store.borrow_mut();
    for id in ids {
        store.set_switch(id, on);
    }
    Ok(true)
}

const OPERAND_KIND_RANDOM: i64 = 2;

fn command_control_variables(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let command = context.command;
    let operation = command.param_i64(2);
    let kind = command.param_i64(3);
    let shared_operand = match kind {
        0 => Some(command.param(4).clone()),
        1 => Some(context.store.borrow().variable(command.param_i64(4))),
        OPERAND_KIND_RANDOM => None,
        3 => Some(
            context
                .host
                .game_data_operand(command.parameters.get(4..).unwrap_or(&[])),
        ),
        OPERAND_KIND_SCRIPT => Some(context.evaluate()?.0),
        _ => return Ok(true),
    };

    for id in context.id_range() {
        let operand = match &shared_operand {
            Some(operand) => operand.clone(),
            None => {
                let low = command.param_i64(4);
                let upper = command.param_i64(5).saturating_sub(low).saturating_add(1);
                Value::from(low.saturating_add(context.host.random_int(upper)))
            }
        };
        let current = context.store.borrow().variable(id);
        if let Some(next) = operate(operation, &current, operand) {
            context.store.borrow_mut().set_variable(id, next);
        }
    }
    Ok(true)
}

/// New variable value, or `None` to leave it unchanged.
fn operate(operation: i64, current: &Value, operand: Value) -> Option<Value> {
    if operation == 0 {
        return Some(operand);
    }
    let lhs = current.as_number().unwrap_or(0.0);
    let rhs = operand.as_number().unwrap_or(0.0);
    let value = match operation {
        1 => lhs + rhs,
        2 => lhs - rhs,
        3 => lhs * rhs,
        4 if rhs != 0.0 => lhs / rhs,
        5 if rhs != 0.0 => lhs % rhs,
        _ => return None,
    };
    Some(Value::Number(value))
}

fn command_control_self_switch(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let event = context.state.event;
    if event.event_id > 0 {
        let key = SelfSwitchKey::new(event.map_id, event.event_id, context.command.param_str(0));
        let on = context.command.param_i64(1) == 0;
        context.store.borrow_mut().set_self_switch(key, on);
    }
    Ok(true)
}

fn command_wait(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    context.state.wait_count = u64::try_from(context.command.param_i64(0)).unwrap_or(0);
    Ok(true)
}

fn command_script(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let (_, end_index) = context.evaluate()?;
    context.state.pointer = end_index;
    Ok(true)
}

fn command_plugin(context: &mut StepContext<'_>) -> Result<bool, EventError> {
    let mut words = context.command.param_str(0).split(' ');
    let name = words.next().unwrap_or_default();
    let args = words.map(str::to_string).collect::<Vec<_>>();
    context.host.plugin_command(name, &args);
    Ok(true)
}

#[cfg(test)]
mod dispatch_tests {
    use super::*;

    #[test]
    fn variable_operations_follow_operation_codes() {
        let ten = Value::Number(10.0);
        assert_eq!(operate(0, &ten, Value::from("x")), Some(Value::from("x")));
        assert_eq!(operate(1, &ten, Value::Number(4.0)), Some(Value::Number(14.0)));
        assert_eq!(operate(2, &ten, Value::Number(4.0)), Some(Value::Number(6.0)));
        assert_eq!(operate(3, &ten, Value::Number(4.0)), Some(Value::Number(40.0)));
        assert_eq!(operate(4, &ten, Value::Number(4.0)), Some(Value::Number(2.5)));
        assert_eq!(operate(5, &ten, Value::Number(4.0)), Some(Value::Number(2.0)));
        assert_eq!(operate(4, &ten, Value::Number(0.0)), None);
        assert_eq!(operate(5, &ten, Value::Null), None);
        assert_eq!(operate(9, &ten, Value::Number(1.0)), None);
        assert_eq!(operate(1, &Value::from("a"), Value::Number(1.0)), Some(Value::Number(1.0)));
    }

    #[test]
    fn comparisons_cover_all_operators() {
        assert!(compare(0, 2.0, 2.0));
        assert!(compare(1, 2.0, 2.0));
        assert!(compare(2, 1.0, 2.0));
        assert!(compare(3, 3.0, 2.0));
        assert!(compare(4, 1.0, 2.0));
        assert!(compare(5, 1.0, 2.0));
        assert!(!compare(6, 1.0, 1.0));
    }

    #[test]
    fn every_opcode_has_a_table_slot() {
        assert_eq!(DISPATCH_TABLE.len(), Opcode::COUNT);
        for opcode in Opcode::ALL {
            assert!(opcode.index() < DISPATCH_TABLE.len());
        }
    }
}
