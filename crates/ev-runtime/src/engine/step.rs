use ev_compiler::CompiledProgram;
use ev_core::{EventError, SharedStore};

use super::{Interpreter, StepOutcome, YieldReason};
use crate::cache::ProgramCache;
use crate::dispatch::{dispatch, StepContext};
use crate::host::EventHost;
use crate::options::EngineOptions;
use crate::state::ExecutionState;

enum StateRun {
    Exhausted,
    Yielded(YieldReason),
    Called(ExecutionState),
}

impl Interpreter {
    /// Runs one scheduling slot.
    ///
    /// The deepest state always runs first. When it runs out its parent
    /// continues within the same slot; when it yields the slot ends. At most
    /// `iteration_cap` commands are visited across the whole stack.
    pub fn step(
        &mut self,
        cache: &mut ProgramCache,
        now: u64,
        host: &mut dyn EventHost,
    ) -> Result<StepOutcome, EventError> {
        if self.stack.is_empty() {
            return Ok(StepOutcome::Idle);
        }

        let store = host.store();
        let options = self.options;
        let mut budget = options.iteration_cap;

        loop {
            let Some(state) = self.stack.last_mut() else {
                return Ok(StepOutcome::Exhausted);
            };
            let compiled = cache.get_or_compile(&state.program, now)?;

            match run_state(state, &compiled, host, &store, &mut budget, options)? {
                StateRun::Exhausted => {
                    self.stack.pop();
                    if self.stack.is_empty() {
                        tracing::debug!(
                            map_id = self.event.map_id,
                            event_id = self.event.event_id,
                            "event program finished"
                        );
                        return Ok(StepOutcome::Exhausted);
                    }
                }
                StateRun::Called(child) => {
                    // A callee that fails to compile is never pushed; the
                    // caller already stands after the call and resumes there.
                    cache.get_or_compile(child.program(), now)?;
                    self.stack.push(child);
                }
                StateRun::Yielded(reason) => return Ok(StepOutcome::Yielded(reason)),
            }
        }
    }
}

fn run_state(
    state: &mut ExecutionState,
    compiled: &CompiledProgram,
    host: &mut dyn EventHost,
    store: &SharedStore,
    budget: &mut usize,
    options: EngineOptions,
) -> Result<StateRun, EventError> {
    let program = state.program.clone();

    loop {
        if state.wait_count > 0 {
            state.wait_count -= 1;
            return Ok(StateRun::Yielded(YieldReason::Waiting));
        }
        if host.is_scene_changing() {
            return Ok(StateRun::Yielded(YieldReason::SceneChanging));
        }

        let index = state.pointer;
        let Some(command) = program.get(index) else {
            return Ok(StateRun::Exhausted);
        };
        if *budget == 0 {
            return Ok(StateRun::Yielded(YieldReason::BudgetExhausted));
        }
        *budget -= 1;

        let Some(opcode) = compiled.opcode(index) else {
            state.pointer += 1;
            continue;
        };
        tracing::trace!(program = %program.id(), index, ?opcode, "dispatch");

        let mut context = StepContext {
            command,
            index,
            state: &mut *state,
            compiled,
            host: &mut *host,
            store,
            max_call_depth: options.max_call_depth,
            max_range_ids: options.iteration_cap,
            child: None,
        };
        let advanced = dispatch(opcode, &mut context)?;
        let child = context.child.take();
        if !advanced {
            return Ok(StateRun::Yielded(YieldReason::HandlerBlocked));
        }

        state.pointer += 1;
        if let Some(child) = child {
            return Ok(StateRun::Called(child));
        }
    }
}
