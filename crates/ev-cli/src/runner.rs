use std::collections::BTreeMap;
use std::path::Path;

use ev_core::{EventError, Program};
use ev_runtime::{Interpreter, ProgramCache, StepOutcome};

use crate::{
    json_string, load_program_file, load_run_config, load_run_state, resolve_path,
    save_run_state, CliHost, RunArgs, RunConfig, RunState, RUN_STATE_SCHEMA,
};

/// Result of driving one program for a number of ticks.
pub(crate) struct RunReport {
    pub(crate) ticks: u64,
    pub(crate) last_tick: u64,
    pub(crate) last_outcome: Option<StepOutcome>,
    pub(crate) interpreter: Interpreter,
    pub(crate) host: CliHost,
}

pub(crate) fn run_program(args: RunArgs) -> Result<i32, EventError> {
    let state_out = args.state_out.clone();
    let mut report = drive_program(args)?;

    for call in report.host.take_plugin_calls() {
        println!(
            "PLUGIN:{}",
            serde_json::to_string(&call).unwrap_or_else(|_| json_string(&call.name))
        );
    }
    let store = report.host.store_snapshot();
    println!("RESULT:OK");
    println!("TICKS:{}", report.ticks);
    println!("RUNNING:{}", report.interpreter.is_running());
    if let Some(outcome) = report.last_outcome {
        println!("OUTCOME:{:?}", outcome);
    }
    println!(
        "STORE_JSON:{}",
        serde_json::to_string(&store).unwrap_or_else(|_| "null".to_string())
    );

    if let Some(path) = state_out {
        let state = RunState {
            schema_version: RUN_STATE_SCHEMA.to_string(),
            ticks: report.last_tick,
            snapshot: report.interpreter.snapshot(),
            store,
        };
        save_run_state(Path::new(&path), &state)?;
        println!("STATE_OUT:{}", path);
    }
    Ok(0)
}

/// Loads the program (or a saved run) and steps it once per tick, sweeping
/// the program cache after every slot, until it finishes or ticks run out.
pub(crate) fn drive_program(args: RunArgs) -> Result<RunReport, EventError> {
    let bundle = load_program_file(&resolve_path(&args.program)?)?;
    let config = match &args.config {
        Some(path) => load_run_config(&resolve_path(path)?)?,
        None => RunConfig::default(),
    };
    let resumed = match &args.state_in {
        Some(path) => Some(load_run_state(Path::new(path))?),
        None => None,
    };

    let store = match &resumed {
        Some(state) => state.store.clone(),
        None => bundle.store,
    };
    let common_events = bundle
        .common_events
        .into_iter()
        .map(|(id, commands)| (id, Program::new(commands)))
        .collect::<BTreeMap<_, _>>();
    let mut host = CliHost::new(store, common_events, args.choices, args.seed);
    let mut cache = ProgramCache::new(config.cache);
    let mut interpreter = Interpreter::for_event(bundle.event, config.engine);

    let start_tick = match resumed {
        Some(state) => {
            interpreter.resume(state.snapshot)?;
            state.ticks
        }
        None => {
            interpreter.attach(Program::new(bundle.commands), 0);
            0
        }
    };
    for program in host.common_event_programs() {
        cache.preload_pinned(program, start_tick)?;
    }

    let end_tick = start_tick.saturating_add(args.ticks);
    let mut tick = start_tick;
    let mut last_outcome = None;
    while tick < end_tick && interpreter.is_running() {
        let outcome = interpreter.step(&mut cache, tick, &mut host)?;
        cache.sweep(tick);
        tracing::debug!(tick, ?outcome, "slot finished");
        last_outcome = Some(outcome);
        tick += 1;
    }

    tracing::info!(
        ticks = tick - start_tick,
        running = interpreter.is_running(),
        cached = cache.len(),
        "run finished"
    );
    Ok(RunReport {
        ticks: tick - start_tick,
        last_tick: tick,
        last_outcome,
        interpreter,
        host,
    })
}
