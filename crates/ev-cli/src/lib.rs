use std::ffi::OsString;

use clap::Parser;
use ev_core::EventError;

mod checker;
mod cli_args;
mod cli_host;
mod error_map;
mod models;
mod program_loader;
mod runner;
mod state_store;

pub(crate) use cli_args::{CheckArgs, Cli, Mode, RunArgs};
pub(crate) use cli_host::CliHost;
pub(crate) use error_map::{
    emit_error, json_string, map_cli_config_invalid, map_cli_config_read, map_cli_path,
    map_cli_program_invalid, map_cli_program_read, map_cli_scan, map_cli_state_encode,
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write,
};
pub(crate) use models::{
    PluginCall, ProgramBundle, ProgramFile, RunConfig, RunState, RUN_STATE_SCHEMA,
};
pub(crate) use program_loader::{
    collect_program_files, load_program_file, load_run_config, resolve_dir, resolve_path,
};
pub(crate) use state_store::{load_run_state, save_run_state};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, EventError> {
    match cli.command {
        Mode::Run(args) => runner::run_program(args),
        Mode::Check(args) => checker::run_check(args),
    }
}
