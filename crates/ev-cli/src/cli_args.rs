use clap::{Args, Parser, Subcommand};

pub(crate) const DEFAULT_TICKS: u64 = 600;

#[derive(Debug, Parser)]
#[command(name = "ev-cli")]
#[command(about = "Event program runner and compile checker")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Run(RunArgs),
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "program")]
    pub(crate) program: String,
    #[arg(long = "ticks", default_value_t = DEFAULT_TICKS)]
    pub(crate) ticks: u64,
    #[arg(long = "config")]
    pub(crate) config: Option<String>,
    #[arg(long = "state-in")]
    pub(crate) state_in: Option<String>,
    #[arg(long = "state-out")]
    pub(crate) state_out: Option<String>,
    /// Answers for choice prompts, consumed in order; exhausted answers cancel.
    #[arg(long = "choice", allow_negative_numbers = true)]
    pub(crate) choices: Vec<i64>,
    #[arg(long = "seed", default_value_t = 1)]
    pub(crate) seed: u32,
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    #[arg(long = "dir")]
    pub(crate) dir: String,
}
