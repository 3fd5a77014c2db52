use std::collections::BTreeMap;

use ev_core::{Command, EventRef, GameStore};
use ev_runtime::{CacheOptions, EngineOptions, InterpreterSnapshot};
use serde::{Deserialize, Serialize};

pub(crate) const RUN_STATE_SCHEMA: &str = "ev-cli-state.v1";

/// On-disk program: a bare command list, or a bundle that also carries
/// common events, an initial store and the owning event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProgramFile {
    Commands(Vec<Command>),
    Bundle(ProgramBundle),
}

impl ProgramFile {
    pub(crate) fn into_bundle(self) -> ProgramBundle {
        match self {
            Self::Commands(commands) => ProgramBundle {
                commands,
                common_events: BTreeMap::new(),
                store: GameStore::default(),
                event: default_event(),
            },
            Self::Bundle(bundle) => bundle,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgramBundle {
    pub(crate) commands: Vec<Command>,
    #[serde(default)]
    pub(crate) common_events: BTreeMap<i64, Vec<Command>>,
    #[serde(default)]
    pub(crate) store: GameStore,
    #[serde(default = "default_event")]
    pub(crate) event: EventRef,
}

fn default_event() -> EventRef {
    EventRef {
        map_id: 1,
        event_id: 1,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RunConfig {
    pub(crate) engine: EngineOptions,
    pub(crate) cache: CacheOptions,
}

/// Interpreter and store saved between two `run` invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunState {
    pub(crate) schema_version: String,
    pub(crate) ticks: u64,
    pub(crate) snapshot: InterpreterSnapshot,
    pub(crate) store: GameStore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PluginCall {
    pub(crate) name: String,
    pub(crate) args: Vec<String>,
}
