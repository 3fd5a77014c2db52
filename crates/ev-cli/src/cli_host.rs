use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use ev_core::{GameStore, Program, SharedStore, Value};
use ev_runtime::EventHost;

use crate::PluginCall;

/// Headless host: plugin commands are recorded, choices come from the
/// command line and random numbers from a seeded generator.
pub(crate) struct CliHost {
    store: SharedStore,
    common_events: BTreeMap<i64, Program>,
    choices: VecDeque<i64>,
    random: SeededRandom,
    plugin_calls: Vec<PluginCall>,
}

impl CliHost {
    pub(crate) fn new(
        store: GameStore,
        common_events: BTreeMap<i64, Program>,
        choices: Vec<i64>,
        seed: u32,
    ) -> Self {
        Self {
            store: store.shared(),
            common_events,
            choices: choices.into(),
            random: SeededRandom { state: seed },
            plugin_calls: Vec::new(),
        }
    }

    pub(crate) fn common_event_programs(&self) -> impl Iterator<Item = &Program> {
        self.common_events.values()
    }

    pub(crate) fn take_plugin_calls(&mut self) -> Vec<PluginCall> {
        std::mem::take(&mut self.plugin_calls)
    }

    pub(crate) fn store_snapshot(&self) -> GameStore {
        self.store.borrow().clone()
    }
}

impl EventHost for CliHost {
    fn store(&self) -> SharedStore {
        Rc::clone(&self.store)
    }

    fn common_event(&self, id: i64) -> Option<Program> {
        self.common_events.get(&id).cloned()
    }

    fn plugin_command(&mut self, name: &str, args: &[String]) {
        tracing::debug!(name, ?args, "plugin command");
        self.plugin_calls.push(PluginCall {
            name: name.to_string(),
            args: args.to_vec(),
        });
    }

    fn random_int(&mut self, upper: i64) -> i64 {
        if upper <= 0 {
            return 0;
        }
        match u32::try_from(upper) {
            Ok(bound) => i64::from(self.random.below(bound)),
            Err(_) => {
                let bound = u64::try_from(upper).unwrap_or(u64::MAX);
                i64::try_from(self.random.below_wide(bound)).unwrap_or(i64::MAX)
            }
        }
    }

    fn show_choices(&mut self, params: &[Value]) -> Option<i64> {
        let answer = self.choices.pop_front().unwrap_or(-1);
        tracing::debug!(answer, options = ?params.first(), "choice answered");
        Some(answer)
    }
}

/// mulberry32; reproducible across platforms for a given seed.
struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b79f5);
        let mut next = self.state;
        next = (next ^ (next >> 15)).wrapping_mul(next | 1);
        next ^= next.wrapping_add((next ^ (next >> 7)).wrapping_mul(next | 61));
        next ^ (next >> 14)
    }

    /// Uniform in `0..bound` by rejection; `bound` must be positive.
    fn below(&mut self, bound: u32) -> u32 {
        let zone = (u64::from(u32::MAX) + 1) / u64::from(bound) * u64::from(bound);
        loop {
            let candidate = self.next_u32();
            if u64::from(candidate) < zone {
                return candidate % bound;
            }
        }
    }

    /// Uniform in `0..bound` for bounds past `u32::MAX`, from two draws.
    fn below_wide(&mut self, bound: u64) -> u64 {
        let rejected = bound.wrapping_neg() % bound;
        loop {
            let candidate = (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32());
            if candidate >= rejected {
                return candidate % bound;
            }
        }
    }
}
