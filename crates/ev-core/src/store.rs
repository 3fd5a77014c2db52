use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

pub type SharedStore = Rc<RefCell<GameStore>>;

/// Self switches are scoped to one event on one map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SelfSwitchKey {
    pub map_id: i64,
    pub event_id: i64,
    pub letter: String,
}

impl SelfSwitchKey {
    pub fn new(map_id: i64, event_id: i64, letter: impl Into<String>) -> Self {
        Self {
            map_id,
            event_id,
            letter: letter.into(),
        }
    }
}

impl fmt::Display for SelfSwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.map_id, self.event_id, self.letter)
    }
}

impl FromStr for SelfSwitchKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.splitn(3, ',');
        let (Some(map_id), Some(event_id), Some(letter)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("Self switch key \"{}\" needs map,event,letter.", raw));
        };
        let map_id = map_id
            .trim()
            .parse::<i64>()
            .map_err(|error| format!("Self switch map id \"{}\": {}", map_id, error))?;
        let event_id = event_id
            .trim()
            .parse::<i64>()
            .map_err(|error| format!("Self switch event id \"{}\": {}", event_id, error))?;
        Ok(Self::new(map_id, event_id, letter.trim()))
    }
}

impl TryFrom<String> for SelfSwitchKey {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<SelfSwitchKey> for String {
    fn from(key: SelfSwitchKey) -> Self {
        key.to_string()
    }
}

/// Host game state the interpreter and compiled expressions access directly.
///
/// Variables and switches are sparse: any `i64` index is addressable and
/// only written entries take space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameStore {
    variables: BTreeMap<i64, Value>,
    switches: BTreeMap<i64, bool>,
    self_switches: BTreeMap<SelfSwitchKey, bool>,
}

impl GameStore {
    pub fn shared(self) -> SharedStore {
        Rc::new(RefCell::new(self))
    }

    /// Reads a variable; unset and negative indices read as zero.
    pub fn variable(&self, index: i64) -> Value {
        match self.variables.get(&index) {
            None | Some(Value::Null) => Value::Number(0.0),
            Some(value) => value.clone(),
        }
    }

    /// Writes a variable. Numbers are floored; negative indices are ignored.
    pub fn set_variable(&mut self, index: i64, value: Value) {
        if index < 0 {
            return;
        }
        match value {
            Value::Null => {
                self.variables.remove(&index);
            }
            Value::Number(number) => {
                self.variables.insert(index, Value::Number(number.floor()));
            }
            other => {
                self.variables.insert(index, other);
            }
        }
    }

    pub fn switch(&self, index: i64) -> bool {
        self.switches.get(&index).copied().unwrap_or(false)
    }

    /// Negative indices are ignored.
    pub fn set_switch(&mut self, index: i64, on: bool) {
        if index < 0 {
            return;
        }
        if on {
            self.switches.insert(index, true);
        } else {
            self.switches.remove(&index);
        }
    }

    pub fn self_switch(&self, key: &SelfSwitchKey) -> bool {
        self.self_switches.get(key).copied().unwrap_or(false)
    }

    pub fn set_self_switch(&mut self, key: SelfSwitchKey, on: bool) {
        if on {
            self.self_switches.insert(key, true);
        } else {
            self.self_switches.remove(&key);
        }
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn missing_entries_read_as_defaults() {
        let store = GameStore::default();
        assert_eq!(store.variable(7), Value::Number(0.0));
        assert_eq!(store.variable(-1), Value::Number(0.0));
        assert!(!store.switch(3));
        assert!(!store.self_switch(&SelfSwitchKey::new(1, 2, "A")));
    }

    #[test]
    fn writes_floor_numbers_and_ignore_negative_indices() {
        let mut store = GameStore::default();
        store.set_variable(4, Value::Number(2.75));
        store.set_variable(2, Value::from("text"));
        store.set_variable(-3, Value::from(9));
        store.set_switch(5, true);
        assert_eq!(store.variable(4), Value::Number(2.0));
        assert_eq!(store.variable(2), Value::from("text"));
        assert_eq!(store.variable(3), Value::Number(0.0));
        assert!(store.switch(5));
        assert!(!store.switch(4));
    }

    #[test]
    fn huge_indices_are_stored_sparsely() {
        let mut store = GameStore::default();
        store.set_variable(4_611_686_018_427_387_904, Value::from(1));
        store.set_variable(i64::MAX, Value::from(2));
        store.set_switch(1_000_000_000_000, true);
        assert_eq!(store.variable(4_611_686_018_427_387_904), Value::Number(1.0));
        assert_eq!(store.variable(i64::MAX), Value::Number(2.0));
        assert!(store.switch(1_000_000_000_000));
        assert!(!store.switch(999_999_999_999));

        let json = serde_json::to_string(&store).expect("serialize");
        assert!(json.contains("\"1000000000000\":true"));
        let restored: GameStore = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, store);

        store.set_switch(1_000_000_000_000, false);
        store.set_variable(i64::MAX, Value::Null);
        assert!(!store.switch(1_000_000_000_000));
        assert_eq!(store.variable(i64::MAX), Value::Number(0.0));
    }

    #[test]
    fn self_switch_keys_serialize_as_strings() {
        let mut store = GameStore::default();
        store.set_self_switch(SelfSwitchKey::new(3, 12, "B"), true);
        let json = serde_json::to_string(&store).expect("serialize");
        assert!(json.contains("\"3,12,B\":true"));
        let restored: GameStore = serde_json::from_str(&json).expect("deserialize");
        assert!(restored.self_switch(&SelfSwitchKey::new(3, 12, "B")));
        store.set_self_switch(SelfSwitchKey::new(3, 12, "B"), false);
        assert!(!store.self_switch(&SelfSwitchKey::new(3, 12, "B")));
        assert!("1,2".parse::<SelfSwitchKey>().is_err());
    }
}
