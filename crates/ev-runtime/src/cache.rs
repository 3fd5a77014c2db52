use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use ev_compiler::{
    compile_program, CompiledProgram, CompilerOptions, ExpressionCompiler, RhaiExpressionCompiler,
};
use ev_core::{EventError, Program, ProgramId};

use crate::options::CacheOptions;

/// Ticks a compiled program may sit unused before it is disposed.
pub const PROGRAM_IDLE_TICKS: u64 = 5;
/// Ticks a loaded resource may sit unused before it is disposed.
pub const RESOURCE_IDLE_TICKS: u64 = 3600;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    last_touched: u64,
    pinned: bool,
}

/// Keyed store whose entries expire after a fixed number of idle ticks.
///
/// The caller supplies the current tick to every operation. An entry last
/// touched at `t` is evicted by a sweep at any `now >= t + idle_ticks`.
#[derive(Debug)]
pub struct IdleCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    idle_ticks: u64,
}

impl<K: Eq + Hash, V> IdleCache<K, V> {
    pub fn new(idle_ticks: u64) -> Self {
        Self {
            entries: HashMap::new(),
            idle_ticks,
        }
    }

    pub fn idle_ticks(&self) -> u64 {
        self.idle_ticks
    }

    /// Returns the entry and marks it used at `now`.
    pub fn get(&mut self, key: &K, now: u64) -> Option<&V> {
        let entry = self.entries.get_mut(key)?;
        entry.last_touched = now;
        Some(&entry.value)
    }

    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V, now: u64) -> Option<V> {
        self.entries
            .insert(
                key,
                CacheEntry {
                    value,
                    last_touched: now,
                    pinned: false,
                },
            )
            .map(|previous| previous.value)
    }

    pub fn touch(&mut self, key: &K, now: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_touched = now;
                true
            }
            None => false,
        }
    }

    /// Exempts an entry from sweeping until it is removed.
    pub fn pin(&mut self, key: &K) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.pinned = true;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drops every unpinned entry idle for at least the threshold and returns
    /// how many were dropped.
    pub fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let idle_ticks = self.idle_ticks;
        self.entries.retain(|_, entry| {
            entry.pinned || now.saturating_sub(entry.last_touched) < idle_ticks
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compiled programs keyed by program identity.
///
/// Misses compile synchronously; callers re-resolve through the cache on
/// every step instead of holding a compiled program across ticks.
pub struct ProgramCache {
    entries: IdleCache<ProgramId, Rc<CompiledProgram>>,
    compiler: Rc<dyn ExpressionCompiler>,
    compiler_options: CompilerOptions,
}

impl ProgramCache {
    pub fn new(options: CacheOptions) -> Self {
        Self::with_compiler(
            Rc::new(RhaiExpressionCompiler::new()),
            CompilerOptions::default(),
            options,
        )
    }

    pub fn with_compiler(
        compiler: Rc<dyn ExpressionCompiler>,
        compiler_options: CompilerOptions,
        options: CacheOptions,
    ) -> Self {
        Self {
            entries: IdleCache::new(options.idle_ticks),
            compiler,
            compiler_options,
        }
    }

    pub fn get_or_compile(
        &mut self,
        program: &Program,
        now: u64,
    ) -> Result<Rc<CompiledProgram>, EventError> {
        if let Some(hit) = self.entries.get(&program.id(), now).cloned() {
            return Ok(hit);
        }
        tracing::debug!(program = %program.id(), "compiling event program on first use");
        self.compile_into_cache(program, now)
    }

    /// Compiles ahead of first use; a cached program is left as is.
    pub fn preload(&mut self, program: &Program, now: u64) -> Result<(), EventError> {
        if !self.entries.contains(&program.id()) {
            self.compile_into_cache(program, now)?;
        }
        Ok(())
    }

    /// Preloads a program that must survive every sweep, such as a common event.
    pub fn preload_pinned(&mut self, program: &Program, now: u64) -> Result<(), EventError> {
        self.preload(program, now)?;
        self.entries.pin(&program.id());
        Ok(())
    }

    /// Keeps a visible program alive without running it.
    pub fn touch(&mut self, program: &Program, now: u64) -> bool {
        self.entries.touch(&program.id(), now)
    }

    /// Drops the compiled form after the program's source data changed.
    pub fn invalidate(&mut self, program: &Program) -> bool {
        self.entries.remove(&program.id()).is_some()
    }

    pub fn sweep(&mut self, now: u64) -> usize {
        let disposed = self.entries.sweep(now);
        if disposed > 0 {
            tracing::info!(disposed, "disposed cached event programs");
        }
        disposed
    }

    pub fn contains(&self, program: &Program) -> bool {
        self.entries.contains(&program.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn compile_into_cache(
        &mut self,
        program: &Program,
        now: u64,
    ) -> Result<Rc<CompiledProgram>, EventError> {
        let compiled = Rc::new(compile_program(
            program,
            self.compiler.as_ref(),
            &self.compiler_options,
        )?);
        self.entries.insert(program.id(), Rc::clone(&compiled), now);
        Ok(compiled)
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use ev_core::{Command, Value};

    fn looping_program() -> Program {
        Program::new(vec![
            Command::new(112, 0, vec![]),
            Command::new(
                355,
                1,
                vec![Value::from("variables.set_value(1, variables.value(1) + 1);")],
            ),
            Command::new(0, 1, vec![]),
            Command::new(413, 0, vec![]),
        ])
    }

    #[test]
    fn entry_idle_for_the_threshold_is_evicted() {
        let mut cache = IdleCache::new(PROGRAM_IDLE_TICKS);
        cache.insert("a", 1, 10);
        assert_eq!(cache.sweep(14), 0);
        assert!(cache.contains(&"a"));
        assert_eq!(cache.sweep(15), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn touch_and_get_reset_the_countdown() {
        let mut cache = IdleCache::new(5);
        cache.insert("touched", 1, 0);
        cache.insert("read", 2, 0);
        cache.insert("idle", 3, 0);
        assert!(cache.touch(&"touched", 3));
        assert_eq!(cache.get(&"read", 4), Some(&2));
        assert_eq!(cache.sweep(7), 1);
        assert!(!cache.contains(&"idle"));
        assert_eq!(cache.sweep(8), 1);
        assert_eq!(cache.peek(&"read"), Some(&2));
        assert_eq!(cache.sweep(9), 1);
        assert!(!cache.touch(&"idle", 9));
    }

    #[test]
    fn pinned_entries_survive_sweeps() {
        let mut cache = IdleCache::new(RESOURCE_IDLE_TICKS);
        cache.insert(1u32, "common", 0);
        cache.insert(2u32, "map", 0);
        assert!(cache.pin(&1));
        assert_eq!(cache.sweep(RESOURCE_IDLE_TICKS), 1);
        assert_eq!(cache.peek(&1), Some(&"common"));
        assert_eq!(cache.remove(&1), Some("common"));
        assert!(!cache.pin(&1));
    }

    #[test]
    fn hit_reuses_the_compiled_program() {
        let mut cache = ProgramCache::default();
        let program = looping_program();
        let first = cache.get_or_compile(&program, 0).expect("compile");
        let second = cache.get_or_compile(&program.clone(), 1).expect("hit");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recompile_after_eviction_matches_first_compile() {
        let mut cache = ProgramCache::default();
        let program = looping_program();
        let first = cache.get_or_compile(&program, 0).expect("compile");
        assert_eq!(cache.sweep(PROGRAM_IDLE_TICKS), 1);
        assert!(!cache.contains(&program));

        let second = cache.get_or_compile(&program, 6).expect("recompile");
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(first.shape(), second.shape());
    }

    #[test]
    fn preload_pin_and_invalidate() {
        let mut cache = ProgramCache::default();
        let common = looping_program();
        let map_event = looping_program();
        cache.preload_pinned(&common, 0).expect("preload common");
        cache.preload(&map_event, 0).expect("preload map event");
        cache.preload(&map_event, 3).expect("already cached");

        assert!(cache.touch(&map_event, 4));
        assert_eq!(cache.sweep(8), 0);
        assert_eq!(cache.sweep(9), 1);
        assert!(cache.contains(&common));

        assert!(cache.invalidate(&common));
        assert!(!cache.invalidate(&common));
        assert!(cache.is_empty());
    }

    #[test]
    fn compile_errors_are_not_cached() {
        let mut cache = ProgramCache::default();
        let broken = Program::new(vec![Command::new(355, 0, vec![Value::from("let = ;")])]);
        let error = cache.get_or_compile(&broken, 0).expect_err("syntax error");
        assert_eq!(error.code, "COMPILE_EXPRESSION");
        assert!(!cache.contains(&broken));
    }
}
