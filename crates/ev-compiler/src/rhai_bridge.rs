use std::rc::Rc;

use ev_core::{EventError, EventRef, GameStore, SelfSwitchKey, SharedStore, Value};
use rhai::{
    Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Position, Scope, AST, FLOAT, INT,
};

use crate::expression::{
    CompiledExpression, ExpressionCompiler, ExpressionContext, ExpressionFn, ExpressionMode,
};
use crate::rewrite::{EVENT_BINDING, SELF_SWITCHES_BINDING, SWITCHES_BINDING, VARIABLES_BINDING};

/// Upper bound on Rhai operations per expression call.
pub const MAX_SCRIPT_OPERATIONS: u64 = 1_000_000;

/// Expression compiler backed by a sandboxed Rhai engine.
///
/// Scripts see only the bindings pushed by [`binding_scope`]; `eval` is
/// disabled and unknown variables are rejected at compile time.
pub struct RhaiExpressionCompiler {
    engine: Rc<Engine>,
}

impl Default for RhaiExpressionCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiExpressionCompiler {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_strict_variables(true);
        engine.set_max_operations(MAX_SCRIPT_OPERATIONS);
        engine.disable_symbol("eval");
        engine.on_print(|text| tracing::info!(target: "ev_script", "{}", text));
        engine.on_debug(|text, _source, position| {
            tracing::debug!(target: "ev_script", %position, "{}", text)
        });
        register_store_views(&mut engine);
        Self {
            engine: Rc::new(engine),
        }
    }
}

impl ExpressionCompiler for RhaiExpressionCompiler {
    fn compile(&self, source: &str, mode: ExpressionMode) -> Result<ExpressionFn, String> {
        let scope = binding_scope(&ExpressionContext {
            store: GameStore::default().shared(),
            event: EventRef::default(),
        });
        let ast = match mode {
            ExpressionMode::Block => self.engine.compile_with_scope(&scope, source),
            ExpressionMode::Value => self.engine.compile_expression_with_scope(&scope, source),
        }
        .map_err(|error| error.to_string())?;

        Ok(Rc::new(RhaiExpression {
            engine: Rc::clone(&self.engine),
            ast,
            mode,
        }))
    }
}

struct RhaiExpression {
    engine: Rc<Engine>,
    ast: AST,
    mode: ExpressionMode,
}

impl CompiledExpression for RhaiExpression {
    fn call(&self, context: &ExpressionContext) -> Result<Value, EventError> {
        let mut scope = binding_scope(context);
        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(|error| {
                EventError::new(
                    "ENGINE_EVAL_ERROR",
                    format!("Expression eval failed: {}", error),
                )
            })?;
        match self.mode {
            ExpressionMode::Block => Ok(Value::Null),
            ExpressionMode::Value => dynamic_to_value(result),
        }
    }
}

fn binding_scope(context: &ExpressionContext) -> Scope<'static> {
    let variables = VariablesView(Rc::clone(&context.store));
    let switches = SwitchesView(Rc::clone(&context.store));
    let self_switches = SelfSwitchesView(Rc::clone(&context.store));

    let mut scope = Scope::new();
    scope.push(EVENT_BINDING, EventView(context.event));
    scope.push(VARIABLES_BINDING, variables.clone());
    scope.push(SWITCHES_BINDING, switches.clone());
    scope.push(SELF_SWITCHES_BINDING, self_switches.clone());
    scope.push("variables", variables);
    scope.push("switches", switches);
    scope.push("self_switches", self_switches);
    scope
}

#[derive(Clone)]
struct EventView(EventRef);

#[derive(Clone)]
struct VariablesView(SharedStore);

#[derive(Clone)]
struct SwitchesView(SharedStore);

#[derive(Clone)]
struct SelfSwitchesView(SharedStore);

impl VariablesView {
    fn get(&mut self, index: INT) -> Dynamic {
        value_to_dynamic(&self.0.borrow().variable(index))
    }

    fn set(&mut self, index: INT, value: Dynamic) -> Result<(), Box<EvalAltResult>> {
        let value = dynamic_to_value(value).map_err(|error| runtime_error(error.message))?;
        self.0.borrow_mut().set_variable(index, value);
        Ok(())
    }
}

impl SwitchesView {
    fn get(&mut self, index: INT) -> bool {
        self.0.borrow().switch(index)
    }

    fn set(&mut self, index: INT, value: Dynamic) -> Result<(), Box<EvalAltResult>> {
        let on = dynamic_to_value(value)
            .map_err(|error| runtime_error(error.message))?
            .is_truthy();
        self.0.borrow_mut().set_switch(index, on);
        Ok(())
    }
}

impl SelfSwitchesView {
    fn get(&mut self, key: Array) -> Result<bool, Box<EvalAltResult>> {
        let key = self_switch_key(&key)?;
        Ok(self.0.borrow().self_switch(&key))
    }

    fn set(&mut self, key: Array, value: Dynamic) -> Result<(), Box<EvalAltResult>> {
        let key = self_switch_key(&key)?;
        let on = dynamic_to_value(value)
            .map_err(|error| runtime_error(error.message))?
            .is_truthy();
        self.0.borrow_mut().set_self_switch(key, on);
        Ok(())
    }
}

fn register_store_views(engine: &mut Engine) {
    engine
        .register_type_with_name::<EventView>("Event")
        .register_get("map_id", |event: &mut EventView| event.0.map_id as INT)
        .register_get("event_id", |event: &mut EventView| event.0.event_id as INT);

    engine
        .register_type_with_name::<VariablesView>("Variables")
        .register_indexer_get(VariablesView::get)
        .register_indexer_set(VariablesView::set)
        .register_fn("value", VariablesView::get)
        .register_fn("set_value", VariablesView::set);

    engine
        .register_type_with_name::<SwitchesView>("Switches")
        .register_indexer_get(SwitchesView::get)
        .register_indexer_set(SwitchesView::set)
        .register_fn("value", SwitchesView::get)
        .register_fn("set_value", SwitchesView::set);

    engine
        .register_type_with_name::<SelfSwitchesView>("SelfSwitches")
        .register_indexer_get(SelfSwitchesView::get)
        .register_indexer_set(SelfSwitchesView::set)
        .register_fn("value", SelfSwitchesView::get)
        .register_fn("set_value", SelfSwitchesView::set);
}

fn self_switch_key(key: &Array) -> Result<SelfSwitchKey, Box<EvalAltResult>> {
    let [map_id, event_id, letter] = key.as_slice() else {
        return Err(runtime_error(
            "Self switch key must be [map_id, event_id, letter].",
        ));
    };
    Ok(SelfSwitchKey::new(
        dynamic_to_int(map_id)?,
        dynamic_to_int(event_id)?,
        letter.to_string(),
    ))
}

fn dynamic_to_int(value: &Dynamic) -> Result<i64, Box<EvalAltResult>> {
    if let Ok(value) = value.as_int() {
        return Ok(value);
    }
    if let Ok(value) = value.as_float() {
        return Ok(value.trunc() as i64);
    }
    Err(runtime_error(format!(
        "Expected a number, found {}.",
        value.type_name()
    )))
}

fn runtime_error(message: impl Into<String>) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.into()),
        Position::NONE,
    ))
}

/// Integral numbers cross into Rhai as `INT` so index arithmetic stays integral.
pub fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(value) => Dynamic::from_bool(*value),
        Value::Number(value) => {
            if value.fract() == 0.0 && value.abs() <= INT::MAX as f64 {
                Dynamic::from_int(*value as INT)
            } else {
                Dynamic::from_float(*value as FLOAT)
            }
        }
        Value::String(value) => Dynamic::from(value.clone()),
        Value::Array(values) => {
            Dynamic::from_array(values.iter().map(value_to_dynamic).collect::<Array>())
        }
        Value::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), value_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
    }
}

pub fn dynamic_to_value(value: Dynamic) -> Result<Value, EventError> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if value.is::<bool>() {
        return Ok(Value::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(Value::Number(value.cast::<INT>() as f64));
    }
    if value.is::<FLOAT>() {
        return Ok(Value::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(Value::String(value.cast::<ImmutableString>().to_string()));
    }
    if value.is::<char>() {
        return Ok(Value::String(value.cast::<char>().to_string()));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(dynamic_to_value(item)?);
        }
        return Ok(Value::Array(out));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = std::collections::BTreeMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_value(value)?);
        }
        return Ok(Value::Map(out));
    }

    Err(EventError::new(
        "ENGINE_VALUE_UNSUPPORTED",
        format!("Unsupported Rhai value type \"{}\".", value.type_name()),
    ))
}
