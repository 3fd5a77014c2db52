use std::rc::Rc;

use ev_core::{EventError, EventRef, SharedStore, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionMode {
    /// Statement block run for its side effects.
    Block,
    /// Single expression whose value is returned.
    Value,
}

/// Everything a compiled expression may touch, passed at call time.
#[derive(Clone)]
pub struct ExpressionContext {
    pub store: SharedStore,
    pub event: EventRef,
}

pub trait CompiledExpression {
    fn call(&self, context: &ExpressionContext) -> Result<Value, EventError>;
}

impl<F> CompiledExpression for F
where
    F: Fn(&ExpressionContext) -> Result<Value, EventError>,
{
    fn call(&self, context: &ExpressionContext) -> Result<Value, EventError> {
        self(context)
    }
}

pub type ExpressionFn = Rc<dyn CompiledExpression>;

/// Turns rewritten expression text into a callable. Errors are returned as
/// plain messages; the program compiler attaches the command location.
pub trait ExpressionCompiler {
    fn compile(&self, source: &str, mode: ExpressionMode) -> Result<ExpressionFn, String>;
}
