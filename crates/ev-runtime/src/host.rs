use ev_core::{Program, SharedStore, Value};

/// Everything the interpreter needs from the game it is embedded in.
///
/// Handlers only affect the outside world through these calls and through
/// the shared store.
pub trait EventHost {
    fn store(&self) -> SharedStore;

    /// While true the interpreter stops at the top of every iteration.
    fn is_scene_changing(&self) -> bool {
        false
    }

    fn common_event(&self, id: i64) -> Option<Program>;

    fn plugin_command(&mut self, name: &str, args: &[String]);

    /// Condition kinds the interpreter does not evaluate itself.
    fn check_condition(&mut self, _params: &[Value]) -> bool {
        false
    }

    /// Game data operand of a variable operation; receives the parameters
    /// after the operand kind.
    fn game_data_operand(&mut self, _params: &[Value]) -> Value {
        Value::Number(0.0)
    }

    /// Uniform integer in `0..upper`; zero when `upper` is not positive.
    fn random_int(&mut self, upper: i64) -> i64;

    /// Presents a choice list. `None` means the answer is not ready yet and
    /// the command is retried next slot; a negative index means cancelled.
    fn show_choices(&mut self, _params: &[Value]) -> Option<i64> {
        Some(-1)
    }
}
