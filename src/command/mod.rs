//! Voice command interpretation
//!
//! Classifies recognized speech against configured phrase tables and drives
//! the standby → active → terminated state machine.

mod interpreter;
mod phrases;

pub use interpreter::{Action, Interpreter, InterpreterState};
pub use phrases::{Command, PhraseTable, Task, WakePhrases};
