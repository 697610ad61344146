//! Action sequences: persona-driven generation, scripted specs, and the
//! interpreter that blends the two at runtime.

mod generator;
mod interpreter;
mod spec;

pub use generator::{click_quota, generate_sequence, MAX_SEQUENCE_LEN, MIN_SEQUENCE_LEN};
pub use interpreter::{SequenceInterpreter, StepResult};
pub use spec::{ScriptedAction, ScriptedKind, SequenceSpec};
