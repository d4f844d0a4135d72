//! Prompt line editing and command history

pub mod controller;
pub mod history;

pub use controller::{CommandSink, InputController, InputKey, InputLine, InputOutcome, PROMPT};
pub use history::CommandHistory;
