//! Persistent shell sessions on a pseudo-terminal and their supervision

pub mod command;
pub mod messages;
pub mod session;
pub mod supervisor;

pub use command::ShellProgram;
pub use session::{OutputEvent, SessionError, SessionState, ShellSession, StopOutcome, TerminalSize};
pub use supervisor::{RestartPolicy, Supervised, Supervisor, SupervisorEvent};
