//! The shell console: one session with its supervisor and input line

use std::time::Instant;

use crossbeam_channel::Receiver;
use log::info;

use crate::input::{CommandSink, InputController, InputKey, InputOutcome};
use crate::pty::{
    OutputEvent, RestartPolicy, SessionError, SessionState, ShellProgram, ShellSession,
    StopOutcome, Supervisor, SupervisorEvent, TerminalSize,
};

/// Starts the shell on demand before a command is written.
///
/// Explicit starts also clear the supervisor's retry bookkeeping.
struct AutoStart<'a> {
    session: &'a mut ShellSession,
    supervisor: &'a mut Supervisor,
}

impl AutoStart<'_> {
    fn ensure_running(&mut self) -> Result<(), SessionError> {
        if self.session.refresh_state() != SessionState::Running {
            info!("Shell not running, starting it");
            self.supervisor.reset();
            self.session.start()?;
        }
        Ok(())
    }
}

impl CommandSink for AutoStart<'_> {
    fn submit(&mut self, command: &str) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.session.write(command)
    }
}

/// Owns the single shell session of the application and everything that drives it.
///
/// All methods run on the caller's thread; nothing here is shared.
pub struct Console {
    session: ShellSession,
    supervisor: Supervisor,
    input: InputController,
}

impl Console {
    #[must_use]
    pub fn new(program: ShellProgram, size: TerminalSize, policy: RestartPolicy) -> Self {
        Self {
            session: ShellSession::new(program, size),
            supervisor: Supervisor::new(policy),
            input: InputController::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &ShellSession {
        &self.session
    }

    #[must_use]
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    #[must_use]
    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn subscribe(&mut self) -> Receiver<OutputEvent> {
        self.session.subscribe()
    }

    /// # Errors
    ///
    /// Returns `SessionError::Spawn` or `SessionError::Pty` if the shell cannot be launched.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.auto_start().ensure_running()
    }

    /// Write a rendered command, starting the shell first if needed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the shell cannot be started or written to.
    pub fn dispatch(&mut self, command: &str) -> Result<(), SessionError> {
        self.auto_start().submit(command)
    }

    /// User-initiated stop; the supervisor will not restart the shell afterwards.
    ///
    /// # Errors
    ///
    /// Propagates `ShellSession::terminate` errors.
    pub fn stop(&mut self) -> Result<StopOutcome, SessionError> {
        self.supervisor.reset();
        self.session.terminate()
    }

    /// Route a key event through the input line.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if a submitted command cannot be delivered.
    pub fn handle_key(&mut self, key: InputKey) -> Result<InputOutcome, SessionError> {
        let mut sink = AutoStart {
            session: &mut self.session,
            supervisor: &mut self.supervisor,
        };
        self.input.handle_key(key, &mut sink)
    }

    /// Publish pending output and run the supervisor
    pub fn tick(&mut self, now: Instant) -> Option<SupervisorEvent> {
        self.session.pump();
        self.supervisor.tick(&mut self.session, now)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Pty` if the running PTY rejects the size.
    pub fn resize(&mut self, size: TerminalSize) -> Result<(), SessionError> {
        self.session.resize(size)
    }

    fn auto_start(&mut self) -> AutoStart<'_> {
        AutoStart {
            session: &mut self.session,
            supervisor: &mut self.supervisor,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    fn console(program: &str, args: &[&str]) -> Console {
        Console::new(
            ShellProgram::new(program, args),
            TerminalSize::default(),
            RestartPolicy::default(),
        )
    }

    fn collect_until(console: &mut Console, rx: &Receiver<OutputEvent>, needle: &str) -> String {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut output = String::new();
        while Instant::now() < deadline && !output.contains(needle) {
            console.tick(Instant::now());
            output.extend(rx.try_iter().map(|event| event.text));
            std::thread::sleep(Duration::from_millis(10));
        }
        output
    }

    #[test]
    fn test_dispatch_starts_shell_on_demand() {
        let mut console = console("cat", &[]);
        let rx = console.subscribe();
        assert_eq!(console.session().state(), SessionState::NotStarted);

        console.dispatch("hello tooldeck").unwrap();
        assert_eq!(console.session().state(), SessionState::Running);
        assert!(collect_until(&mut console, &rx, "hello tooldeck").contains("hello tooldeck"));
    }

    #[test]
    fn test_typed_command_reaches_shell() {
        let mut console = console("cat", &[]);
        let rx = console.subscribe();
        for c in "typed".chars() {
            console.handle_key(InputKey::Char(c)).unwrap();
        }
        let outcome = console
            .handle_key(InputKey::Submit { modified: false })
            .unwrap();
        assert_eq!(outcome, InputOutcome::Submitted("typed".to_string()));
        assert!(collect_until(&mut console, &rx, "typed").contains("typed"));
    }

    #[test]
    fn test_stop_is_not_restarted() {
        let mut console = console("cat", &[]);
        console.start().unwrap();
        let outcome = console.stop().unwrap();
        assert_ne!(outcome, StopOutcome::NothingToStop);
        assert_eq!(console.session().state(), SessionState::Exited);

        let later = Instant::now() + Duration::from_secs(10);
        assert!(console.tick(later).is_none());
        assert!(!console.supervisor().restart_pending());
    }
}
