use std::fmt;
use std::io::{Read, Write};
use std::thread::spawn;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use portable_pty::{Child, MasterPty, PtySize, native_pty_system};

use super::command::ShellProgram;

/// How long `terminate()` waits for a cooperative exit before killing
pub const TERMINATE_GRACE: Duration = Duration::from_millis(1000);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_BUFFER_SIZE: usize = 4096;

#[cfg(windows)]
const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
const LINE_TERMINATOR: &str = "\n";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unable to spawn shell `{program}`: {reason}")]
    Spawn { program: String, reason: String },
    #[error("Shell is not running (state: {0})")]
    NotRunning(SessionState),
    #[error("Unable to open PTY: {0}")]
    Pty(String),
    #[error("Failed to write to shell: {0}")]
    Write(#[source] std::io::Error),
}

/// Lifecycle of the shell process owned by a [`ShellSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Running,
    /// Entered only by an explicit `terminate()`
    Terminating,
    Exited,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::NotStarted => "not started",
            SessionState::Running => "running",
            SessionState::Terminating => "terminating",
            SessionState::Exited => "exited",
        };
        f.write_str(label)
    }
}

/// Result of a `terminate()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NothingToStop,
    /// The shell exited on the cooperative signal
    Terminated,
    /// The grace period ran out and the shell was killed
    Killed,
}

/// One chunk of shell output, as delivered by a single read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub timestamp: Instant,
    pub text: String,
}

/// PTY dimensions in columns and rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    cols: u16,
    rows: u16,
}

impl TerminalSize {
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<TerminalSize> for PtySize {
    fn from(size: TerminalSize) -> Self {
        Self {
            cols: size.cols,
            rows: size.rows,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

#[derive(Debug)]
enum ReaderUpdate {
    Output(OutputEvent),
    Closed { generation: u64 },
}

/// Carries an incomplete trailing UTF-8 sequence over to the next read
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let complete = match std::str::from_utf8(&self.pending) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => self.pending.len(),
        };
        let tail = self.pending.split_off(complete);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }
}

/// Spawn a thread that turns every PTY read into one output event
fn spawn_shell_reader(
    mut reader: Box<dyn Read + Send>,
    generation: u64,
    update_tx: Sender<ReaderUpdate>,
) {
    spawn(move || {
        let mut carry = Utf8Carry::default();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("Shell reader EOF");
                    break;
                }
                Ok(n) => {
                    let text = carry.decode(&buf[..n]);
                    if text.is_empty() {
                        continue;
                    }
                    let event = OutputEvent {
                        timestamp: Instant::now(),
                        text,
                    };
                    if update_tx.send(ReaderUpdate::Output(event)).is_err() {
                        debug!("Shell reader: session dropped");
                        return;
                    }
                }
                Err(e) => {
                    // Linux reports EIO once the shell side of the PTY closes
                    debug!("Shell reader stopped: {e}");
                    break;
                }
            }
        }
        let _ = update_tx.send(ReaderUpdate::Closed { generation });
    });
}

#[cfg(unix)]
fn send_graceful_signal(child: &(dyn Child + Send + Sync)) {
    let Some(pid) = child.process_id().and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // The shell is a session leader on its PTY, so its pid is also its process group
    // SAFETY: kill(2) has no memory-safety preconditions
    let result = unsafe { libc::kill(-pid, libc::SIGTERM) };
    if result != 0 {
        debug!(
            "SIGTERM to shell group {pid} failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn send_graceful_signal(_child: &(dyn Child + Send + Sync)) {
    debug!("No cooperative stop signal on this platform");
}

struct ShellProcess {
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    master: Box<dyn MasterPty + Send>,
}

/// A persistent interactive shell running on a pseudo-terminal.
///
/// All state changes happen on the owner's thread: `start`, `write`,
/// `terminate`, `refresh_state` and `pump` are the only mutators. A helper
/// thread reads the merged output stream and queues it until `pump` publishes
/// it to subscribers, preserving the order the shell produced it in.
pub struct ShellSession {
    program: ShellProgram,
    size: TerminalSize,
    state: SessionState,
    process: Option<ShellProcess>,
    generation: u64,
    exit_code: Option<u32>,
    stopped_by_user: bool,
    /// The current process's reader has not yet reported end of stream
    output_open: bool,
    update_tx: Sender<ReaderUpdate>,
    update_rx: Receiver<ReaderUpdate>,
    subscribers: Vec<Sender<OutputEvent>>,
}

impl ShellSession {
    #[must_use]
    pub fn new(program: ShellProgram, size: TerminalSize) -> Self {
        let (update_tx, update_rx) = crossbeam_channel::unbounded();
        Self {
            program,
            size,
            state: SessionState::NotStarted,
            process: None,
            generation: 0,
            exit_code: None,
            stopped_by_user: false,
            output_open: false,
            update_tx,
            update_rx,
            subscribers: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Exit code of the most recent process, once it has exited
    #[must_use]
    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    /// Whether the last exit was requested through `terminate()`
    #[must_use]
    pub fn stopped_by_user(&self) -> bool {
        self.stopped_by_user
    }

    /// Whether output of the current process may still arrive through `pump`
    #[must_use]
    pub fn output_open(&self) -> bool {
        self.output_open
    }

    /// OS process id of the running shell
    #[must_use]
    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.child.process_id())
    }

    #[must_use]
    pub fn program(&self) -> &ShellProgram {
        &self.program
    }

    /// Register a new output observer. Dropped receivers are pruned on the next publish.
    pub fn subscribe(&mut self) -> Receiver<OutputEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Launch the shell. A no-op while a shell is already running.
    ///
    /// Returning `Ok` confirms the process was launched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Spawn` if the executable cannot be launched, or
    /// `SessionError::Pty` if the PTY cannot be set up. The state is left unchanged.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if matches!(
            self.state,
            SessionState::Running | SessionState::Terminating
        ) {
            debug!("Shell already running, not starting another");
            return Ok(());
        }

        let pair = native_pty_system()
            .openpty(self.size.into())
            .map_err(|e| SessionError::Pty(e.to_string()))?;
        let mut child = pair
            .slave
            .spawn_command((&self.program).into())
            .map_err(|e| SessionError::Spawn {
                program: self.program.to_string(),
                reason: e.to_string(),
            })?;
        drop(pair.slave); // The reader sees EOF once the shell exits

        let handles = pair.master.try_clone_reader().and_then(|reader| {
            let writer = pair.master.take_writer()?;
            Ok((reader, writer))
        });
        let (reader, writer) = match handles {
            Ok(handles) => handles,
            Err(e) => {
                let _ = child.kill();
                return Err(SessionError::Pty(e.to_string()));
            }
        };

        self.generation += 1;
        spawn_shell_reader(reader, self.generation, self.update_tx.clone());
        info!(
            "Started shell '{}' (pid {})",
            self.program,
            child
                .process_id()
                .map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
        );
        self.process = Some(ShellProcess {
            child,
            writer,
            master: pair.master,
        });
        self.state = SessionState::Running;
        self.exit_code = None;
        self.stopped_by_user = false;
        self.output_open = true;
        Ok(())
    }

    /// Send `command` followed by a newline to the shell.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` (without touching the process) unless the
    /// session is `Running`, or `SessionError::Write` if the PTY write fails.
    pub fn write(&mut self, command: &str) -> Result<(), SessionError> {
        let process = match (self.state, self.process.as_mut()) {
            (SessionState::Running, Some(process)) => process,
            _ => return Err(SessionError::NotRunning(self.state)),
        };
        let mut bytes = Vec::with_capacity(command.len() + LINE_TERMINATOR.len());
        bytes.extend_from_slice(command.as_bytes());
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        process
            .writer
            .write_all(&bytes)
            .and_then(|()| process.writer.flush())
            .map_err(SessionError::Write)
    }

    /// Publish queued output to subscribers, in arrival order.
    ///
    /// Returns the number of output events delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(update) = self.update_rx.try_recv() {
            match update {
                ReaderUpdate::Output(event) => {
                    self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
                    delivered += 1;
                }
                ReaderUpdate::Closed { generation } if generation == self.generation => {
                    self.output_open = false;
                    self.refresh_state();
                }
                ReaderUpdate::Closed { .. } => {}
            }
        }
        delivered
    }

    /// Ask the OS whether the shell is still alive and update the state accordingly.
    pub fn refresh_state(&mut self) -> SessionState {
        if matches!(
            self.state,
            SessionState::Running | SessionState::Terminating
        ) && let Some(process) = self.process.as_mut()
        {
            match process.child.try_wait() {
                Ok(Some(status)) => self.mark_exited(status.exit_code()),
                Ok(None) => {}
                Err(e) => warn!("Unable to query shell status: {e}"),
            }
        }
        self.state
    }

    fn mark_exited(&mut self, code: u32) {
        info!("Shell exited with code {code}");
        self.state = SessionState::Exited;
        self.exit_code = Some(code);
        self.process = None;
    }

    /// Stop the shell: cooperative signal first, unconditional kill after
    /// [`TERMINATE_GRACE`]. Blocks for at most the grace period plus kill latency.
    ///
    /// # Errors
    ///
    /// Currently infallible; kill failures are logged and the session is marked exited.
    pub fn terminate(&mut self) -> Result<StopOutcome, SessionError> {
        if self.refresh_state() != SessionState::Running {
            info!("No running shell to stop");
            return Ok(StopOutcome::NothingToStop);
        }
        let Some(process) = self.process.as_mut() else {
            return Ok(StopOutcome::NothingToStop);
        };

        self.stopped_by_user = true;
        self.state = SessionState::Terminating;
        send_graceful_signal(process.child.as_ref());

        let deadline = Instant::now() + TERMINATE_GRACE;
        loop {
            match process.child.try_wait() {
                Ok(Some(status)) => {
                    self.mark_exited(status.exit_code());
                    return Ok(StopOutcome::Terminated);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Unable to query shell status: {e}");
                    break;
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }

        debug!("Shell ignored the stop signal, killing it");
        if let Err(e) = process.child.kill() {
            warn!("Failed to kill shell: {e}");
        }
        let code = match process.child.wait() {
            Ok(status) => status.exit_code(),
            Err(e) => {
                warn!("Failed to reap shell: {e}");
                1
            }
        };
        self.mark_exited(code);
        Ok(StopOutcome::Killed)
    }

    /// Resize the PTY (takes effect on the next start when no shell is running).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Pty` if the running PTY rejects the new size.
    pub fn resize(&mut self, size: TerminalSize) -> Result<(), SessionError> {
        if self.size == size {
            return Ok(());
        }
        self.size = size;
        if let Some(process) = &self.process {
            process
                .master
                .resize(size.into())
                .map_err(|e| SessionError::Pty(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take()
            && matches!(process.child.try_wait(), Ok(None))
        {
            debug!("Killing shell on drop");
            if let Err(e) = process.child.kill() {
                debug!("Failed to kill shell on drop: {e}");
            }
            if let Err(e) = process.child.wait() {
                debug!("Failed to reap shell on drop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_before_start_is_rejected() {
        let mut session = ShellSession::new(ShellProgram::new("cat", &[]), TerminalSize::default());
        let result = session.write("echo hi");
        assert!(matches!(
            result,
            Err(SessionError::NotRunning(SessionState::NotStarted))
        ));
        assert_eq!(session.state(), SessionState::NotStarted);
        assert_eq!(session.pump(), 0);
    }

    #[test]
    fn test_terminate_when_not_started_is_noop() {
        let mut session = ShellSession::new(ShellProgram::new("cat", &[]), TerminalSize::default());
        assert_eq!(session.terminate().unwrap(), StopOutcome::NothingToStop);
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(!session.stopped_by_user());
    }

    #[test]
    fn test_utf8_carry_joins_split_sequence() {
        let mut carry = Utf8Carry::default();
        let bytes = "héllo".as_bytes();
        let first = carry.decode(&bytes[..2]);
        let second = carry.decode(&bytes[2..]);
        assert_eq!(first, "h");
        assert_eq!(second, "éllo");
    }

    #[test]
    fn test_utf8_carry_replaces_invalid_bytes() {
        let mut carry = Utf8Carry::default();
        assert_eq!(carry.decode(b"a\xffb"), "a\u{fffd}b");
        assert!(carry.pending.is_empty());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::NotStarted.to_string(), "not started");
        assert_eq!(
            SessionError::NotRunning(SessionState::Exited).to_string(),
            "Shell is not running (state: exited)"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_drop_reaps_running_shell() {
        let mut session = ShellSession::new(ShellProgram::new("cat", &[]), TerminalSize::default());
        session.start().unwrap();
        let pid = libc::pid_t::try_from(session.process_id().unwrap()).unwrap();
        drop(session);

        // kill(pid, 0) still succeeds for an unreaped zombie
        // SAFETY: signal 0 only checks that the process exists
        let result = unsafe { libc::kill(pid, 0) };
        assert_eq!(result, -1);
        assert_eq!(
            std::io::Error::last_os_error().raw_os_error(),
            Some(libc::ESRCH)
        );
    }
}
