use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::session::{SessionError, SessionState, ShellSession};

/// The subset of a shell session the supervisor drives
pub trait Supervised {
    /// Refresh and return the liveness state
    fn refresh_state(&mut self) -> SessionState;
    /// Launch the shell
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the shell cannot be launched.
    fn start(&mut self) -> Result<(), SessionError>;
    /// Whether the last exit was requested by the user
    fn stopped_by_user(&self) -> bool;
}

impl Supervised for ShellSession {
    fn refresh_state(&mut self) -> SessionState {
        ShellSession::refresh_state(self)
    }

    fn start(&mut self) -> Result<(), SessionError> {
        ShellSession::start(self)
    }

    fn stopped_by_user(&self) -> bool {
        ShellSession::stopped_by_user(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// How often liveness is checked
    pub check_interval: Duration,
    /// Delay between noticing an exit and restarting
    pub backoff: Duration,
    /// Stop restarting after this many attempts; `None` retries forever
    pub max_restarts: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(1000),
            backoff: Duration::from_millis(2000),
            max_restarts: None,
        }
    }
}

/// Something the supervisor did during a tick
#[derive(Debug)]
pub enum SupervisorEvent {
    /// An unexpected exit was noticed and a restart scheduled
    ExitDetected,
    Restarted,
    /// The restart attempt failed; checking resumes on the normal interval
    RestartFailed(SessionError),
    /// `max_restarts` was reached; no more restarts will be attempted
    GaveUp,
}

/// Restarts a shell that exited without being asked to.
///
/// The supervisor holds no clock of its own: the owner calls [`Supervisor::tick`]
/// with the current time, so at most one restart is ever pending.
#[derive(Debug)]
pub struct Supervisor {
    policy: RestartPolicy,
    next_check: Option<Instant>,
    restart_at: Option<Instant>,
    restarts: u32,
    gave_up: bool,
}

impl Supervisor {
    #[must_use]
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            next_check: None,
            restart_at: None,
            restarts: 0,
            gave_up: false,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    /// Number of restarts performed so far
    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    #[must_use]
    pub fn restart_pending(&self) -> bool {
        self.restart_at.is_some()
    }

    /// Forget a pending restart and the retry count, e.g. after the user starts
    /// or stops the shell explicitly
    pub fn reset(&mut self) {
        self.restart_at = None;
        self.restarts = 0;
        self.gave_up = false;
    }

    /// Advance the supervisor to `now`.
    ///
    /// While a restart is pending, liveness checks are paused.
    pub fn tick<S: Supervised>(&mut self, session: &mut S, now: Instant) -> Option<SupervisorEvent> {
        if let Some(restart_at) = self.restart_at {
            if now < restart_at {
                return None;
            }
            self.restart_at = None;
            self.next_check = Some(now + self.policy.check_interval);
            self.restarts += 1;
            return match session.start() {
                Ok(()) => {
                    info!("Shell restarted (attempt {})", self.restarts);
                    Some(SupervisorEvent::Restarted)
                }
                Err(e) => {
                    warn!("Shell restart failed: {e}");
                    Some(SupervisorEvent::RestartFailed(e))
                }
            };
        }

        match self.next_check {
            Some(next_check) if now < next_check => return None,
            _ => self.next_check = Some(now + self.policy.check_interval),
        }

        if session.refresh_state() != SessionState::Exited || session.stopped_by_user() {
            return None;
        }
        if self.gave_up {
            return None;
        }
        if let Some(max) = self.policy.max_restarts
            && self.restarts >= max
        {
            warn!("Shell exited again after {max} restarts, giving up");
            self.gave_up = true;
            return Some(SupervisorEvent::GaveUp);
        }

        debug!(
            "Shell exited unexpectedly, restarting in {:?}",
            self.policy.backoff
        );
        self.restart_at = Some(now + self.policy.backoff);
        Some(SupervisorEvent::ExitDetected)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(RestartPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted session: `start` succeeds unless `fail_start` is set
    #[derive(Default)]
    struct FakeSession {
        state: Option<SessionState>,
        stopped_by_user: bool,
        fail_start: bool,
        starts: u32,
    }

    impl Supervised for FakeSession {
        fn refresh_state(&mut self) -> SessionState {
            self.state.unwrap_or(SessionState::NotStarted)
        }

        fn start(&mut self) -> Result<(), SessionError> {
            self.starts += 1;
            if self.fail_start {
                return Err(SessionError::Spawn {
                    program: "fake".to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            self.state = Some(SessionState::Running);
            Ok(())
        }

        fn stopped_by_user(&self) -> bool {
            self.stopped_by_user
        }
    }

    fn exited() -> FakeSession {
        FakeSession {
            state: Some(SessionState::Exited),
            ..FakeSession::default()
        }
    }

    #[test]
    fn test_unexpected_exit_restarts_after_backoff() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::default();
        let mut session = exited();

        assert!(matches!(
            supervisor.tick(&mut session, t0),
            Some(SupervisorEvent::ExitDetected)
        ));
        assert!(supervisor.restart_pending());
        assert!(supervisor.tick(&mut session, t0 + Duration::from_millis(1999)).is_none());
        assert_eq!(session.starts, 0);

        assert!(matches!(
            supervisor.tick(&mut session, t0 + Duration::from_millis(2000)),
            Some(SupervisorEvent::Restarted)
        ));
        assert_eq!(session.starts, 1);
        assert_eq!(supervisor.restarts(), 1);
        assert!(!supervisor.restart_pending());
    }

    #[test]
    fn test_user_stop_is_not_restarted() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::default();
        let mut session = FakeSession {
            stopped_by_user: true,
            ..exited()
        };
        for step in 0..10 {
            let now = t0 + Duration::from_millis(step * 1000);
            assert!(supervisor.tick(&mut session, now).is_none());
        }
        assert_eq!(session.starts, 0);
    }

    #[test]
    fn test_running_session_is_left_alone() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::default();
        let mut session = FakeSession {
            state: Some(SessionState::Running),
            ..FakeSession::default()
        };
        assert!(supervisor.tick(&mut session, t0).is_none());
        assert!(supervisor.tick(&mut session, t0 + Duration::from_secs(5)).is_none());
        assert_eq!(session.starts, 0);
    }

    #[test]
    fn test_checks_are_rate_limited() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::default();
        let mut session = FakeSession {
            state: Some(SessionState::Running),
            ..FakeSession::default()
        };
        assert!(supervisor.tick(&mut session, t0).is_none());

        // Exit between checks is only noticed on the next interval
        session.state = Some(SessionState::Exited);
        assert!(supervisor.tick(&mut session, t0 + Duration::from_millis(500)).is_none());
        assert!(supervisor.tick(&mut session, t0 + Duration::from_millis(1000)).is_some());
    }

    #[test]
    fn test_single_pending_restart() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::default();
        let mut session = exited();
        supervisor.tick(&mut session, t0);
        // Many checks during the backoff never schedule a second restart
        for ms in (100..2000).step_by(100) {
            assert!(supervisor.tick(&mut session, t0 + Duration::from_millis(ms)).is_none());
        }
        supervisor.tick(&mut session, t0 + Duration::from_millis(2000));
        assert_eq!(session.starts, 1);
    }

    #[test]
    fn test_failed_restart_is_retried() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::default();
        let mut session = FakeSession {
            fail_start: true,
            ..exited()
        };
        supervisor.tick(&mut session, t0);
        assert!(matches!(
            supervisor.tick(&mut session, t0 + Duration::from_millis(2000)),
            Some(SupervisorEvent::RestartFailed(SessionError::Spawn { .. }))
        ));
        assert!(matches!(
            supervisor.tick(&mut session, t0 + Duration::from_millis(3000)),
            Some(SupervisorEvent::ExitDetected)
        ));
        supervisor.tick(&mut session, t0 + Duration::from_millis(5000));
        assert_eq!(session.starts, 2);
    }

    #[test]
    fn test_gives_up_after_max_restarts() {
        let t0 = Instant::now();
        let mut supervisor = Supervisor::new(RestartPolicy {
            max_restarts: Some(1),
            ..RestartPolicy::default()
        });
        let mut session = FakeSession {
            fail_start: true,
            ..exited()
        };
        supervisor.tick(&mut session, t0);
        supervisor.tick(&mut session, t0 + Duration::from_millis(2000));
        assert!(matches!(
            supervisor.tick(&mut session, t0 + Duration::from_millis(3000)),
            Some(SupervisorEvent::GaveUp)
        ));
        assert!(supervisor.tick(&mut session, t0 + Duration::from_millis(4000)).is_none());
        assert_eq!(session.starts, 1);

        supervisor.reset();
        assert!(matches!(
            supervisor.tick(&mut session, t0 + Duration::from_millis(5000)),
            Some(SupervisorEvent::ExitDetected)
        ));
    }
}
