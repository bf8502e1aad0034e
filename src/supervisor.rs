//! Worker process supervision
//!
//! At most one worker runs per role. Starting a role terminates its previous
//! worker first, so two workers never race for the same device. Termination
//! is graceful first (SIGTERM on unix, which the worker turns into a stop
//! request) and forced after the grace period.

use std::collections::HashMap;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use crate::domain::{sanitize_prefix, ScanError, ScanResult};

/// Grace period used when a role is restarted or the supervisor is dropped
pub const DEFAULT_GRACE: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a worker ended when it was asked to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No worker was registered for the role
    NotRunning,
    /// The worker had already exited on its own
    Exited(Option<i32>),
    /// The worker exited within the grace period after SIGTERM
    Graceful(Option<i32>),
    /// The worker was killed after the grace period
    Forced,
}

#[derive(Default)]
pub struct Supervisor {
    workers: HashMap<String, Child>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `command` as the worker for `role`, terminating any previous
    /// worker for the role first. Returns the new process id.
    pub fn start(&mut self, role: &str, mut command: Command) -> ScanResult<u32> {
        let role = sanitize_prefix(role)?;
        let previous = self.terminate(&role, DEFAULT_GRACE)?;
        if previous != Termination::NotRunning {
            log::info!("Replaced previous {role} worker ({previous:?})");
        }

        let child = command
            .spawn()
            .map_err(|e| ScanError::Supervisor(format!("Failed to start {role} worker: {e}")))?;
        let pid = child.id();
        log::info!("Started {role} worker (pid {pid})");
        self.workers.insert(role, child);
        Ok(pid)
    }

    /// Whether the worker for `role` is still alive
    pub fn is_running(&mut self, role: &str) -> bool {
        match self.workers.get_mut(role) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.workers.keys().cloned().collect();
        roles.sort();
        roles
    }

    /// Stop the worker for `role`: SIGTERM, wait up to `grace`, then kill
    pub fn terminate(&mut self, role: &str, grace: Duration) -> ScanResult<Termination> {
        let Some(mut child) = self.workers.remove(role) else {
            return Ok(Termination::NotRunning);
        };

        if let Some(status) = try_wait(&mut child)? {
            return Ok(Termination::Exited(status.code()));
        }

        request_stop(&child)?;
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Some(status) = try_wait(&mut child)? {
                log::info!("{role} worker exited gracefully ({status})");
                return Ok(Termination::Graceful(status.code()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        log::warn!("{role} worker ignored stop request, killing");
        child
            .kill()
            .map_err(|e| ScanError::Supervisor(format!("Failed to kill {role} worker: {e}")))?;
        child
            .wait()
            .map_err(|e| ScanError::Supervisor(format!("Failed to reap {role} worker: {e}")))?;
        Ok(Termination::Forced)
    }

    /// Terminate every worker
    pub fn shutdown(&mut self, grace: Duration) {
        for role in self.roles() {
            if let Err(e) = self.terminate(&role, grace) {
                log::error!("{e}");
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown(DEFAULT_GRACE);
    }
}

fn try_wait(child: &mut Child) -> ScanResult<Option<std::process::ExitStatus>> {
    child
        .try_wait()
        .map_err(|e| ScanError::Supervisor(format!("Failed to poll worker: {e}")))
}

#[cfg(unix)]
fn request_stop(child: &Child) -> ScanResult<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    #[allow(clippy::cast_possible_wrap)]
    let pid = Pid::from_raw(child.id() as i32);
    match kill(pid, Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Exited between the poll and the signal
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(ScanError::Supervisor(format!("Failed to signal worker: {e}"))),
    }
}

#[cfg(not(unix))]
fn request_stop(_child: &Child) -> ScanResult<()> {
    // No polite signal available; the grace period just gives it time to exit
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sleeper(secs: u32) -> Command {
        let mut cmd = Command::new("sleep");
        cmd.arg(secs.to_string());
        cmd
    }

    #[test]
    fn unknown_role_is_not_running() {
        let mut sup = Supervisor::new();
        assert!(!sup.is_running("antenna-sweep"));
        assert_eq!(
            sup.terminate("antenna-sweep", Duration::from_millis(10)).unwrap(),
            Termination::NotRunning
        );
    }

    #[test]
    fn sigterm_stops_cooperative_worker() {
        let mut sup = Supervisor::new();
        sup.start("live-waterfall", sleeper(30)).unwrap();
        assert!(sup.is_running("live-waterfall"));

        let result = sup.terminate("live-waterfall", Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Termination::Graceful(_)));
        assert!(!sup.is_running("live-waterfall"));
    }

    #[test]
    fn worker_ignoring_sigterm_is_killed() {
        let mut sup = Supervisor::new();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "trap '' TERM; exec sleep 30"]);
        sup.start("spectrum-sweep", cmd).unwrap();
        // Give the shell time to install the trap
        std::thread::sleep(Duration::from_millis(200));

        let result = sup.terminate("spectrum-sweep", Duration::from_millis(300)).unwrap();
        assert_eq!(result, Termination::Forced);
    }

    #[test]
    fn exited_worker_reports_its_code() {
        let mut sup = Supervisor::new();
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 3"]);
        sup.start("antenna-sweep", cmd).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while sup.is_running("antenna-sweep") && Instant::now() < deadline {
            std::thread::sleep(POLL_INTERVAL);
        }
        assert_eq!(
            sup.terminate("antenna-sweep", Duration::from_millis(10)).unwrap(),
            Termination::Exited(Some(3))
        );
    }

    #[test]
    fn restarting_a_role_replaces_the_worker() {
        let mut sup = Supervisor::new();
        let first = sup.start("antenna-sweep", sleeper(30)).unwrap();
        let second = sup.start("antenna-sweep", sleeper(30)).unwrap();
        assert_ne!(first, second);
        assert_eq!(sup.roles(), vec!["antenna-sweep".to_string()]);
        assert!(sup.is_running("antenna-sweep"));
    }

    #[test]
    fn role_names_are_validated() {
        let mut sup = Supervisor::new();
        assert!(matches!(
            sup.start("../evil", sleeper(1)),
            Err(ScanError::Config(_))
        ));
    }
}
