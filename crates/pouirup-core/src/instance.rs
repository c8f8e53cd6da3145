// pouirup Single Instance
// Pid lock file with takeover of a running instance

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Lock file name, placed in the system temp directory
pub const LOCK_FILE_NAME: &str = "pouirup.lock";

const FIRST_WAIT: Duration = Duration::from_millis(125);
const MAX_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the existing process (PID {pid}) took too long to exit")]
    TakeoverTimeout { pid: i32 },
}

/// Process operations used during takeover
pub trait ProcessControl {
    /// Ask `pid` to exit. `false` when no such process could be signalled.
    fn terminate(&mut self, pid: i32) -> bool;
    fn is_alive(&mut self, pid: i32) -> bool;
    fn sleep(&mut self, duration: Duration);
}

/// Signals real processes through `kill(2)`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

impl ProcessControl for SystemProcesses {
    fn terminate(&mut self, pid: i32) -> bool {
        unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
    }

    fn is_alive(&mut self, pid: i32) -> bool {
        unsafe { libc::kill(pid, 0) == 0 }
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub fn default_lock_path() -> PathBuf {
    std::env::temp_dir().join(LOCK_FILE_NAME)
}

/// Ownership of the lock file; removed on drop if it still names us.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    pid: i32,
}

impl InstanceLock {
    /// Take over from any running instance and record our own pid.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, InstanceError> {
        Self::acquire_with(path, std::process::id() as i32, &mut SystemProcesses)
    }

    pub fn acquire_with(
        path: impl Into<PathBuf>,
        pid: i32,
        processes: &mut dyn ProcessControl,
    ) -> Result<Self, InstanceError> {
        let path = path.into();
        if let Some(running) = read_pid(&path) {
            if running != pid {
                terminate_running(running, processes)?;
            }
        }

        fs::write(&path, pid.to_string()).map_err(|source| InstanceError::Io {
            path: path.clone(),
            source,
        })?;
        log::debug!("Instance lock {} held by pid {}", path.display(), pid);
        Ok(Self { path, pid })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(self.pid) {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// A missing or unparsable lock file means no running instance. So does a
/// pid `kill(2)` would treat as a process group or broadcast.
fn read_pid(path: &Path) -> Option<i32> {
    let text = fs::read_to_string(path).ok()?;
    let pid: i32 = text.lines().next()?.trim().parse().ok()?;
    if pid <= 0 {
        log::debug!("Stale lock {} with pid {}", path.display(), pid);
        return None;
    }
    Some(pid)
}

fn terminate_running(pid: i32, processes: &mut dyn ProcessControl) -> Result<(), InstanceError> {
    if !processes.terminate(pid) {
        log::debug!("Stale lock for pid {}", pid);
        return Ok(());
    }
    log::info!("Terminating running instance (PID {})", pid);

    let mut wait = FIRST_WAIT;
    while wait <= MAX_WAIT {
        processes.sleep(wait);
        wait *= 2;
        if !processes.is_alive(pid) {
            return Ok(());
        }
    }
    Err(InstanceError::TakeoverTimeout { pid })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fake process table: `lives_for` liveness checks before exiting
    struct FakeProcesses {
        exists: bool,
        lives_for: usize,
        terminated: Vec<i32>,
        sleeps: Vec<Duration>,
    }

    impl FakeProcesses {
        fn new(exists: bool, lives_for: usize) -> Self {
            Self {
                exists,
                lives_for,
                terminated: Vec::new(),
                sleeps: Vec::new(),
            }
        }
    }

    impl ProcessControl for FakeProcesses {
        fn terminate(&mut self, pid: i32) -> bool {
            self.terminated.push(pid);
            self.exists
        }

        fn is_alive(&mut self, _pid: i32) -> bool {
            if self.lives_for == 0 {
                return false;
            }
            self.lives_for -= 1;
            true
        }

        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
        }
    }

    fn lock_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pouirup-test-{}-{}.lock", name, std::process::id()))
    }

    #[test]
    fn test_fresh_lock_writes_pid() {
        let path = lock_path("fresh");
        let _ = fs::remove_file(&path);
        let mut procs = FakeProcesses::new(false, 0);

        let lock = InstanceLock::acquire_with(&path, 4242, &mut procs).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "4242");
        assert!(procs.terminated.is_empty());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_pid_is_replaced() {
        let path = lock_path("stale");
        fs::write(&path, "999999").unwrap();
        let mut procs = FakeProcesses::new(false, 0);

        let _lock = InstanceLock::acquire_with(&path, 77, &mut procs).unwrap();
        assert_eq!(procs.terminated, vec![999999]);
        assert!(procs.sleeps.is_empty());
        assert_eq!(read_pid(&path), Some(77));
    }

    #[test]
    fn test_garbage_lock_is_ignored() {
        let path = lock_path("garbage");
        fs::write(&path, "not a pid").unwrap();
        let mut procs = FakeProcesses::new(true, 0);

        let _lock = InstanceLock::acquire_with(&path, 78, &mut procs).unwrap();
        assert!(procs.terminated.is_empty());
    }

    #[test]
    fn test_non_positive_pid_is_never_signalled() {
        for (name, contents) in [("zero", "0"), ("broadcast", "-1"), ("group", "-4242")] {
            let path = lock_path(name);
            fs::write(&path, contents).unwrap();
            let mut procs = FakeProcesses::new(true, usize::MAX);

            let lock = InstanceLock::acquire_with(&path, 81, &mut procs).unwrap();
            assert!(procs.terminated.is_empty(), "{} was signalled", contents);
            assert_eq!(read_pid(&path), Some(81));
            drop(lock);
        }
    }

    #[test]
    fn test_running_instance_exits_after_backoff() {
        let path = lock_path("exits");
        fs::write(&path, "500").unwrap();
        let mut procs = FakeProcesses::new(true, 2);

        let _lock = InstanceLock::acquire_with(&path, 79, &mut procs).unwrap();
        assert_eq!(
            procs.sleeps,
            vec![
                Duration::from_millis(125),
                Duration::from_millis(250),
                Duration::from_millis(500)
            ]
        );
    }

    #[test]
    fn test_takeover_timeout_reports_pid() {
        let path = lock_path("timeout");
        fs::write(&path, "501").unwrap();
        let mut procs = FakeProcesses::new(true, usize::MAX);

        let err = InstanceLock::acquire_with(&path, 80, &mut procs).unwrap_err();
        assert!(matches!(err, InstanceError::TakeoverTimeout { pid: 501 }));
        // 0.125, 0.25, 0.5, 1, 2
        assert_eq!(procs.sleeps.len(), 5);
        assert_eq!(read_pid(&path), Some(501));
        let _ = fs::remove_file(&path);
    }
}
