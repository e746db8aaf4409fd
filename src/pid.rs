//! PID files for background process management
//!
//! A server saves its process ids on startup and frees the file on
//! shutdown; a command line client loads the file to find and signal the
//! server.

use crate::error::{AppError, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Best location for a PID file named `filename`: `~/.run/<filename>`,
/// falling back to `/var/run/<filename>` when there is no home directory.
pub fn path(filename: &str) -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".run").join(filename),
        None => Path::new("/var/run").join(filename),
    }
}

/// Process information recorded in a PID file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pid {
    /// Process id assigned by the OS
    pub pid: u32,
    /// Parent process id
    pub ppid: u32,
    #[serde(skip)]
    path: PathBuf,
}

impl Pid {
    /// An empty record for the file at `path`; save or load to populate it
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            pid: 0,
            ppid: 0,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the current process ids and write the file.
    ///
    /// Fails when the file already exists; creation is atomic.
    pub fn save(&mut self) -> Result<()> {
        self.pid = std::process::id();
        self.ppid = parent_id();

        let data = serde_json::to_vec(self)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AppError::already_exists(format!(
                    "PID file exists already at '{}'",
                    self.path.display()
                )),
                _ => AppError::io(format!("could not create {}: {}", self.path.display(), e)),
            })?;
        file.write_all(&data)
            .with_context(|| format!("could not write {}", self.path.display()))?;

        crate::debug!("saved pid {} to {}", self.pid, self.path.display());
        Ok(())
    }

    /// Populate from the file on disk. Unknown keys are ignored.
    pub fn load(&mut self) -> Result<()> {
        let data = fs::read(&self.path).map_err(|_| {
            AppError::not_found(format!(
                "no PID file exists at {}; process not running?",
                self.path.display()
            ))
        })?;

        let loaded: Pid = serde_json::from_slice(&data)?;
        self.pid = loaded.pid;
        self.ppid = loaded.ppid;
        Ok(())
    }

    /// Delete the PID file; a missing file is not an error
    pub fn free(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                crate::debug!("freed pid file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::io(format!(
                "could not remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn ensure_known(&self) -> Result<()> {
        if self.pid == 0 {
            return Err(AppError::process("PID has not yet been saved or loaded"));
        }
        Ok(())
    }
}

#[cfg(unix)]
mod process {
    use super::*;
    use nix::errno::Errno;
    use nix::sys::signal::{self as nix_signal, Signal};
    use nix::unistd::Pid as NixPid;

    pub(super) fn parent_id() -> u32 {
        nix::unistd::getppid().as_raw() as u32
    }

    impl Pid {
        fn target(&self) -> Result<NixPid> {
            self.ensure_known()?;
            let raw = i32::try_from(self.pid)
                .map_err(|_| AppError::process(format!("pid {} out of range", self.pid)))?;
            Ok(NixPid::from_raw(raw))
        }

        /// Whether the recorded process is alive
        pub fn process_exists(&self) -> Result<bool> {
            let target = self.target()?;
            match nix_signal::kill(target, None) {
                Ok(()) => Ok(true),
                // Exists but belongs to someone else
                Err(Errno::EPERM) => Ok(true),
                Err(Errno::ESRCH) => Ok(false),
                Err(e) => Err(e.into()),
            }
        }

        /// Send `sig` to the recorded process
        pub fn signal(&self, sig: Signal) -> Result<()> {
            let target = self.target()?;
            nix_signal::kill(target, sig)
                .with_context(|| format!("could not send {} to process {}", sig.as_str(), self.pid))
        }

        /// Make the recorded process exit immediately
        pub fn kill(&self) -> Result<()> {
            self.signal(Signal::SIGKILL)
        }
    }
}

#[cfg(unix)]
use process::parent_id;

#[cfg(not(unix))]
fn parent_id() -> u32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_is_in_run_directory() {
        let p = path("test.pid");
        assert!(p.ends_with("test.pid"));
        let parent = p.parent().unwrap();
        assert!(parent.ends_with(".run") || parent == Path::new("/var/run"));
    }

    #[test]
    fn test_save_load_free() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("run").join("test.pid");

        let mut pid = Pid::new(&file);
        pid.save().unwrap();
        assert_eq!(pid.pid, std::process::id());
        assert!(file.exists());

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&file).unwrap()).unwrap();
        assert_eq!(raw["pid"], pid.pid);
        assert_eq!(raw["ppid"], pid.ppid);
        assert!(raw.get("path").is_none());

        let mut loaded = Pid::new(&file);
        loaded.load().unwrap();
        assert_eq!(loaded, pid);

        pid.free().unwrap();
        assert!(!file.exists());
        // Freeing twice is fine
        pid.free().unwrap();
    }

    #[test]
    fn test_save_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("test.pid");

        Pid::new(&file).save().unwrap();
        let err = Pid::new(&file).save().unwrap_err();
        assert_eq!(err.category(), "EXISTS");
        assert!(err.to_string().contains("PID file exists already"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("absent.pid");

        let err = Pid::new(&file).load().unwrap_err();
        assert!(err.to_string().contains("no PID file exists at"));
        assert!(err.to_string().contains("process not running?"));
    }

    #[test]
    fn test_load_ignores_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("extra.pid");
        fs::write(&file, r#"{"pid": 42, "ppid": 7, "host": "alpha"}"#).unwrap();

        let mut pid = Pid::new(&file);
        pid.load().unwrap();
        assert_eq!(pid.pid, 42);
        assert_eq!(pid.ppid, 7);
    }

    #[test]
    fn test_load_missing_fields_are_zero() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("partial.pid");
        fs::write(&file, r#"{"pid": 42}"#).unwrap();

        let mut pid = Pid::new(&file);
        pid.load().unwrap();
        assert_eq!(pid.pid, 42);
        assert_eq!(pid.ppid, 0);
        assert_eq!(pid.path(), file.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_management() {
        let empty = Pid::new("unused.pid");
        assert!(empty.process_exists().is_err());
        assert!(empty.kill().is_err());

        let dir = TempDir::new().unwrap();
        let mut pid = Pid::new(dir.path().join("me.pid"));
        pid.save().unwrap();
        assert!(pid.process_exists().unwrap());
        pid.free().unwrap();
    }
}
