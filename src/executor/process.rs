use std::{
    fs::{self, OpenOptions},
    path::Path,
    process::{Child, Command as StdCommand, Stdio},
    thread,
    time::{Duration, Instant},
};

#[cfg(unix)]
use nix::{
    errno::Errno,
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::executor::{ActiveCapture, CaptureLauncher, ExecutorError};

pub const OUTPUT_PLACEHOLDER: &str = "{output}";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs a shell command template per pass, with `{output}` replaced by the
/// (quoted) recording path.
#[derive(Debug, Clone)]
pub struct ShellCapture {
    template: String,
    stop_grace: Duration,
}

impl ShellCapture {
    pub fn new(template: impl Into<String>, stop_grace: Duration) -> Result<Self, ExecutorError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(ExecutorError::EmptyCommand);
        }
        if !template.contains(OUTPUT_PLACEHOLDER) {
            return Err(ExecutorError::MissingPlaceholder {
                command: template,
                placeholder: OUTPUT_PLACEHOLDER,
            });
        }
        Ok(Self {
            template,
            stop_grace,
        })
    }

    pub fn render(&self, target: &Path) -> String {
        self.template
            .replace(OUTPUT_PLACEHOLDER, &shell_quote(&target.to_string_lossy()))
    }
}

impl CaptureLauncher for ShellCapture {
    fn start_capture(&mut self, target: &Path) -> Result<Box<dyn ActiveCapture>, ExecutorError> {
        let process = spawn(&self.render(target), target, self.stop_grace)?;
        Ok(Box::new(process))
    }
}

/// Spawn `cmd` through `sh -c` in its own process group. Its stdout and
/// stderr go to log files next to `target`.
pub fn spawn(cmd: &str, target: &Path, stop_grace: Duration) -> Result<CaptureProcess, ExecutorError> {
    if let Some(dir) = target.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let stdout_path = target.with_extension("stdout.log");
    let stderr_path = target.with_extension("stderr.log");

    let stdout_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&stdout_path)?;

    let stderr_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&stderr_path)?;

    log::info!("Executing capture command: {}", cmd);

    let mut command = StdCommand::new("sh");
    command
        .arg("-c")
        .arg(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));
    #[cfg(unix)]
    command.process_group(0);

    let child = command.spawn().map_err(|source| ExecutorError::Spawn {
        command: cmd.to_string(),
        source,
    })?;

    log::info!("Capture spawned (PID: {})", child.id());

    Ok(CaptureProcess {
        child: Some(child),
        command: cmd.to_string(),
        stop_grace,
    })
}

/// Handle on a spawned capture command. Terminated on [`CaptureProcess::terminate`]
/// or on drop, whichever comes first.
#[derive(Debug)]
pub struct CaptureProcess {
    child: Option<Child>,
    command: String,
    stop_grace: Duration,
}

impl CaptureProcess {
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// SIGTERM to the process group, then SIGKILL once `stop_grace` runs out.
    pub fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    log::warn!("Capture exited before LOS: {}", self.command);
                } else {
                    log::warn!(
                        "Capture failed with exit code {}: {}",
                        status.code().unwrap_or(-1),
                        self.command
                    );
                }
                return;
            }
            Ok(None) => {}
            Err(e) => log::error!("Capture wait error: {}", e),
        }

        let pid = child.id();
        if !request_stop(&child) {
            // Nothing left to wait for once the group cannot be signalled.
            force_kill(&mut child);
            return;
        }

        let deadline = Instant::now() + self.stop_grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::info!("Capture stopped (PID {}, {})", pid, status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(WAIT_POLL_INTERVAL),
                Ok(None) => break,
                Err(e) => {
                    log::error!("Capture wait error: {}", e);
                    break;
                }
            }
        }

        log::warn!(
            "Capture (PID {}) still running after {}, killing",
            pid,
            humantime::format_duration(self.stop_grace)
        );
        force_kill(&mut child);
    }
}

impl ActiveCapture for CaptureProcess {
    fn stop(mut self: Box<Self>) {
        self.terminate();
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// SIGTERM to the capture's process group. False if the signal could not be
/// delivered.
#[cfg(unix)]
fn request_stop(child: &Child) -> bool {
    let pgid = Pid::from_raw(child.id() as i32);
    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to send SIGTERM to process group {}: {}", pgid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn request_stop(child: &Child) -> bool {
    log::warn!("No graceful stop on this platform, killing capture (PID {})", child.id());
    false
}

fn force_kill(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = Pid::from_raw(child.id() as i32);
        if let Err(e) = killpg(pgid, Signal::SIGKILL) {
            if e != Errno::ESRCH {
                log::error!("Failed to send SIGKILL to process group {}: {}", pgid, e);
            }
        }
    }
    if let Err(e) = child.kill() {
        log::debug!("kill PID {}: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        log::error!("Capture wait error: {}", e);
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
