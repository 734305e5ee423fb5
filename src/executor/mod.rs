mod process;

use std::path::Path;

use thiserror::Error;

pub use process::{spawn, CaptureProcess, ShellCapture, OUTPUT_PLACEHOLDER};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("capture command is empty")]
    EmptyCommand,
    #[error("capture command has no {placeholder} placeholder: {command}")]
    MissingPlaceholder {
        command: String,
        placeholder: &'static str,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// Starts the external recorder for one pass.
pub trait CaptureLauncher {
    fn start_capture(&mut self, target: &Path) -> Result<Box<dyn ActiveCapture>, ExecutorError>;
}

/// A running capture.
///
/// Implementations must also terminate the capture when dropped, so leaving
/// the capturing state by any path ends the recording.
pub trait ActiveCapture {
    fn stop(self: Box<Self>);
}
