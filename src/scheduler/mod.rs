pub mod artifacts;
pub mod clock;
pub mod runner;
pub mod shutdown;

pub use artifacts::PassLog;
pub use clock::{Clock, SystemClock};
pub use runner::{CaptureSession, Runner, SleepReason, StepOutcome, WatchSettings, WatchState};
pub use shutdown::Shutdown;
