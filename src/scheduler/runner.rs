use std::{path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use strum_macros::Display;

use crate::{
    executor::{ActiveCapture, CaptureLauncher},
    predict::{
        aos_happens, elevation_at, is_visible, next_aos, next_los, search_horizon_days,
        JulianDate, Observer, OrbitalElements,
    },
    scheduler::{artifacts::PassLog, clock::Clock, shutdown::Shutdown},
};

/// Shortest sleep the loop takes, so a prediction landing on `now` cannot spin.
const MIN_NAP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Elevation threshold in radians.
    pub min_elevation: f64,
    /// AOS further away than this is slept through in one go.
    pub min_sleep: Duration,
    /// Retry interval when no AOS or LOS can be predicted.
    pub fallback_poll: Duration,
    /// Longest nap while waiting for an imminent AOS.
    pub near_poll: Duration,
    pub output_dir: PathBuf,
    pub extension: String,
    pub pass_log: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            min_elevation: 0.0,
            min_sleep: Duration::from_secs(60),
            fallback_poll: Duration::from_secs(30 * 60),
            near_poll: Duration::from_secs(1),
            output_dir: PathBuf::from("captures"),
            extension: "wav".to_string(),
            pass_log: true,
        }
    }
}

pub struct CaptureSession {
    pub target: PathBuf,
    pub started_at: DateTime<Utc>,
    capture: Option<Box<dyn ActiveCapture>>,
    pass_log: PassLog,
}

impl CaptureSession {
    /// False when the capture command failed to start for this pass.
    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }
}

pub enum WatchState {
    Idle,
    Capturing(CaptureSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SleepReason {
    UntilAos,
    NearAos,
    UntilLos,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    CaptureStarted { target: PathBuf, recording: bool },
    CaptureStopped,
    Slept { reason: SleepReason, duration: Duration },
}

/// Watches one satellite and keeps a capture running while it is above the
/// elevation threshold.
pub struct Runner<C: Clock, L: CaptureLauncher> {
    observer: Observer,
    elements: OrbitalElements,
    settings: WatchSettings,
    clock: C,
    launcher: L,
    state: WatchState,
}

impl<C: Clock, L: CaptureLauncher> Runner<C, L> {
    pub fn new(
        observer: Observer,
        elements: OrbitalElements,
        settings: WatchSettings,
        clock: C,
        launcher: L,
    ) -> Self {
        if !aos_happens(&elements, &observer) {
            log::warn!(
                "{} never rises above the horizon at {:.4}, {:.4}",
                elements.display_name(),
                observer.latitude_deg(),
                observer.longitude_deg()
            );
        }
        Self {
            observer,
            elements,
            settings,
            clock,
            launcher,
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, WatchState::Capturing(_))
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    /// Step until `shutdown` is triggered, then stop any running capture.
    pub fn run(&mut self, shutdown: &Shutdown) {
        log::info!(
            "Watching {} from {:.4}, {:.4}, min elevation {:.1} deg",
            self.elements.display_name(),
            self.observer.latitude_deg(),
            self.observer.longitude_deg(),
            self.settings.min_elevation.to_degrees()
        );
        while !shutdown.is_triggered() {
            if let StepOutcome::Slept { reason, duration } = self.step() {
                log::debug!("Woke up after {:?} ({})", duration, reason);
            }
        }
        log::info!("Shutting down");
        self.finish();
    }

    /// Leave the capturing state, stopping the capture if one is running.
    pub fn finish(&mut self) -> Option<StepOutcome> {
        if self.is_capturing() {
            Some(self.stop_capture())
        } else {
            None
        }
    }

    /// One iteration of the watch loop. Reads the clock once, acts on the
    /// visibility at that instant and returns after at most one sleep.
    pub fn step(&mut self) -> StepOutcome {
        let now = self.clock.now();
        let jd = JulianDate::from(now);
        let visible = is_visible(
            &self.observer,
            &self.elements,
            jd,
            self.settings.min_elevation,
        );

        match (self.is_capturing(), visible) {
            (false, true) => self.start_capture(now, jd),
            (false, false) => self.wait_for_aos(jd),
            (true, true) => self.wait_for_los(jd),
            (true, false) => self.stop_capture(),
        }
    }

    fn capture_target(&self, now: DateTime<Utc>) -> PathBuf {
        self.settings.output_dir.join(format!(
            "{}_{}.{}",
            self.elements.norad_id(),
            now.format("%Y%m%dT%H%M%SZ"),
            self.settings.extension
        ))
    }

    fn start_capture(&mut self, now: DateTime<Utc>, jd: JulianDate) -> StepOutcome {
        log::info!(
            "{} is up ({:.1} deg), starting capture",
            self.elements.display_name(),
            elevation_at(&self.observer, &self.elements, jd).to_degrees()
        );

        let target = self.capture_target(now);
        let mut pass_log = PassLog::new(
            self.elements.display_name(),
            self.elements.norad_id(),
            target.clone(),
            self.settings.min_elevation.to_degrees(),
            now,
        );
        pass_log.predicted_los = next_los(
            &self.observer,
            &self.elements,
            jd,
            self.settings.min_elevation,
        )
        .and_then(JulianDate::to_datetime);

        let capture = match self.launcher.start_capture(&target) {
            Ok(capture) => Some(capture),
            Err(e) => {
                log::error!("Failed to start capture: {}", e);
                pass_log.capture_error = Some(e.to_string());
                None
            }
        };
        self.write_pass_log(&pass_log);

        let recording = capture.is_some();
        self.state = WatchState::Capturing(CaptureSession {
            target: target.clone(),
            started_at: now,
            capture,
            pass_log,
        });

        StepOutcome::CaptureStarted { target, recording }
    }

    fn stop_capture(&mut self) -> StepOutcome {
        if let WatchState::Capturing(mut session) =
            std::mem::replace(&mut self.state, WatchState::Idle)
        {
            log::info!("Stopping capture of {}", self.elements.display_name());
            if let Some(capture) = session.capture.take() {
                capture.stop();
            }
            session.pass_log.stopped_at = Some(self.clock.now());
            self.write_pass_log(&session.pass_log);
        }
        StepOutcome::CaptureStopped
    }

    fn wait_for_aos(&mut self, jd: JulianDate) -> StepOutcome {
        let Some(aos) = next_aos(
            &self.observer,
            &self.elements,
            jd,
            self.settings.min_elevation,
        ) else {
            log::warn!(
                "No pass of {} within {:.1} days, checking again in {}",
                self.elements.display_name(),
                search_horizon_days(&self.elements),
                humantime::format_duration(self.settings.fallback_poll)
            );
            return self.sleep(SleepReason::Fallback, self.settings.fallback_poll);
        };

        let wait = duration_from_secs(aos.seconds_since(jd));
        if wait > self.settings.min_sleep {
            log::info!(
                "Sleeping for {:.2} hours until next AOS at {}",
                hours(wait),
                aos
            );
            self.sleep(SleepReason::UntilAos, wait)
        } else {
            let nap = wait.min(self.settings.near_poll).max(MIN_NAP);
            log::debug!("AOS at {} is close, napping {:?}", aos, nap);
            self.sleep(SleepReason::NearAos, nap)
        }
    }

    fn wait_for_los(&mut self, jd: JulianDate) -> StepOutcome {
        let Some(los) = next_los(
            &self.observer,
            &self.elements,
            jd,
            self.settings.min_elevation,
        ) else {
            log::warn!(
                "No LOS for {} within {:.1} days, checking again in {}",
                self.elements.display_name(),
                search_horizon_days(&self.elements),
                humantime::format_duration(self.settings.fallback_poll)
            );
            return self.sleep(SleepReason::Fallback, self.settings.fallback_poll);
        };

        let wait = duration_from_secs(los.seconds_since(jd)).max(MIN_NAP);
        log::info!(
            "Sleeping for {:.2} hours until LOS at {}",
            hours(wait),
            los
        );
        self.sleep(SleepReason::UntilLos, wait)
    }

    fn sleep(&self, reason: SleepReason, duration: Duration) -> StepOutcome {
        self.clock.sleep(duration);
        StepOutcome::Slept { reason, duration }
    }

    fn write_pass_log(&self, pass_log: &PassLog) {
        if !self.settings.pass_log {
            return;
        }
        if let Err(e) = pass_log.save() {
            log::warn!(
                "Failed to write pass log {}: {}",
                pass_log.path().display(),
                e
            );
        }
    }
}

/// Negative and NaN intervals become zero.
fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

fn hours(duration: Duration) -> f64 {
    duration.as_secs_f64() / 3600.0
}
