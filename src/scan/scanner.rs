//! The sample / decode / cooldown loop.

use super::{Clock, LogSink, ScanResult, ScanState, SystemClock, TickOutcome};
use crate::capture::{CameraError, CameraSource, ConfigError, CooldownMode, FrameBuffer, ScanConfig};
use crate::decode::Decoder;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Cameras report placeholder frames of at most this size until they are live.
pub const MIN_READY_DIMENSION: u32 = 16;

/// Interval between readiness checks while waiting for a camera to start.
const STARTUP_POLL: Duration = Duration::from_millis(10);

/// Fatal scan loop errors.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The camera reported no devices.
    #[error("no camera device available")]
    NoCamera,
    /// The camera did not become ready before the startup timeout.
    #[error("camera did not start within {0:?}")]
    StartTimeout(Duration),
    /// The camera failed to enumerate or play.
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    /// The scan configuration is out of range.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Lifetime counters for diagnostics and metrics. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Ticks in Sampling with no new frame.
    pub idle_ticks: u64,
    /// Frames submitted to the decoder.
    pub decode_attempts: u64,
    /// Ticks that produced a scan result.
    pub scans: u64,
    /// Decoder failures.
    pub decode_errors: u64,
    /// Frames that could not be copied from the camera.
    pub frame_errors: u64,
    /// Frame buffer reallocations.
    pub buffer_resizes: u64,
}

type Observer = Box<dyn FnMut(&ScanResult)>;

/// Polls a camera, decodes new frames and enforces a cooldown after each scan.
///
/// Driven by an external scheduler through [`start`](ScanLoop::start),
/// [`tick`](ScanLoop::tick) and [`stop`](ScanLoop::stop). No call blocks
/// except the bounded wait in `start` for a camera to come up.
pub struct ScanLoop<C, D, L> {
    camera: C,
    decoder: D,
    log: L,
    config: ScanConfig,
    clock: Box<dyn Clock>,
    observers: Vec<Observer>,
    buffer: FrameBuffer,
    state: ScanState,
    result: Option<ScanResult>,
    cooldown_until: Option<Instant>,
    /// Set while the camera is stopped for cooldown.
    camera_paused: bool,
    session_attempts: u64,
    stats: ScanStats,
}

impl<C, D, L> ScanLoop<C, D, L>
where
    C: CameraSource,
    D: Decoder,
    L: LogSink,
{
    /// Creates an idle loop. The configuration is validated here.
    pub fn new(camera: C, decoder: D, log: L, config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let buffer = FrameBuffer::new(camera.pixel_format());
        Ok(Self {
            camera,
            decoder,
            log,
            config,
            clock: Box::new(SystemClock),
            observers: Vec::new(),
            buffer,
            state: ScanState::Idle,
            result: None,
            cooldown_until: None,
            camera_paused: false,
            session_attempts: 0,
            stats: ScanStats::default(),
        })
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Registers a callback run after every successful scan.
    pub fn on_success(&mut self, observer: impl FnMut(&ScanResult) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Starts scanning. A no-op if already running with a live camera.
    ///
    /// Fails if no camera device exists or the camera does not start within
    /// the configured timeout. Nothing is retried. A loop whose camera died
    /// while running is restarted from scratch.
    pub fn start(&mut self) -> Result<(), ScanError> {
        if self.state.is_running() && (self.camera.is_playing() || self.camera_paused) {
            tracing::debug!(state = %self.state, "Scan loop already running");
            return Ok(());
        }

        if !self.camera.is_playing() {
            let devices = self.camera.devices()?;
            if devices.is_empty() {
                tracing::error!("No camera device found");
                return Err(ScanError::NoCamera);
            }
            self.camera.play()?;
            self.await_camera()?;
        }

        self.result = None;
        self.cooldown_until = None;
        self.camera_paused = false;
        self.state = ScanState::Sampling;
        tracing::info!(
            width = self.camera.width(),
            height = self.camera.height(),
            cooldown_secs = self.config.cooldown_secs,
            "Scan loop started"
        );
        Ok(())
    }

    fn await_camera(&mut self) -> Result<(), ScanError> {
        let timeout = self.config.startup_timeout();
        let deadline = self.clock.now() + timeout;
        loop {
            if self.camera_ready() {
                return Ok(());
            }
            if self.clock.now() >= deadline {
                tracing::error!(?timeout, "Camera failed to start");
                self.camera.stop();
                return Err(ScanError::StartTimeout(timeout));
            }
            self.clock.sleep(STARTUP_POLL);
        }
    }

    fn camera_ready(&self) -> bool {
        self.camera.is_playing()
            && self.camera.width() > MIN_READY_DIMENSION
            && self.camera.height() > MIN_READY_DIMENSION
    }

    /// Stops scanning and clears any pending result.
    ///
    /// The camera is left playing, so a later `start` resumes immediately.
    /// If the camera cannot be resumed, the next `start` plays it again.
    pub fn stop(&mut self) {
        if !self.state.is_running() {
            return;
        }
        if self.camera_paused && !self.resume_camera() {
            tracing::warn!("Scan loop stopped with the camera still paused");
        }
        self.result = None;
        self.cooldown_until = None;
        self.state = ScanState::Idle;
        tracing::info!("Scan loop stopped");
    }

    /// Runs one polling step.
    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            ScanState::Idle => TickOutcome::Idle,
            ScanState::Cooldown => self.tick_cooldown(),
            ScanState::Sampling => self.tick_sampling(),
        }
    }

    fn tick_cooldown(&mut self) -> TickOutcome {
        if let Some(until) = self.cooldown_until {
            if self.clock.now() < until {
                return TickOutcome::CoolingDown;
            }
        }
        // Stay in cooldown until the camera is back; retried every tick.
        if self.camera_paused && !self.resume_camera() {
            return TickOutcome::ResumeFailed;
        }
        self.result = None;
        self.cooldown_until = None;
        self.state = ScanState::Sampling;
        tracing::debug!("Cooldown elapsed, sampling resumed");
        TickOutcome::Resumed
    }

    fn tick_sampling(&mut self) -> TickOutcome {
        if !self.camera.did_update() {
            self.stats.idle_ticks += 1;
            return TickOutcome::NoFrame;
        }

        // Resolution can change between any two ticks (e.g. after a device switch).
        let (width, height) = (self.camera.width(), self.camera.height());
        if self.buffer.resize_to(width, height) {
            self.stats.buffer_resizes += 1;
        }

        if let Err(e) = self.camera.read_frame(&mut self.buffer) {
            self.stats.frame_errors += 1;
            tracing::warn!(error = %e, "Failed to read camera frame");
            return TickOutcome::NoResult;
        }

        self.session_attempts += 1;
        self.stats.decode_attempts += 1;

        let decoded = self
            .decoder
            .decode(self.buffer.pixels(), width, height, self.buffer.format());

        match decoded {
            Ok(Some(text)) if !text.is_empty() => {
                let result = ScanResult::now(text);
                self.record(&result);
                TickOutcome::Decoded(result)
            }
            Ok(_) => {
                tracing::trace!(attempt = self.session_attempts, "No code in frame");
                TickOutcome::NoResult
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                tracing::debug!(error = %e, attempt = self.session_attempts, "Decode failed");
                TickOutcome::NoResult
            }
        }
    }

    fn record(&mut self, result: &ScanResult) {
        self.stats.scans += 1;
        tracing::info!(text = %result.text, attempt = self.session_attempts, "QR code scanned");

        self.log.append(result);
        for observer in &mut self.observers {
            observer(result);
        }
        self.result = Some(result.clone());

        if self.config.cooldown_mode == CooldownMode::PauseCamera {
            self.camera.stop();
            self.camera_paused = true;
        }
        self.cooldown_until = Some(self.clock.now() + self.config.cooldown());
        self.state = ScanState::Cooldown;
    }

    /// Plays the paused camera. `camera_paused` stays set on failure.
    fn resume_camera(&mut self) -> bool {
        match self.camera.play() {
            Ok(()) => {
                self.camera_paused = false;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resume camera after cooldown");
                false
            }
        }
    }

    /// Clears the log sink and resets the session attempt counter.
    pub fn clear_log(&mut self) {
        self.log.clear();
        self.session_attempts = 0;
        tracing::info!("Scan log cleared");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// The most recent scan, held until its cooldown elapses.
    pub fn scan_result(&self) -> Option<&ScanResult> {
        self.result.as_ref()
    }

    /// Time left in the current cooldown, if any.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(self.clock.now()))
    }

    /// Decode attempts since the log was last cleared.
    pub fn session_attempts(&self) -> u64 {
        self.session_attempts
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// The validated scan configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The reused frame buffer. Empty until the first frame is sampled.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// The camera being polled.
    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Mutable access to the camera, e.g. to switch devices.
    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    /// The scan log sink.
    pub fn log(&self) -> &L {
        &self.log
    }
}
