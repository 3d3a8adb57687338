//! Capture session - the hot path
//!
//! One owned session instance holds the run/stopped state, the active
//! monitor selection, and the handle of the periodic pump. Commands mutate
//! session state under a single lock; the pump is the only actor that reads
//! from the frame source, and every source call is serialized through the
//! source lock so a monitor switch can never land mid-capture.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use frame_source::{FrameSource, MonitorInfo};

use crate::delivery::{self, DeliveryReceiver, DeliverySender};
use crate::error::{SessionError, SessionResult};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target pump rate in frames per second
    pub frame_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { frame_rate: 30 }
    }
}

/// Run state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Stopped,
    Running,
}

/// Session statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Frames pushed to the delivery channel
    pub frames_emitted: u64,
    /// Frames discarded by the channel because the consumer lagged
    pub frames_dropped: u64,
    /// Capture attempts that failed and were skipped
    pub capture_failures: u64,
}

/// Ownership of the active pump task. Present if and only if the session
/// is running; at most one pump exists at a time.
struct PumpHandle {
    task: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

/// Mutable session state, all behind one lock
struct State {
    status: SessionStatus,
    active_monitor: Option<usize>,
    monitors: Vec<MonitorInfo>,
    monitors_sent: bool,
    pump: Option<PumpHandle>,
}

struct Inner {
    config: SessionConfig,
    state: Mutex<State>,
    source: Mutex<Box<dyn FrameSource>>,
    output: DeliverySender,
    pump_wake: Notify,
    sequence: AtomicU64,
    last_timestamp_ms: AtomicU64,
    frames_emitted: AtomicU64,
    capture_failures: AtomicU64,
}

/// The capture session state machine
pub struct CaptureSession {
    inner: Arc<Inner>,
}

impl CaptureSession {
    /// Create a session over `source`, returning the receiving half of the
    /// delivery channel. Must be created inside a tokio runtime; `start`
    /// spawns the pump on it.
    pub fn new(
        source: Box<dyn FrameSource>,
        config: SessionConfig,
    ) -> (Self, DeliveryReceiver) {
        let (output, receiver) = delivery::channel();
        let inner = Arc::new(Inner {
            config,
            state: Mutex::new(State {
                status: SessionStatus::Stopped,
                active_monitor: None,
                monitors: Vec::new(),
                monitors_sent: false,
                pump: None,
            }),
            source: Mutex::new(source),
            output,
            pump_wake: Notify::new(),
            sequence: AtomicU64::new(0),
            last_timestamp_ms: AtomicU64::new(0),
            frames_emitted: AtomicU64::new(0),
            capture_failures: AtomicU64::new(0),
        });
        (Self { inner }, receiver)
    }

    /// Current run state
    pub fn status(&self) -> SessionStatus {
        self.inner.state.lock().status
    }

    /// Currently targeted monitor, if one has been selected
    pub fn active_monitor(&self) -> Option<usize> {
        self.inner.state.lock().active_monitor
    }

    /// Monitors from the most recent enumeration
    pub fn monitors(&self) -> Vec<MonitorInfo> {
        self.inner.state.lock().monitors.clone()
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            frames_emitted: self.inner.frames_emitted.load(Ordering::Relaxed),
            frames_dropped: self.inner.output.dropped_frames(),
            capture_failures: self.inner.capture_failures.load(Ordering::Relaxed),
        }
    }

    /// Start the pump.
    ///
    /// On first readiness this enumerates monitors, defaults the target to
    /// the first one, and publishes the monitor list before any frame.
    /// Idempotent: a second `start` while running neither spawns a second
    /// pump nor resets timing.
    pub fn start(&self) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        if state.status == SessionStatus::Running {
            debug!("start ignored: session already running");
            return Ok(());
        }

        if !state.monitors_sent {
            // A pre-start switch may already have enumerated; reuse that
            // set so the accepted target stays valid against the list the
            // consumer receives.
            if state.monitors.is_empty() {
                state.monitors = self.inner.source.lock().list_monitors()?;
            }
            if state.monitors.is_empty() {
                return Err(SessionError::NoMonitors);
            }
            if state.active_monitor.is_none() {
                let first = state.monitors[0].index;
                self.inner.source.lock().set_active_monitor(first)?;
                state.active_monitor = Some(first);
            }
            self.inner.output.send_monitors(state.monitors.clone());
            state.monitors_sent = true;
        }

        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(pump(self.inner.clone(), running.clone()));
        state.pump = Some(PumpHandle { task, running });
        state.status = SessionStatus::Running;
        info!(monitor = ?state.active_monitor, fps = self.inner.config.frame_rate, "capture session started");
        Ok(())
    }

    /// Stop the pump and wait for it to wind down.
    ///
    /// No frame is emitted after this returns. No-op when already stopped.
    pub async fn stop(&self) {
        let handle = {
            let mut state = self.inner.state.lock();
            if state.status != SessionStatus::Running {
                debug!("stop ignored: session not running");
                return;
            }
            state.status = SessionStatus::Stopped;
            state.pump.take()
        };

        if let Some(PumpHandle { task, running }) = handle {
            running.store(false, Ordering::SeqCst);
            self.inner.pump_wake.notify_waiters();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("pump task join failed: {e}");
                }
            }
        }
        info!("capture session stopped");
    }

    /// Retarget capture to `index` from the last enumeration.
    ///
    /// Valid whether running or stopped. The switch blocks until any
    /// in-flight capture releases the source, so it applies before the next
    /// capture begins, never mid-frame. An out-of-range index fails with
    /// `InvalidMonitor` and leaves the target unchanged.
    pub fn switch_monitor(&self, index: usize) -> SessionResult<()> {
        let mut state = self.inner.state.lock();
        if state.monitors.is_empty() {
            state.monitors = self.inner.source.lock().list_monitors()?;
        }
        if !state.monitors.iter().any(|m| m.index == index) {
            return Err(SessionError::InvalidMonitor(index));
        }

        self.inner.source.lock().set_active_monitor(index)?;
        state.active_monitor = Some(index);
        info!(monitor = index, "capture target switched");
        Ok(())
    }

    /// Re-enumerate monitors, invalidating indices from earlier
    /// enumerations. The active target is left as-is even if it is no
    /// longer present; captures from a vanished monitor fail per tick until
    /// the caller switches explicitly.
    pub fn refresh_monitors(&self) -> SessionResult<Vec<MonitorInfo>> {
        let mut state = self.inner.state.lock();
        let monitors = self.inner.source.lock().list_monitors()?;
        state.monitors = monitors.clone();
        Ok(monitors)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Same cancellation path as stop(), minus the await.
        if let Some(PumpHandle { task, running }) = self.inner.state.lock().pump.take() {
            running.store(false, Ordering::SeqCst);
            task.abort();
        }
    }
}

/// The periodic pump: one capture-and-deliver cycle per tick.
///
/// Ticks are start-to-start at the configured rate; an overrun fires the
/// next tick immediately and never queues a second concurrent cycle.
async fn pump(inner: Arc<Inner>, running: Arc<AtomicBool>) {
    info!(fps = inner.config.frame_rate, "capture pump started");

    let period = Duration::from_secs_f64(1.0 / inner.config.frame_rate.max(1) as f64);
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = inner.pump_wake.notified() => {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                continue;
            }
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        // Fetch the target inside the critical section; skip the tick if
        // none has been selected yet.
        if inner.state.lock().active_monitor.is_none() {
            continue;
        }

        // The source lock serializes this capture against monitor switches.
        let captured = {
            let shared = inner.clone();
            tokio::task::spawn_blocking(move || shared.source.lock().capture_frame()).await
        };

        match captured {
            Ok(Ok(mut frame)) => {
                let now_ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                let prev = inner.last_timestamp_ms.fetch_max(now_ms, Ordering::Relaxed);
                frame.timestamp_ms = now_ms.max(prev);
                frame.sequence = inner.sequence.fetch_add(1, Ordering::Relaxed);

                // A stop that landed during the capture discards its frame.
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                inner.output.send_frame(frame);
                inner.frames_emitted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                // A single failed capture never stops the session.
                inner.capture_failures.fetch_add(1, Ordering::Relaxed);
                warn!("frame capture failed, skipping tick: {e}");
            }
            Err(e) => {
                if e.is_cancelled() {
                    break;
                }
                inner.capture_failures.fetch_add(1, Ordering::Relaxed);
                warn!("capture task failed, skipping tick: {e}");
            }
        }
    }

    info!("capture pump stopped");
}
