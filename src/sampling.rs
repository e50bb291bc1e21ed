//! # Sampling Loop Module
//!
//! The long-running logger: on a fixed cadence it pulls readings from the
//! provider, composes a telemetry record and appends it to the active CSV
//! session. It runs on its own worker thread and does not depend on any view
//! being attached.
//!
//! ## States
//! ```text
//! Idle --start()--> Running --stop()--> Idle
//! ```
//! - `start()` while running and `stop()` while idle are no-ops
//! - every activation opens a new session file
//! - I/O failures are logged per tick; the loop keeps going
//!
//! ## Threading
//! - One worker thread owns the session and the throughput counters, so ticks
//!   never overlap
//! - Commands reach the worker over a crossbeam channel; the cadence is a
//!   crossbeam ticker selected alongside it
//! - `is_running()` reads an atomic flag and is safe from any thread
//! - Each activation has an epoch; a tick only writes when its epoch is still
//!   current, so a stop request takes effect before the next tick

use crate::csv_sink::{LogSession, SessionSource};
use crate::keep_alive::KeepAlive;
use crate::metrics::{MetricsComposer, RadioCapabilities};
use crate::provider::RadioProvider;
use crate::throughput::ThroughputTracker;
use chrono::Local;
use crossbeam_channel::{never, select, tick, unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Default time between ticks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub interval: Duration,
    pub capabilities: RadioCapabilities,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            capabilities: RadioCapabilities::default(),
        }
    }
}

/// Command sent from the controlling thread to the worker
enum LoopCommand {
    /// Begin ticking into `session` (None when the file could not be opened)
    Start {
        epoch: u64,
        session: Option<LogSession>,
    },
    /// Stop ticking and close the session
    Stop,
    /// Exit the worker thread
    Shutdown,
}

/// What woke the worker up
enum Event {
    Command(Option<LoopCommand>),
    Tick,
}

/// State readable from outside the worker
#[derive(Default)]
struct Shared {
    running: AtomicBool,
    epoch: AtomicU64,
    ticks: AtomicU64,
    rows_written: AtomicU64,
    session_path: Mutex<Option<PathBuf>>,
}

impl Shared {
    fn is_current(&self, epoch: u64) -> bool {
        self.running.load(Ordering::Acquire) && self.epoch.load(Ordering::Acquire) == epoch
    }

    fn session_path(&self) -> MutexGuard<'_, Option<PathBuf>> {
        self.session_path.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Everything the worker owns for one activation
struct Activation {
    epoch: u64,
    session: Option<LogSession>,
    tracker: ThroughputTracker,
    permission_warned: bool,
}

/// Background logger with start/stop control
pub struct SamplingLoop {
    command_tx: Sender<LoopCommand>,
    worker: Option<thread::JoinHandle<()>>,
    shared: Arc<Shared>,
    sink: Arc<dyn SessionSource>,
    keep_alive: Arc<dyn KeepAlive>,
    /// Serializes start/stop transitions
    control: Mutex<()>,
}

impl SamplingLoop {
    /// Spawn the worker thread; the loop starts out idle
    pub fn spawn(
        provider: Arc<dyn RadioProvider>,
        sink: Arc<dyn SessionSource>,
        keep_alive: Arc<dyn KeepAlive>,
        settings: LoopSettings,
    ) -> Self {
        let (command_tx, command_rx) = unbounded();
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();
        let composer = MetricsComposer::new(settings.capabilities);

        let worker = thread::Builder::new()
            .name("sampling-loop".to_string())
            .spawn(move || {
                Self::worker_loop(command_rx, worker_shared, provider, composer, settings.interval);
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to spawn sampling thread: {}", e);
                None
            }
        };

        SamplingLoop {
            command_tx,
            worker,
            shared,
            sink,
            keep_alive,
            control: Mutex::new(()),
        }
    }

    fn lock_control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new logging session. Returns false if already running.
    pub fn start(&self) -> bool {
        let _guard = self.lock_control();
        if self.shared.running.load(Ordering::Acquire) {
            log::debug!("Sampling loop already running, start ignored");
            return false;
        }
        if self.worker.is_none() {
            log::error!("Sampling thread is not available, start ignored");
            return false;
        }

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let session = match self.sink.open_session(Local::now()) {
            Ok(session) => Some(session),
            Err(e) => {
                log::error!("{}; sampling continues without a log file", e);
                None
            }
        };
        let path = session.as_ref().map(|s| s.path().to_path_buf());

        self.shared.rows_written.store(0, Ordering::Release);
        *self.shared.session_path() = path.clone();
        self.shared.running.store(true, Ordering::Release);

        if let Err(e) = self.command_tx.send(LoopCommand::Start { epoch, session }) {
            log::error!("Failed to send start command: {}", e);
            self.shared.running.store(false, Ordering::Release);
            *self.shared.session_path() = None;
            return false;
        }

        self.keep_alive.acquire(path.as_deref());
        log::info!("Sampling loop started");
        true
    }

    /// Stop the active session. Returns false if already idle.
    pub fn stop(&self) -> bool {
        let _guard = self.lock_control();
        if !self.shared.running.load(Ordering::Acquire) {
            log::debug!("Sampling loop not running, stop ignored");
            return false;
        }

        self.shared.running.store(false, Ordering::Release);
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        *self.shared.session_path() = None;

        if let Err(e) = self.command_tx.send(LoopCommand::Stop) {
            log::error!("Failed to send stop command: {}", e);
        }

        self.keep_alive.release();
        log::info!("Sampling loop stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// File of the running session, if it could be opened
    pub fn session_path(&self) -> Option<PathBuf> {
        self.shared.session_path().clone()
    }

    /// Rows appended in the current (or last) session
    pub fn rows_written(&self) -> u64 {
        self.shared.rows_written.load(Ordering::Acquire)
    }

    /// Ticks completed since spawn
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    fn worker_loop(
        command_rx: Receiver<LoopCommand>,
        shared: Arc<Shared>,
        provider: Arc<dyn RadioProvider>,
        composer: MetricsComposer,
        interval: Duration,
    ) {
        let mut active: Option<Activation> = None;
        let mut ticker: Receiver<Instant> = never();

        loop {
            let event = select! {
                recv(command_rx) -> command => Event::Command(command.ok()),
                recv(ticker) -> _ => Event::Tick,
            };

            match event {
                Event::Command(Some(LoopCommand::Start { epoch, session })) => {
                    let tracker = ThroughputTracker::new(provider.traffic(), Instant::now());
                    active = Some(Activation {
                        epoch,
                        session,
                        tracker,
                        permission_warned: false,
                    });
                    ticker = tick(interval);
                }
                Event::Command(Some(LoopCommand::Stop)) => {
                    active = None;
                    ticker = never();
                }
                Event::Command(Some(LoopCommand::Shutdown)) | Event::Command(None) => {
                    log::info!("Sampling thread stopped");
                    break;
                }
                Event::Tick => {
                    if let Some(activation) = active.as_mut() {
                        if shared.is_current(activation.epoch) {
                            Self::run_tick(activation, &shared, provider.as_ref(), &composer);
                        }
                    }
                }
            }
        }
    }

    /// Sample once and append the record to the session.
    ///
    /// A record reduced to the permission notice is counted as a tick but not
    /// appended: its two columns would otherwise become the session header.
    /// Append failures are logged and the next tick tries again.
    fn run_tick(
        activation: &mut Activation,
        shared: &Shared,
        provider: &dyn RadioProvider,
        composer: &MetricsComposer,
    ) {
        let sample = activation
            .tracker
            .advance(provider.traffic(), Instant::now());
        let snapshot = provider.snapshot();
        let composition = composer.compose(&snapshot, &sample, Local::now());
        shared.ticks.fetch_add(1, Ordering::AcqRel);

        if composition.record.is_permission_missing() {
            if !activation.permission_warned {
                log::warn!("Location permission missing; rows are not logged until it is granted");
                activation.permission_warned = true;
            }
            return;
        }

        let Some(session) = activation.session.as_mut() else {
            return;
        };
        match session.append(&composition.record.single_line()) {
            Ok(()) => {
                shared.rows_written.fetch_add(1, Ordering::AcqRel);
                log::debug!(
                    "Logged tick: DL {:.2} Mbps, UL {:.2} Mbps, RSRP {:?}",
                    sample.download_mbps(),
                    sample.upload_mbps(),
                    composition.rsrp_sample
                );
            }
            Err(e) => log::warn!("{}", e),
        }
    }
}

impl Drop for SamplingLoop {
    fn drop(&mut self) {
        self.stop();

        let _ = self.command_tx.send(LoopCommand::Shutdown);

        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
