//! Caller-owned run status and the cooperative stop signal

use crate::state::Phase;
use crate::{HarvestError, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Most recent progress lines kept in the status log
pub const MAX_LOG_LINES: usize = 1000;

/// A one-directional stop flag shared between the caller and the engine
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to stop
    pub fn trip(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns `Err(HarvestError::Stopped)` once the flag has been tripped
    ///
    /// Called at every suspend point so that a stop unwinds to the driver in
    /// one step with `?`.
    pub fn check(&self) -> Result<()> {
        if self.is_tripped() {
            Err(HarvestError::Stopped)
        } else {
            Ok(())
        }
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Shared progress record for one harvest at a time
///
/// The engine writes progress and reads the stop flag; the caller does the
/// opposite. Wrap it in an `Arc` to share it with a background task.
#[derive(Debug, Default)]
pub struct RunStatus {
    running: AtomicBool,
    stop: StopSignal,
    collected: AtomicUsize,
    phase: Mutex<Phase>,
    error: Mutex<Option<String>>,
    log: Mutex<VecDeque<String>>,
}

impl RunStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as active, refusing if another one is in progress
    ///
    /// The stop flag, error and log are reset for the new run. The returned
    /// guard clears the running flag when dropped.
    ///
    /// # Returns
    ///
    /// * `Ok(RunGuard)` - This caller owns the run
    /// * `Err(HarvestError::AlreadyRunning)` - A run is already active
    pub fn try_begin(self: &Arc<Self>) -> Result<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HarvestError::AlreadyRunning);
        }

        self.stop.reset();
        self.collected.store(0, Ordering::Release);
        *lock(&self.error) = None;
        lock(&self.log).clear();
        self.set_phase(Phase::Idle);

        Ok(RunGuard {
            status: Arc::clone(self),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Cooperative cancellation entry point
    pub fn request_stop(&self) {
        self.stop.trip();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_tripped()
    }

    /// A handle to this status' stop flag
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn set_collected(&self, count: usize) {
        self.collected.store(count, Ordering::Release);
    }

    pub fn collected(&self) -> usize {
        self.collected.load(Ordering::Acquire)
    }

    pub fn set_phase(&self, phase: Phase) {
        *lock(&self.phase) = phase;
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    pub fn set_error(&self, message: impl Into<String>) {
        *lock(&self.error) = Some(message.into());
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    /// Emits a progress line and appends it to the status log
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        info!("{}", line);

        let mut log = lock(&self.log);
        if log.len() == MAX_LOG_LINES {
            log.pop_front();
        }
        log.push_back(line);
    }

    /// Snapshot of the status log, oldest line first
    pub fn log_lines(&self) -> Vec<String> {
        lock(&self.log).iter().cloned().collect()
    }
}

/// Holds the "one active run" slot of a `RunStatus`
#[derive(Debug)]
pub struct RunGuard {
    status: Arc<RunStatus>,
}

impl RunGuard {
    pub fn status(&self) -> &Arc<RunStatus> {
        &self.status
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.status.running.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
