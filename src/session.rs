//! Detector session: the running/stopped lifecycle of the remote detector and the
//! poll loop that tracks its latest classification while it runs.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::DetectorApi;
use crate::events::{emit_event, event_names, EventBus};
use crate::types::session::{ClassificationResult, DetectorSession, DetectorStatus};

struct SessionCell {
    session: DetectorSession,
    /// Bumped every time the poll loop is cancelled. A poll only lands if its
    /// generation is still current.
    generation: u64,
}

fn lock(cell: &Mutex<SessionCell>) -> MutexGuard<'_, SessionCell> {
    cell.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the `DetectorSession` and the single poll loop handle.
///
/// Status changes only through [`SessionController::toggle`]. Dropping the controller
/// cancels the poll loop but does not stop the remote detector.
pub struct SessionController<A: DetectorApi> {
    api: Arc<A>,
    cell: Arc<Mutex<SessionCell>>,
    poll: Option<JoinHandle<()>>,
    poll_interval: Duration,
    bus: EventBus,
}

impl<A: DetectorApi> SessionController<A> {
    pub fn new(api: Arc<A>, poll_interval: Duration, bus: EventBus) -> Self {
        Self {
            api,
            cell: Arc::new(Mutex::new(SessionCell {
                session: DetectorSession::default(),
                generation: 0,
            })),
            poll: None,
            poll_interval,
            bus,
        }
    }

    pub fn status(&self) -> DetectorStatus {
        lock(&self.cell).session.status
    }

    pub fn snapshot(&self) -> DetectorSession {
        lock(&self.cell).session.clone()
    }

    pub fn poll_active(&self) -> bool {
        self.poll.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Start the detector when stopped, stop it when running. Returns the resulting status.
    pub async fn toggle(&mut self) -> DetectorStatus {
        match self.status() {
            DetectorStatus::Stopped => self.start().await,
            DetectorStatus::Running => self.stop().await,
        }
        self.status()
    }

    async fn start(&mut self) {
        info!("Starting detector");
        if let Err(e) = self.api.start().await {
            warn!(error = %e, "Detector start failed, session stays stopped");
            let _ = emit_event(
                &self.bus,
                event_names::DETECTOR_START_FAILED,
                serde_json::json!({ "error": e.to_string() }),
            );
            return;
        }

        self.cancel_poll();
        let generation = {
            let mut cell = lock(&self.cell);
            cell.session.status = DetectorStatus::Running;
            cell.generation
        };
        let _ = emit_event(&self.bus, event_names::DETECTOR_STARTED, self.snapshot());

        info!(interval_ms = self.poll_interval.as_millis() as u64, "Detector running, polling latest result");
        self.poll = Some(tokio::spawn(poll_loop(
            Arc::clone(&self.api),
            Arc::clone(&self.cell),
            generation,
            self.poll_interval,
            self.bus.clone(),
        )));
    }

    async fn stop(&mut self) {
        self.cancel_poll();
        info!("Stopping detector");
        if let Err(e) = self.api.stop().await {
            warn!(error = %e, "Detector stop failed, marking session stopped anyway");
        }
        lock(&self.cell).session.status = DetectorStatus::Stopped;
        let _ = emit_event(&self.bus, event_names::DETECTOR_STOPPED, self.snapshot());
    }

    /// Invalidate the current poll generation, then abort the loop task.
    fn cancel_poll(&mut self) {
        lock(&self.cell).generation += 1;
        if let Some(handle) = self.poll.take() {
            handle.abort();
            debug!("Poll loop cancelled");
        }
    }

    /// Cancel the poll loop. Called automatically on drop.
    pub fn dispose(&mut self) {
        self.cancel_poll();
    }
}

impl<A: DetectorApi> Drop for SessionController<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One immediate fetch, then one per interval. Fetches never overlap: a slow request
/// pushes the next tick back instead of stacking requests.
async fn poll_loop<A: DetectorApi>(
    api: Arc<A>,
    cell: Arc<Mutex<SessionCell>>,
    generation: u64,
    interval: Duration,
    bus: EventBus,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match api.latest().await {
            Ok(result) => {
                if !apply_result(&cell, generation, result, &bus) {
                    debug!(generation, "Poll loop superseded, exiting");
                    return;
                }
            }
            Err(e) => warn!(error = %e, "Polling latest result failed, keeping previous result"),
        }
    }
}

/// Store `result` if `generation` is still current and the session is running.
fn apply_result(
    cell: &Mutex<SessionCell>,
    generation: u64,
    result: ClassificationResult,
    bus: &EventBus,
) -> bool {
    let mut cell = lock(cell);
    if cell.generation != generation || !cell.session.is_running() {
        return false;
    }
    let _ = emit_event(bus, event_names::DETECTOR_RESULT, &result);
    cell.session.last_result = Some(result);
    true
}
