//! In-memory `DetectorApi` for controller tests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::api::{ApiError, DetectorApi};
use crate::types::anomaly::AnomalyEvent;
use crate::types::session::ClassificationResult;

pub struct FakeApi {
    pub start_fails: AtomicBool,
    pub start_hangs: AtomicBool,
    pub stop_fails: AtomicBool,
    pub latest_fails: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub polls: AtomicUsize,
    pub anomaly_fetches: AtomicUsize,
    result: Mutex<ClassificationResult>,
    anomalies: Mutex<Result<Vec<AnomalyEvent>, u16>>,
    gate: Option<Notify>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            start_fails: AtomicBool::new(false),
            start_hangs: AtomicBool::new(false),
            stop_fails: AtomicBool::new(false),
            latest_fails: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            anomaly_fetches: AtomicUsize::new(0),
            result: Mutex::new(ClassificationResult::new("Worm", 0.77)),
            anomalies: Mutex::new(Ok(Vec::new())),
            gate: None,
        }
    }
}

impl FakeApi {
    /// A fake whose `latest` blocks until [`FakeApi::release`] is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn with_anomalies(events: Vec<AnomalyEvent>) -> Self {
        let api = Self::default();
        *api.anomalies.lock().unwrap() = Ok(events);
        api
    }

    pub fn with_anomaly_status(code: u16) -> Self {
        let api = Self::default();
        *api.anomalies.lock().unwrap() = Err(code);
        api
    }

    pub fn set_result(&self, result: ClassificationResult) {
        *self.result.lock().unwrap() = result;
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_waiters();
        }
    }
}

impl DetectorApi for FakeApi {
    fn start(&self) -> impl Future<Output = Result<(), ApiError>> + Send {
        async move {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.start_hangs.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.start_fails.load(Ordering::SeqCst) {
                Err(ApiError::Status(400))
            } else {
                Ok(())
            }
        }
    }

    fn stop(&self) -> impl Future<Output = Result<(), ApiError>> + Send {
        async move {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if self.stop_fails.load(Ordering::SeqCst) {
                Err(ApiError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn latest(&self) -> impl Future<Output = Result<ClassificationResult, ApiError>> + Send {
        async move {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.latest_fails.load(Ordering::SeqCst) {
                return Err(ApiError::Status(404));
            }
            Ok(self.result.lock().unwrap().clone())
        }
    }

    fn anomalies(&self) -> impl Future<Output = Result<Vec<AnomalyEvent>, ApiError>> + Send {
        async move {
            self.anomaly_fetches.fetch_add(1, Ordering::SeqCst);
            self.anomalies
                .lock()
                .unwrap()
                .clone()
                .map_err(ApiError::Status)
        }
    }
}

pub fn event(timestamp: &str, label: &str, probability: f64) -> AnomalyEvent {
    serde_json::from_value(serde_json::json!({
        "timestamp": timestamp,
        "label": label,
        "probability": probability,
        "features": {
            "Packet Size": 1514.0,
            "Inter-Arrival Time": 0.02,
            "Known IoC": 0,
            "C&C Communication": 1,
            "Protocol Type (one-hot)": [0, 1, 0]
        }
    }))
    .unwrap()
}
