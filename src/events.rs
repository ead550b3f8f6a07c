use serde::Serialize;
use tokio::sync::broadcast;

/// Event names as constants. The shell re-renders on any of these.
pub mod event_names {
    pub const DETECTOR_STARTED: &str = "detector:started";
    pub const DETECTOR_STOPPED: &str = "detector:stopped";
    pub const DETECTOR_RESULT: &str = "detector:result";
    pub const DETECTOR_START_FAILED: &str = "detector:start-failed";
    pub const DISCLOSURE_CHANGED: &str = "disclosure:changed";
}

const BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct UiEvent {
    pub name: &'static str,
    pub payload: serde_json::Value,
}

/// Fan-out of UI events from controllers to whoever renders them.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish `payload` under `event`. Having no subscribers is not an error.
pub fn emit_event<T: Serialize>(bus: &EventBus, event: &'static str, payload: T) -> Result<(), String> {
    let payload = serde_json::to_value(payload).map_err(|e| e.to_string())?;
    let _ = bus.tx.send(UiEvent {
        name: event,
        payload,
    });
    Ok(())
}
