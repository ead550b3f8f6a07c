use tracing::{debug, info, warn};

use crate::api::DetectorApi;
use crate::types::anomaly::AnomalyEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedPhase {
    Loading,
    Error(String),
    Ready(Vec<AnomalyEvent>),
}

/// The anomaly feed for one page mount. Fetched once; Ready and Error are terminal.
#[derive(Debug)]
pub struct FeedStore {
    phase: FeedPhase,
}

impl FeedStore {
    pub fn new() -> Self {
        Self {
            phase: FeedPhase::Loading,
        }
    }

    pub fn phase(&self) -> &FeedPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Loading
    }

    /// Ready items in server order, or an empty slice.
    pub fn items(&self) -> &[AnomalyEvent] {
        match &self.phase {
            FeedPhase::Ready(items) => items,
            _ => &[],
        }
    }

    /// Issue the single retrieval for this mount. Later calls are no-ops.
    pub async fn load<A: DetectorApi>(&mut self, api: &A) -> &FeedPhase {
        if !self.is_loading() {
            debug!("Anomaly feed already settled, skipping fetch");
            return &self.phase;
        }
        self.phase = match api.anomalies().await {
            Ok(items) => {
                info!(count = items.len(), "Loaded anomaly feed");
                FeedPhase::Ready(items)
            }
            Err(e) => {
                warn!(error = %e, "Fetching anomalies failed");
                FeedPhase::Error(e.to_string())
            }
        };
        &self.phase
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{event, FakeApi};
    use std::sync::atomic::Ordering;

    #[test]
    fn new_store_is_loading() {
        let store = FeedStore::new();
        assert!(store.is_loading());
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn load_keeps_server_order() {
        let api = FakeApi::with_anomalies(vec![
            event("t1", "Botnet", 0.92),
            event("t2", "Benign", 0.10),
        ]);
        let mut store = FeedStore::new();
        store.load(&api).await;

        let labels: Vec<&str> = store.items().iter().map(|e| e.timestamp.as_str()).collect();
        assert_eq!(labels, vec!["t1", "t2"]);
        assert_eq!(store.items()[0].label, "Botnet");
    }

    #[tokio::test]
    async fn http_failure_becomes_error_message() {
        let api = FakeApi::with_anomaly_status(500);
        let mut store = FeedStore::new();
        let phase = store.load(&api).await.clone();

        assert_eq!(phase, FeedPhase::Error("HTTP 500".to_string()));
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn second_load_does_not_refetch() {
        let api = FakeApi::with_anomaly_status(503);
        let mut store = FeedStore::new();
        store.load(&api).await;
        store.load(&api).await;

        assert_eq!(api.anomaly_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(store.phase(), &FeedPhase::Error("HTTP 503".to_string()));
    }

    #[tokio::test]
    async fn empty_feed_is_ready() {
        let api = FakeApi::with_anomalies(Vec::new());
        let mut store = FeedStore::new();
        store.load(&api).await;
        assert_eq!(store.phase(), &FeedPhase::Ready(Vec::new()));
    }
}
