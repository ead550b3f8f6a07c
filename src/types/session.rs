use std::collections::HashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStatus {
    #[default]
    Stopped,
    Running,
}

/// Latest classification reported by the detector. Replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub probabilities: HashMap<String, f64>,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, probability: f64) -> Self {
        Self {
            label: label.into(),
            probability,
            timestamp: None,
            probabilities: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorSession {
    pub status: DetectorStatus,
    pub last_result: Option<ClassificationResult>,
}

impl DetectorSession {
    pub fn is_running(&self) -> bool {
        self.status == DetectorStatus::Running
    }
}
