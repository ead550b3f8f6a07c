use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

/// A single feature value as stored by the detector. The feature set is open-ended,
/// so values stay dynamic and are interpreted at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Number(f64),
    OneHot(Vec<f64>),
    Text(String),
    Other(serde_json::Value),
}

impl FeatureValue {
    /// Truthiness used for indicator features, which the detector stores as 0/1.
    pub fn is_truthy(&self) -> bool {
        match self {
            FeatureValue::Bool(b) => *b,
            FeatureValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FeatureValue::OneHot(_) => true,
            FeatureValue::Text(s) => !s.is_empty(),
            FeatureValue::Other(v) => !v.is_null(),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Bool(b) => write!(f, "{}", b),
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::OneHot(bits) => {
                write!(f, "[")?;
                for (i, bit) in bits.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", bit)?;
                }
                write!(f, "]")
            }
            FeatureValue::Text(s) => write!(f, "{}", s),
            FeatureValue::Other(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub timestamp: String,
    pub label: String,
    pub probability: f64,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomaly_families: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub anomaly_probs: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub probabilities: BTreeMap<String, f64>,
    /// Capture interface the traffic was sniffed on, when the service records it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

impl AnomalyEvent {
    pub fn feature(&self, key: &str) -> Option<&FeatureValue> {
        self.features.get(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Numeric measurement with an optional unit suffix.
    Measure(Option<&'static str>),
    /// Boolean indicator, stored as 0/1 or true/false.
    Indicator,
    /// One-hot category vector.
    OneHot,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureField {
    pub key: &'static str,
    pub kind: FeatureKind,
}

const fn measure(key: &'static str, unit: Option<&'static str>) -> FeatureField {
    FeatureField {
        key,
        kind: FeatureKind::Measure(unit),
    }
}

/// Engineered features in card order: size/time measures first, then entropy and
/// variance, then indicators and the one-hot categories.
pub const FEATURE_LAYOUT: &[FeatureField] = &[
    measure("Packet Size", Some("B")),
    measure("Packet Length", Some("B")),
    measure("Inter-Arrival Time", Some("s")),
    measure("Flow Duration", Some("s")),
    measure("Total Packets", None),
    measure("Total Bytes", Some("B")),
    measure("Average Packet Size", Some("B")),
    measure("Packet Arrival Rate", Some("pps")),
    measure("Payload Entropy", None),
    measure("Flow Entropy", None),
    measure("Baseline Deviation", None),
    measure("Packet Size Variance", None),
    FeatureField { key: "Known IoC", kind: FeatureKind::Indicator },
    FeatureField { key: "C&C Communication", kind: FeatureKind::Indicator },
    FeatureField { key: "Data Exfiltration", kind: FeatureKind::Indicator },
    FeatureField { key: "Protocol Type (one-hot)", kind: FeatureKind::OneHot },
    FeatureField { key: "Flags (one-hot)", kind: FeatureKind::OneHot },
];
