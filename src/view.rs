//! Page text. Everything here is a pure function of controller snapshots.

use std::fmt::Write as _;

use crate::disclosure::DisclosureController;
use crate::feed::{FeedPhase, FeedStore};
use crate::routes::{Route, HOME_PATH, NAV_LINKS};
use crate::types::anomaly::{AnomalyEvent, FeatureKind, FEATURE_LAYOUT};
use crate::types::session::DetectorSession;

pub const PLACEHOLDER: &str = "–––";

/// `0.77` -> `"77.0%"`. Ties round away from zero, so `0.5625` -> `"56.3%"`.
pub fn format_probability(probability: f64) -> String {
    let tenths = (probability * 1000.0).round() / 10.0;
    format!("{:.1}%", tenths)
}

fn or_placeholder(text: &str) -> &str {
    if text.is_empty() {
        PLACEHOLDER
    } else {
        text
    }
}

pub fn render_navbar(active: &Route) -> String {
    let mut out = String::new();
    let logo = if active.path() == HOME_PATH { "[VĪGĪL]" } else { "VĪGĪL" };
    let _ = write!(out, "{} ({})  ", logo, HOME_PATH);
    for (path, label) in NAV_LINKS {
        if active.path() == *path {
            let _ = write!(out, " [{}]", label);
        } else {
            let _ = write!(out, "  {} ", label);
        }
    }
    out
}

/// What the home page shows for a session snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeView {
    pub button_text: &'static str,
    pub running: bool,
    pub status_visible: bool,
    pub results_visible: bool,
    pub label: String,
    pub probability: String,
}

pub fn home_view(session: &DetectorSession) -> HomeView {
    let running = session.is_running();
    let (label, probability) = match &session.last_result {
        Some(result) => (result.label.clone(), format_probability(result.probability)),
        None => (String::new(), String::new()),
    };
    HomeView {
        button_text: if running { "Running" } else { "GO" },
        running,
        status_visible: running || !label.is_empty(),
        results_visible: !label.is_empty(),
        label,
        probability,
    }
}

pub fn render_home(view: &HomeView) -> String {
    let mut out = String::new();
    if view.running {
        let _ = writeln!(out, "        ((( {} )))", view.button_text);
    } else {
        let _ = writeln!(out, "        (  {}  )", view.button_text);
    }
    let _ = writeln!(out);
    if view.status_visible {
        let _ = writeln!(out, "Current Status");
    }
    if view.results_visible {
        let _ = writeln!(out, "  Anomaly : {}", or_placeholder(&view.label));
        let _ = writeln!(out, "  Probability : {}", or_placeholder(&view.probability));
    }
    out
}

fn render_feature(out: &mut String, event: &AnomalyEvent, key: &str, kind: FeatureKind) {
    let value = match (event.feature(key), kind) {
        (None, _) => PLACEHOLDER.to_string(),
        (Some(v), FeatureKind::Measure(Some(unit))) => format!("{} {}", v, unit),
        (Some(v), FeatureKind::Indicator) => {
            let text = if v.is_truthy() { "True" } else { "False" };
            text.to_string()
        }
        (Some(v), _) => v.to_string(),
    };
    let _ = writeln!(out, "    {} : {}", key, value);
}

pub fn render_card(event: &AnomalyEvent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Timestamp : {}", event.timestamp);
    let _ = writeln!(out, "  Label : {}", event.label);
    let _ = writeln!(out, "  Probability : {}", format_probability(event.probability));
    if let Some(interface) = &event.interface {
        let _ = writeln!(out, "  Interface : {}", interface);
    }
    if !event.anomaly_families.is_empty() {
        let families: Vec<String> = event
            .anomaly_families
            .iter()
            .map(|family| match event.anomaly_probs.get(family) {
                Some(p) => format!("{} ({})", family, format_probability(*p)),
                None => family.clone(),
            })
            .collect();
        let _ = writeln!(out, "  Families : {}", families.join(", "));
    }
    if !event.probabilities.is_empty() {
        let classes: Vec<String> = event
            .probabilities
            .iter()
            .map(|(class, p)| format!("{} {}", class, format_probability(*p)))
            .collect();
        let _ = writeln!(out, "  Class probabilities : {}", classes.join(", "));
    }
    for field in FEATURE_LAYOUT {
        render_feature(&mut out, event, field.key, field.kind);
    }
    // Features this build has no layout for are still shown, after the known ones.
    for (key, value) in &event.features {
        if FEATURE_LAYOUT.iter().all(|f| f.key != key.as_str()) {
            let _ = writeln!(out, "    {} : {}", key, value);
        }
    }
    out
}

pub fn render_analytics(feed: &FeedStore, disclosure: &DisclosureController) -> String {
    let items = match feed.phase() {
        FeedPhase::Loading => return "Loading anomalies…\n".to_string(),
        FeedPhase::Error(message) => return format!("Error: {}\n", message),
        FeedPhase::Ready(items) => items,
    };

    let mut out = String::new();
    let _ = writeln!(out, "Anomaly Counter");
    let _ = writeln!(out, "Past anomalies");
    let _ = writeln!(out);

    let shown = disclosure.visible(items);
    for event in shown {
        out.push_str(&render_card(event));
        let _ = writeln!(out);
    }

    if DisclosureController::is_available(items.len()) {
        let state = disclosure.state();
        let control = if state.animating() {
            "[▲] Collapse anomalies"
        } else {
            "[▼] Expand anomalies"
        };
        let _ = writeln!(out, "Showing {} of {}  {}", shown.len(), items.len(), control);
    }
    out
}

pub fn render_about() -> String {
    "About the project\n\n\
     ViGiL is a real-time network traffic monitoring and classification dashboard.\n\
     The detector captures short windows of traffic, derives 15 flow-level features\n\
     (packet length, inter-arrival time, entropy metrics and more) and labels each\n\
     capture with one of a few threat classes (Benign, Botnet, Ransomware, Spyware,\n\
     Trojan, Worm). Captures where any malware family outranks Benign are stored as\n\
     anomalies and listed on the Analytics page.\n"
        .to_string()
}

pub fn render_not_found(path: &str) -> String {
    format!(
        "404 – Page not found\n\nOops! {} doesn't exist. Go back to /analytics.\n",
        path
    )
}
