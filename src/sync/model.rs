//! Predictive Model
//!
//! Frequency counts of route transitions, hour-of-day activity and feature
//! usage, combined into ranked prefetch hints. Nothing here is a guarantee:
//! the output is advisory and a bad model only costs a wasted fetch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sync::UserEvent;

/// Feature name → backend data it tends to need, with correlation weight.
const FEATURE_DATA: &[(&str, &[&str], f64)] = &[
    ("messaging", &["/api/messages/conversations"], 0.9),
    ("friends", &["/api/friends", "/api/friends/requests"], 0.8),
    ("activities", &["/api/activities"], 0.85),
    ("discover", &["/api/users/suggestions"], 0.7),
    ("notifications", &["/api/notifications"], 0.8),
];

/// Data refreshed ahead of habitual activity hours.
const PEAK_HOUR_DATA: &[&str] = &["/api/notifications", "/api/messages/conversations"];

/// Hour ratio at or above which the time-of-day heuristic fires.
const PEAK_HOUR_RATIO: f64 = 0.5;

// == Prediction ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionKind {
    /// A page the user is likely to open next
    Route,
    /// An endpoint likely to be read soon
    Data,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "type")]
    pub kind: PredictionKind,
    pub target: String,
    pub confidence: f64,
}

/// Context a prediction is generated for.
#[derive(Debug, Clone, Default)]
pub struct PredictionTrigger {
    /// Route the user is on, if known
    pub route: Option<String>,
    /// Local hour, 0–23
    pub hour: u32,
}

// == Predictive Model ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictiveModel {
    route_transitions: HashMap<String, HashMap<String, u64>>,
    hourly_activity: [u64; 24],
    feature_usage: HashMap<String, u64>,
}

impl PredictiveModel {
    pub fn new() -> Self {
        Self::default()
    }

    // == Observe ==
    /// Folds one event observed at `hour` into the counts.
    pub fn observe(&mut self, event: &UserEvent, hour: u32) {
        self.hourly_activity[(hour % 24) as usize] += 1;

        match event {
            UserEvent::RouteChange { from, to } => {
                *self
                    .route_transitions
                    .entry(from.clone())
                    .or_default()
                    .entry(to.clone())
                    .or_insert(0) += 1;
            }
            UserEvent::FeatureUsed { feature } => {
                *self.feature_usage.entry(feature.clone()).or_insert(0) += 1;
            }
            UserEvent::Interaction => {}
        }
    }

    // == Derived Ratios ==
    /// Next-route probabilities from `route`, most likely first.
    pub fn transition_probabilities(&self, route: &str) -> Vec<(String, f64)> {
        let Some(next) = self.route_transitions.get(route) else {
            return Vec::new();
        };
        let total: u64 = next.values().sum();
        if total == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<(String, f64)> = next
            .iter()
            .map(|(to, count)| (to.clone(), *count as f64 / total as f64))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// Activity at `hour` relative to the busiest hour (0.0 without data).
    pub fn hourly_ratio(&self, hour: u32) -> f64 {
        let peak = self.hourly_activity.iter().copied().max().unwrap_or(0);
        if peak == 0 {
            return 0.0;
        }
        self.hourly_activity[(hour % 24) as usize] as f64 / peak as f64
    }

    /// Usage of `feature` relative to the most used feature.
    pub fn feature_share(&self, feature: &str) -> f64 {
        let peak = self.feature_usage.values().copied().max().unwrap_or(0);
        if peak == 0 {
            return 0.0;
        }
        self.feature_usage.get(feature).copied().unwrap_or(0) as f64 / peak as f64
    }

    pub fn is_empty(&self) -> bool {
        self.route_transitions.is_empty()
            && self.feature_usage.is_empty()
            && self.hourly_activity.iter().all(|c| *c == 0)
    }

    // == Generate Predictions ==
    /// Ranked prefetch hints for the trigger context.
    ///
    /// Duplicate targets keep their highest confidence.
    pub fn generate_predictions(&self, trigger: &PredictionTrigger) -> Vec<Prediction> {
        let mut best: HashMap<(PredictionKind, String), f64> = HashMap::new();
        let mut offer = |kind: PredictionKind, target: &str, confidence: f64| {
            let slot = best.entry((kind, target.to_string())).or_insert(0.0);
            if confidence > *slot {
                *slot = confidence;
            }
        };

        if let Some(route) = &trigger.route {
            for (next, probability) in self.transition_probabilities(route) {
                offer(PredictionKind::Route, next.as_str(), probability);
            }
        }

        for (feature, endpoints, correlation) in FEATURE_DATA {
            let share = self.feature_share(feature);
            if share > 0.0 {
                for endpoint in endpoints.iter() {
                    offer(PredictionKind::Data, *endpoint, correlation * share);
                }
            }
        }

        let ratio = self.hourly_ratio(trigger.hour);
        if ratio >= PEAK_HOUR_RATIO {
            for endpoint in PEAK_HOUR_DATA {
                offer(PredictionKind::Data, *endpoint, ratio * 0.8);
            }
        }

        let mut predictions: Vec<Prediction> = best
            .into_iter()
            .filter(|(_, confidence)| *confidence > 0.0)
            .map(|((kind, target), confidence)| Prediction {
                kind,
                target,
                confidence: confidence.min(1.0),
            })
            .collect();
        predictions.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.kind.cmp(&b.kind))
                .then(a.target.cmp(&b.target))
        });
        predictions
    }
}
