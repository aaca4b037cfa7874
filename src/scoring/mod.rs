//! Node Scoring
//!
//! Sub-network classification, source-provenance confidence, and the
//! performance/health pair shown on the dashboard. All scorers are pure
//! except the classifier's optional `get-version` probe.

pub mod classifier;
pub mod confidence;
pub mod health;

pub use classifier::{Classification, ClassificationInput, ClassificationMethod, NetworkClassifier};
pub use confidence::{score_confidence, ConfidenceInput, ConfidenceLevel, ConfidenceResult};
pub use health::{health_status, performance_score};

/// Clamp a score to 0..=100
pub fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}
