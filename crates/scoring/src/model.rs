// In crates/scoring/src/model.rs

use crate::features::{FEATURE_COUNT, FeatureVector};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// The universal interface for a trained classifier.
///
/// The engine only ever sees this one capability: a fixed-shape feature
/// vector goes in, a win probability in [0, 1] comes out. Model training,
/// loading and versioning all live outside the engine, so any concrete model
/// can be substituted without touching it.
pub trait Scorer: Send {
    /// The name of the scorer (e.g., "LogisticModel").
    fn name(&self) -> &'static str;

    /// Estimates the win probability for a scored candidate.
    ///
    /// # Returns
    ///
    /// * `Ok(p)` with `p` in `[0, 1]` on success.
    /// * `Err(Error::ScorerUnavailable)` when the underlying model cannot be
    ///   invoked. Callers must treat this as "no candidate qualifies this
    ///   tick", never as a fatal error.
    fn score(&self, features: &FeatureVector) -> Result<f64>;
}

/// The on-disk shape of a trained model artifact.
#[derive(Debug, Deserialize)]
struct ModelArtifact {
    /// Feature names in contract order. Informational; the vector layout is
    /// fixed by the extractor.
    #[allow(dead_code)]
    feature_names: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
}

/// A logistic-regression scorer loaded from a JSON artifact.
#[derive(Debug)]
pub struct LogisticModel {
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticModel {
    /// Loads a model artifact, rejecting any whose weight count does not
    /// match the feature contract.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;

        if artifact.weights.len() != FEATURE_COUNT {
            return Err(Error::ModelShape {
                expected: FEATURE_COUNT,
                actual: artifact.weights.len(),
            });
        }

        Ok(Self {
            weights: artifact.weights,
            bias: artifact.bias,
        })
    }
}

impl Scorer for LogisticModel {
    fn name(&self) -> &'static str {
        "LogisticModel"
    }

    fn score(&self, features: &FeatureVector) -> Result<f64> {
        let z: f64 = features
            .as_slice()
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.bias;

        let probability = 1.0 / (1.0 + (-z).exp());
        Ok(probability.clamp(0.0, 1.0))
    }
}

/// Stand-in scorer used when no model artifact could be loaded. Every call
/// reports `ScorerUnavailable`, which the lifecycle manager degrades to
/// "nothing qualifies this tick".
#[derive(Debug, Default)]
pub struct UnloadedScorer;

impl Scorer for UnloadedScorer {
    fn name(&self) -> &'static str {
        "UnloadedScorer"
    }

    fn score(&self, _features: &FeatureVector) -> Result<f64> {
        Err(Error::ScorerUnavailable)
    }
}

/// Maps a win probability onto the 1-10 confidence scale via fixed
/// thresholds: each 0.1 of probability is one grade, floored, with the
/// bottom clamped so a published grade is never 0.
pub fn grade_for_probability(probability: f64) -> u8 {
    ((probability * 10.0).floor() as u8).clamp(1, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureExtractor;
    use crate::types::ScorerSettings;
    use core_types::{Bar, CandidatePattern, Direction, PatternKind};
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn grade_thresholds_are_fixed_buckets() {
        assert_eq!(grade_for_probability(0.0), 1);
        assert_eq!(grade_for_probability(0.05), 1);
        assert_eq!(grade_for_probability(0.19), 1);
        assert_eq!(grade_for_probability(0.20), 2);
        assert_eq!(grade_for_probability(0.65), 6);
        assert_eq!(grade_for_probability(0.82), 8);
        assert_eq!(grade_for_probability(1.0), 10);
    }

    #[test]
    fn logistic_model_scores_from_artifact_weights() {
        let path = write_artifact(
            "model_ok.json",
            &format!(
                r#"{{"feature_names": {names}, "weights": {weights}, "bias": 0.0}}"#,
                names = serde_json::to_string(&vec!["f"; FEATURE_COUNT]).unwrap(),
                weights = serde_json::to_string(&vec![0.0; FEATURE_COUNT]).unwrap()
            ),
        );

        let model = LogisticModel::from_file(&path).unwrap();
        let features = sample_features();
        // All-zero weights and bias: the sigmoid midpoint.
        let p = model.score(&features).unwrap();
        assert!((p - 0.5).abs() < 1e-12);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn wrong_weight_count_is_rejected_at_load() {
        let path = write_artifact(
            "model_shape.json",
            r#"{"feature_names": ["a", "b"], "weights": [0.1, 0.2], "bias": 0.0}"#,
        );

        let err = LogisticModel::from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::ModelShape { expected: FEATURE_COUNT, actual: 2 }
        ));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unloaded_scorer_reports_unavailable() {
        let scorer = UnloadedScorer;
        assert!(matches!(
            scorer.score(&sample_features()),
            Err(Error::ScorerUnavailable)
        ));
    }

    fn sample_features() -> FeatureVector {
        let bars: Vec<Bar> = (0..6)
            .map(|i| Bar {
                open_time: i * 60_000,
                open: dec!(1.0740),
                high: dec!(1.0750),
                low: dec!(1.0730),
                close: dec!(1.0745),
                volume: dec!(100),
            })
            .collect();
        let pattern = CandidatePattern {
            kind: PatternKind::SwingLow,
            span: (1, 4),
            bias: Direction::Buy,
            strength: 1.0,
        };
        let extractor = FeatureExtractor::new(ScorerSettings {
            model_path: String::new(),
            rsi_period: 3,
            atr_period: 3,
            momentum_period: 2,
        });
        extractor.extract(&pattern, &bars)
    }

    fn write_artifact(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }
}
