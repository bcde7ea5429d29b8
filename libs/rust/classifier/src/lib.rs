//! Inference-engine wrapper for the bear detector demo: loads an ONNX image
//! classifier plus its label vocabulary once, then exposes a stateless
//! predict operation mapping an image to per-label probabilities.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

pub mod error;
pub mod labels;
mod model;
pub mod preprocess;

pub use error::ClassifierError;
pub use labels::LabelVocab;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub model_sha256: Option<String>,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.onnx"),
            labels_path: PathBuf::from("models/labels.json"),
            model_sha256: None,
            input_width: 224,
            input_height: 224,
        }
    }
}

/// Result of one forward pass: the top label plus the full distribution in
/// vocabulary order. Probabilities are post-softmax, so they lie in [0,1]
/// and sum to 1 across the vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: String,
    pub label_index: usize,
    pub confidence: f32,
    pub scores: Vec<(String, f32)>,
}

impl Prediction {
    fn from_probs(vocab: &LabelVocab, probs: Vec<f32>) -> Result<Self, ClassifierError> {
        if probs.len() != vocab.len() {
            return Err(ClassifierError::ClassCountMismatch {
                expected: vocab.len(),
                got: probs.len(),
            });
        }
        let (label_index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, 0.0));
        let scores = vocab
            .iter()
            .map(str::to_owned)
            .zip(probs.iter().copied())
            .collect();
        Ok(Self {
            label: vocab.get(label_index).unwrap_or_default().to_string(),
            label_index,
            confidence,
            scores,
        })
    }

    /// Labels and probabilities, highest first, truncated to `k`.
    pub fn top_k(&self, k: usize) -> Vec<(String, f32)> {
        let mut sorted = self.scores.clone();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        sorted.truncate(k);
        sorted
    }
}

/// The loaded model artifact plus its vocabulary. Load once at startup,
/// share behind an `Arc`; predict takes `&self` and never mutates.
pub struct Classifier {
    runner: model::OnnxRunner,
    vocab: LabelVocab,
    input_width: u32,
    input_height: u32,
}

impl Classifier {
    pub fn load(cfg: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let vocab = LabelVocab::load(&cfg.labels_path)?;
        let runner = model::OnnxRunner::load(
            &cfg.model_path,
            cfg.model_sha256.as_deref(),
            cfg.input_width,
            cfg.input_height,
        )?;
        if runner.classes() != vocab.len() {
            return Err(ClassifierError::ClassCountMismatch {
                expected: vocab.len(),
                got: runner.classes(),
            });
        }
        info!(
            model = %cfg.model_path.display(),
            classes = vocab.len(),
            "model artifact loaded"
        );
        Ok(Self {
            runner,
            vocab,
            input_width: cfg.input_width,
            input_height: cfg.input_height,
        })
    }

    pub fn vocab(&self) -> &LabelVocab {
        &self.vocab
    }

    /// Classify encoded image bytes. Decode and inference failures propagate
    /// unchanged; there is no retry or fallback at this layer.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, ClassifierError> {
        let tensor = preprocess::tensor_from_bytes(bytes, self.input_width, self.input_height)?;
        let probs = self.runner.run(tensor)?;
        Prediction::from_probs(&self.vocab, probs)
    }

    pub fn predict_path(&self, path: &Path) -> Result<Prediction, ClassifierError> {
        let bytes = std::fs::read(path).map_err(|e| ClassifierError::Input {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.predict_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bear_vocab() -> LabelVocab {
        LabelVocab::new(vec!["black".into(), "grizzly".into(), "teddy".into()]).unwrap()
    }

    #[test]
    fn prediction_keys_are_exactly_the_vocab_in_order() {
        let p = Prediction::from_probs(&bear_vocab(), vec![0.1, 0.7, 0.2]).unwrap();
        let keys: Vec<&str> = p.scores.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(keys, vec!["black", "grizzly", "teddy"]);
    }

    #[test]
    fn prediction_picks_argmax() {
        let p = Prediction::from_probs(&bear_vocab(), vec![0.1, 0.7, 0.2]).unwrap();
        assert_eq!(p.label, "grizzly");
        assert_eq!(p.label_index, 1);
        assert!((p.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn top_3_of_three_labels_returns_all_descending() {
        let p = Prediction::from_probs(&bear_vocab(), vec![0.1, 0.7, 0.2]).unwrap();
        let top = p.top_k(3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0, "grizzly");
        assert_eq!(top[1].0, "teddy");
        assert_eq!(top[2].0, "black");
    }

    #[test]
    fn top_k_truncates() {
        let p = Prediction::from_probs(&bear_vocab(), vec![0.1, 0.7, 0.2]).unwrap();
        assert_eq!(p.top_k(2).len(), 2);
        assert_eq!(p.top_k(10).len(), 3);
    }

    #[test]
    fn class_count_mismatch_is_an_error() {
        let err = Prediction::from_probs(&bear_vocab(), vec![0.5, 0.5]).unwrap_err();
        assert!(matches!(err, ClassifierError::ClassCountMismatch { expected: 3, got: 2 }));
    }

    #[test]
    fn load_fails_on_missing_artifact() {
        let mut labels = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        write!(labels, r#"["black", "grizzly", "teddy"]"#).unwrap();
        let cfg = ClassifierConfig {
            model_path: PathBuf::from("/nonexistent/model.onnx"),
            labels_path: labels.path().to_path_buf(),
            ..Default::default()
        };
        assert!(Classifier::load(&cfg).is_err());
    }
}
