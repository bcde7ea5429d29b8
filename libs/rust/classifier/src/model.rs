use std::path::Path;

use sha2::{Digest, Sha256};
use tract_onnx::prelude::*;

use crate::error::ClassifierError;

type RunnablePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// The loaded tract plan. Built once at startup, read-only afterwards;
/// `run` takes `&self`, so concurrent callers share it without coordination.
pub(crate) struct OnnxRunner {
    plan: RunnablePlan,
    classes: usize,
}

impl OnnxRunner {
    pub(crate) fn load(
        path: &Path,
        expected_sha256: Option<&str>,
        width: u32,
        height: u32,
    ) -> Result<Self, ClassifierError> {
        if let Some(expected) = expected_sha256 {
            verify_digest(path, expected)?;
        }
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| {
                m.with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 3, height as usize, width as usize),
                    ),
                )
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        // Warmup inference; also tells us how many classes the model emits.
        let zeros = tract_ndarray::Array4::<f32>::zeros((1, 3, height as usize, width as usize));
        let mut runner = Self { plan, classes: 0 };
        let out = runner.forward(zeros.into())?;
        runner.classes = out.len();
        Ok(runner)
    }

    pub(crate) fn classes(&self) -> usize {
        self.classes
    }

    /// One forward pass, softmax applied. The export's contract is logits out.
    pub(crate) fn run(&self, input: Tensor) -> Result<Vec<f32>, ClassifierError> {
        let mut probs = self.forward(input)?;
        softmax(&mut probs);
        Ok(probs)
    }

    fn forward(&self, input: Tensor) -> Result<Vec<f32>, ClassifierError> {
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        Ok(view.iter().copied().collect())
    }
}

fn verify_digest(path: &Path, expected: &str) -> Result<(), ClassifierError> {
    let bytes = std::fs::read(path).map_err(|e| ClassifierError::Artifact {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let got = hex::encode(hasher.finalize());
    if !expected.eq_ignore_ascii_case(&got) {
        return Err(ClassifierError::DigestMismatch {
            expected: expected.to_string(),
            got,
        });
    }
    Ok(())
}

pub(crate) fn softmax(v: &mut [f32]) {
    if v.is_empty() {
        return;
    }
    let max = v.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    if sum > 0.0 {
        for x in v.iter_mut() {
            *x /= sum;
        }
    }
}
