use std::path::Path;
use tract_onnx::prelude::*;

use super::{ImageBatch, InferenceError};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A loaded, immutable image classifier returning one score per class.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, batch: &ImageBatch) -> Result<Vec<f32>, InferenceError>;
}

pub struct OnnxClassifier {
    name: String,
    plan: OnnxPlan,
    softmax: bool,
}

impl OnnxClassifier {
    pub fn load(
        name: &str,
        model_path: &Path,
        [width, height]: [u32; 2],
        softmax: bool,
    ) -> Result<Self, InferenceError> {
        let input_shape = tvec!(1, height as usize, width as usize, 3);
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), input_shape),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoad {
                name: name.to_string(),
                path: model_path.to_path_buf(),
                message: format!("{:#}", e),
            })?;

        Ok(Self {
            name: name.to_string(),
            plan,
            softmax,
        })
    }

    fn run(&self, batch: &ImageBatch) -> TractResult<Vec<f32>> {
        let input = batch.clone().into_tensor();
        let outputs = self.plan.run(tvec!(input.into()))?;
        let scores = outputs[0].to_array_view::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, batch: &ImageBatch) -> Result<Vec<f32>, InferenceError> {
        let scores = self.run(batch).map_err(|e| InferenceError::Model {
            name: self.name.clone(),
            message: format!("{:#}", e),
        })?;
        if self.softmax {
            Ok(softmax(&scores))
        } else {
            Ok(scores)
        }
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
