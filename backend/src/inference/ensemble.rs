/// Fixed-weight average of per-model probability vectors.
#[derive(Debug, Clone, Default)]
pub struct Ensemble {
    weights: Vec<f32>,
}

impl Ensemble {
    pub fn new(weights: Vec<f32>) -> Self {
        Self { weights }
    }

    pub fn push_weight(&mut self, weight: f32) {
        self.weights.push(weight);
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// `combined[c] = sum(w_m * p_m[c]) / sum(w_m)`. Weights are paired with
    /// vectors in registration order.
    pub fn combine(&self, per_model: &[Vec<f32>]) -> Vec<f32> {
        let classes = per_model.iter().map(Vec::len).max().unwrap_or(0);
        let mut combined = vec![0.0f32; classes];
        let mut total_weight = 0.0f32;

        for (scores, &weight) in per_model.iter().zip(&self.weights) {
            total_weight += weight;
            for (slot, score) in combined.iter_mut().zip(scores) {
                *slot += weight * score;
            }
        }

        if total_weight > 0.0 {
            for slot in combined.iter_mut() {
                *slot /= total_weight;
            }
        }
        combined
    }
}
