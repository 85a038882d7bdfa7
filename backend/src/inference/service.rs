use shared::{ClassLabel, ENSEMBLE_NAME, ModelPrediction, argmax, class_name};
use std::path::Path;

use super::ensemble::Ensemble;
use super::model::{Classifier, OnnxClassifier};
use super::preprocess::{ModelFamily, Normalizer, load_batch};
use super::{ImageBatch, InferenceError};
use crate::config::ServerConfig;

struct RegisteredModel {
    classifier: Box<dyn Classifier>,
    family: ModelFamily,
    normalize: Normalizer,
}

/// Every classifier the server was started with, in reporting order.
/// Built once at startup and shared read-only between workers.
pub struct InferenceService {
    models: Vec<RegisteredModel>,
    ensemble: Ensemble,
    image_size: [u32; 2],
    report_width: usize,
}

impl InferenceService {
    /// An empty service that reports exactly one record per registered model.
    pub fn new(image_size: [u32; 2]) -> Self {
        Self {
            models: Vec::new(),
            ensemble: Ensemble::new(Vec::new()),
            image_size,
            report_width: 0,
        }
    }

    /// Pads the per-model section of every prediction to `width` records by
    /// repeating the first model's record.
    pub fn with_report_width(mut self, width: usize) -> Self {
        self.report_width = width;
        self
    }

    /// Validates `config`, then loads every configured model. The first model
    /// that fails aborts startup.
    pub fn from_config(config: &ServerConfig) -> Result<Self, InferenceError> {
        config.validate()?;
        let mut service = Self::new(config.image_size).with_report_width(config.report_width);
        for (model, weight) in config.models.iter().zip(config.ensemble_weights()) {
            let classifier =
                OnnxClassifier::load(&model.name, &model.path, config.image_size, model.softmax)?;
            log::info!(
                "Loaded model {} ({:?}) from {}",
                model.name,
                model.family,
                model.path.display()
            );
            service.register(Box::new(classifier), model.family, weight);
        }
        Ok(service)
    }

    pub fn register(&mut self, classifier: Box<dyn Classifier>, family: ModelFamily, weight: f32) {
        self.models.push(RegisteredModel {
            classifier,
            family,
            normalize: family.normalizer(),
        });
        self.ensemble.push_weight(weight);
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn ensemble_weights(&self) -> &[f32] {
        self.ensemble.weights()
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models
            .iter()
            .map(|m| format!("{} ({:?})", m.classifier.name(), m.family))
            .collect()
    }

    pub fn predict_file(
        &self,
        path: &Path,
        use_ensemble: bool,
    ) -> Result<Vec<ModelPrediction>, InferenceError> {
        let batch = load_batch(path, self.image_size)?;
        self.predict_batch(&batch, use_ensemble)
    }

    /// Runs every model on its own normalized copy of `batch`. Any model error
    /// fails the whole prediction. The ensemble combines the real models only,
    /// never the padding records.
    pub fn predict_batch(
        &self,
        batch: &ImageBatch,
        use_ensemble: bool,
    ) -> Result<Vec<ModelPrediction>, InferenceError> {
        let mut per_model = Vec::with_capacity(self.models.len());
        for model in &self.models {
            let mut input = batch.clone();
            (model.normalize)(&mut input);
            let scores = model.classifier.classify(&input)?;
            if scores.len() != ClassLabel::COUNT {
                return Err(InferenceError::UnexpectedOutput {
                    name: model.classifier.name().to_string(),
                    expected: ClassLabel::COUNT,
                    found: scores.len(),
                });
            }
            log::debug!("{} scores: {:?}", model.classifier.name(), scores);
            per_model.push(scores);
        }

        let mut records: Vec<ModelPrediction> = per_model
            .iter()
            .map(|scores| ModelPrediction {
                predicted_class: class_name(argmax(scores)),
                probabilities: scores.clone(),
                winning_class: None,
            })
            .collect();
        if let Some(first) = records.first().cloned() {
            while records.len() < self.report_width {
                records.push(first.clone());
            }
        }

        if use_ensemble {
            let combined = self.ensemble.combine(&per_model);
            records.push(ModelPrediction {
                predicted_class: ENSEMBLE_NAME.to_string(),
                winning_class: Some(class_name(argmax(&combined))),
                probabilities: combined,
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Returns canned scores regardless of input.
    pub struct FixedClassifier {
        pub name: String,
        pub scores: Vec<f32>,
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        fn classify(&self, _batch: &ImageBatch) -> Result<Vec<f32>, InferenceError> {
            Ok(self.scores.clone())
        }
    }

    /// Fails every call, standing in for a broken graph.
    pub struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "Broken"
        }

        fn classify(&self, _batch: &ImageBatch) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Model {
                name: "Broken".into(),
                message: "shape mismatch".into(),
            })
        }
    }

    pub fn fixed(name: &str, scores: [f32; 3]) -> Box<dyn Classifier> {
        Box::new(FixedClassifier {
            name: name.into(),
            scores: scores.to_vec(),
        })
    }

    pub fn three_model_service() -> InferenceService {
        let mut service = InferenceService::new([32, 32]);
        service.register(fixed("MobileNetV3", [0.6, 0.3, 0.1]), ModelFamily::MobileNetV3, 0.33);
        service.register(fixed("ResNet50", [0.1, 0.2, 0.7]), ModelFamily::ResNet50, 0.33);
        service.register(fixed("DenseNet121", [0.2, 0.2, 0.6]), ModelFamily::DenseNet121, 0.33);
        service
    }

    /// Mirrors the default single-model deployment, reporting three records.
    pub fn single_model_service() -> InferenceService {
        let mut service = InferenceService::new([32, 32]).with_report_width(3);
        service.register(fixed("MobileNetV3", [0.1, 0.7, 0.2]), ModelFamily::MobileNetV3, 0.33);
        service
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::config::ConfigError;
    use image::{Rgb, RgbImage};
    use tract_onnx::prelude::tract_ndarray::Array4;

    /// Echoes the first normalized pixel so tests can see which normalizer ran.
    struct EchoClassifier;

    impl Classifier for EchoClassifier {
        fn name(&self) -> &str {
            "Echo"
        }

        fn classify(&self, batch: &ImageBatch) -> Result<Vec<f32>, InferenceError> {
            Ok(vec![batch[[0, 0, 0, 0]], batch[[0, 0, 0, 1]], batch[[0, 0, 0, 2]]])
        }
    }

    fn write_xray(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("knee_xray.png");
        RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn reports_each_model_in_registration_order() {
        let service = three_model_service();
        let batch = Array4::zeros((1, 32, 32, 3));
        let records = service.predict_batch(&batch, false).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].predicted_class, "Healthy");
        assert_eq!(records[1].predicted_class, "Osteoporosis");
        assert_eq!(records[2].predicted_class, "Osteoporosis");
        assert!(records.iter().all(|r| r.winning_class.is_none()));
        assert_eq!(records[0].probabilities, vec![0.6, 0.3, 0.1]);
    }

    #[test]
    fn ensemble_record_is_appended_last() {
        let service = three_model_service();
        let batch = Array4::zeros((1, 32, 32, 3));
        let records = service.predict_batch(&batch, true).unwrap();

        assert_eq!(records.len(), 4);
        let ensemble = records.last().unwrap();
        assert_eq!(ensemble.predicted_class, ENSEMBLE_NAME);
        assert_eq!(ensemble.probabilities.len(), 3);
        assert!((ensemble.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        let winner = class_name(argmax(&ensemble.probabilities));
        assert_eq!(ensemble.winning_class.as_deref(), Some(winner.as_str()));
        assert_eq!(winner, "Osteoporosis");
    }

    #[test]
    fn single_model_is_repeated_to_report_width() {
        let service = single_model_service();
        let batch = Array4::zeros((1, 32, 32, 3));

        let records = service.predict_batch(&batch, false).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.probabilities == vec![0.1, 0.7, 0.2]));
        assert!(records.iter().all(|r| r.predicted_class == "Osteopenia"));

        let records = service.predict_batch(&batch, true).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records[3].is_ensemble());
        assert_eq!(records[3].winning_class.as_deref(), Some("Osteopenia"));
        assert!((records[3].probabilities[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn report_width_never_drops_models() {
        let service = three_model_service().with_report_width(1);
        let batch = Array4::zeros((1, 32, 32, 3));
        let records = service.predict_batch(&batch, true).unwrap();
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn invalid_config_fails_before_loading_models() {
        let yaml = r#"
models:
  - name: MobileNetV3
    path: does/not/exist.onnx
    family: mobilenet_v3
ensemble_weights: [0.5, 0.5]
"#;
        let config = ServerConfig::from_yaml(yaml).unwrap();
        let err = InferenceService::from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            InferenceError::Config(ConfigError::WeightCount {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn tied_scores_pick_the_first_class() {
        let mut service = InferenceService::new([8, 8]);
        service.register(fixed("Tied", [0.4, 0.4, 0.2]), ModelFamily::MobileNetV3, 1.0);
        let batch = Array4::zeros((1, 8, 8, 3));

        let records = service.predict_batch(&batch, true).unwrap();
        assert_eq!(records[0].predicted_class, "Healthy");
        assert_eq!(records[1].winning_class.as_deref(), Some("Healthy"));
    }

    #[test]
    fn normalizer_is_bound_per_model() {
        let mut service = InferenceService::new([8, 8]);
        service.register(Box::new(EchoClassifier), ModelFamily::MobileNetV3, 1.0);
        service.register(Box::new(EchoClassifier), ModelFamily::Xception, 1.0);
        let batch = Array4::from_elem((1, 8, 8, 3), 255.0f32);

        let records = service.predict_batch(&batch, false).unwrap();
        assert_eq!(records[0].probabilities, vec![255.0, 255.0, 255.0]);
        assert_eq!(records[1].probabilities, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn one_failing_model_aborts_the_request() {
        let mut service = three_model_service();
        service.register(Box::new(FailingClassifier), ModelFamily::Vgg16, 0.33);
        let batch = Array4::zeros((1, 32, 32, 3));
        let err = service.predict_batch(&batch, true).unwrap_err();
        assert!(err.to_string().contains("shape mismatch"));
    }

    #[test]
    fn wrong_output_length_is_rejected() {
        let mut service = InferenceService::new([8, 8]);
        service.register(
            Box::new(FixedClassifier {
                name: "Binary".into(),
                scores: vec![0.4, 0.6],
            }),
            ModelFamily::EfficientNet,
            1.0,
        );
        let batch = Array4::zeros((1, 8, 8, 3));
        let err = service.predict_batch(&batch, false).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::UnexpectedOutput {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn file_predictions_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_xray(dir.path());
        let service = three_model_service();

        let first = service.predict_file(&path, true).unwrap();
        let second = service.predict_file(&path, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_is_an_error() {
        let service = single_model_service();
        let err = service
            .predict_file(Path::new("src/upload/missing.png"), false)
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn lists_models_with_family() {
        let service = three_model_service();
        assert_eq!(service.model_count(), 3);
        assert_eq!(service.model_names()[1], "ResNet50 (ResNet50)");
    }
}
