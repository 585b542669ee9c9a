//! ONNX model loader

use crate::config::ModelsConfig;
use crate::models::package::{
    AnomalyScorer, Classifier, FeatureSchema, ModelKind, ModelPackage, Regressor,
};
use crate::models::registry::{ModelRegistry, ModelRegistryBuilder};
use crate::types::{ModelFamily, ModelKey};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Sidecar manifest stored next to each `<key>.onnx` as `<key>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct ModelManifest {
    pub kind: ModelKind,
    #[serde(flatten)]
    pub schema: FeatureSchema,
    /// Output name override; detected from the session when absent
    #[serde(default)]
    pub output: Option<String>,
}

/// ONNX Runtime session behind a predictor trait.
///
/// `Session::run` needs exclusive access, so each model guards its own
/// session.
pub struct OnnxModel {
    key: ModelKey,
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxModel {
    /// Run the session on one input row and read its outputs with `extract`
    fn infer<F>(&self, input: &[f32], extract: F) -> Result<f64>
    where
        F: FnOnce(&SessionOutputs) -> Result<f64>,
    {
        // Shape [1, num_features]
        let shape = vec![1_i64, input.len() as i64];
        let tensor =
            Tensor::from_array((shape, input.to_vec())).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => tensor])?;

        extract(&outputs)
    }

    /// First value of the configured output, for regressors and scorers
    fn extract_first_value(&self, outputs: &SessionOutputs) -> Result<f64> {
        let output = outputs
            .get(self.output_name.as_str())
            .with_context(|| format!("Output `{}` missing for model {}", self.output_name, self.key))?;

        let (_, data) = output.try_extract_tensor::<f32>()?;
        data.first()
            .map(|&v| v as f64)
            .with_context(|| format!("Empty output tensor for model {}", self.key))
    }
}

impl Classifier for OnnxModel {
    fn predict_proba(&self, input: &[f32]) -> Result<f64> {
        self.infer(input, |outputs| extract_probability(outputs, &self.output_name, self.key))
    }
}

impl Regressor for OnnxModel {
    fn predict(&self, input: &[f32]) -> Result<f64> {
        self.infer(input, |outputs| self.extract_first_value(outputs))
    }
}

impl AnomalyScorer for OnnxModel {
    fn score_samples(&self, input: &[f32]) -> Result<f64> {
        self.infer(input, |outputs| self.extract_first_value(outputs))
    }
}

/// Loader for ONNX model packages
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Read the `<key>.json` manifest
    pub fn load_manifest<P: AsRef<Path>>(&self, path: P) -> Result<ModelManifest> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid manifest {:?}", path))
    }

    /// Load a single ONNX model as a package of the manifest's kind
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        key: ModelKey,
        manifest: ModelManifest,
    ) -> Result<ModelPackage> {
        let path = path.as_ref();

        info!(model = %key, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = manifest
            .output
            .clone()
            .unwrap_or_else(|| detect_output_name(&session, manifest.kind));

        info!(
            model = %key,
            kind = ?manifest.kind,
            input = %input_name,
            output = %output_name,
            features = manifest.schema.feature_names.len(),
            scaled = manifest.schema.scaler.is_some(),
            "Model loaded successfully"
        );

        let model = OnnxModel {
            key,
            session: Mutex::new(session),
            input_name,
            output_name,
        };

        Ok(match manifest.kind {
            ModelKind::Classifier => ModelPackage::classifier(model, manifest.schema),
            ModelKind::Regressor => ModelPackage::regressor(model, manifest.schema),
            ModelKind::AnomalyScorer => ModelPackage::anomaly_scorer(model, manifest.schema),
        })
    }

    /// Load every model of a family found in `dir` into the builder.
    ///
    /// Missing or broken models are skipped with a warning.
    pub fn load_family<P: AsRef<Path>>(
        &self,
        dir: P,
        family: ModelFamily,
        builder: &mut ModelRegistryBuilder,
    ) -> usize {
        let dir = dir.as_ref();
        let mut loaded = 0;

        for &key in family.keys() {
            let model_path = dir.join(format!("{}.onnx", key));
            let manifest_path = dir.join(format!("{}.json", key));

            if !model_path.exists() {
                warn!(model = %key, path = %model_path.display(), "Model file not found");
                continue;
            }

            let package = self
                .load_manifest(&manifest_path)
                .and_then(|manifest| self.load_model(&model_path, key, manifest));

            match package {
                Ok(package) => {
                    builder.insert(key, package);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(model = %key, error = %e, "Failed to load model, skipping");
                }
            }
        }

        info!(family = %family, count = loaded, "Loaded {} models from {}", loaded, dir.display());
        loaded
    }

    /// Build the registry for both families
    pub fn load_registry(&self, config: &ModelsConfig) -> ModelRegistry {
        let mut builder = ModelRegistry::builder();
        self.load_family(&config.payment_models_dir, ModelFamily::PaymentDelay, &mut builder);
        self.load_family(&config.loan_models_dir, ModelFamily::Loan, &mut builder);

        let registry = builder.build();
        if registry.is_empty() {
            warn!("No models loaded, every assessment will return no verdict");
        }
        registry
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

fn detect_output_name(session: &Session, kind: ModelKind) -> String {
    let wanted: &[&str] = match kind {
        ModelKind::Classifier => &["prob", "output"],
        ModelKind::Regressor => &["variable", "output", "predict"],
        ModelKind::AnomalyScorer => &["score"],
    };

    session
        .outputs
        .iter()
        .find(|o| wanted.iter().any(|w| o.name.contains(w)))
        .or_else(|| session.outputs.last())
        .map(|o| o.name.clone())
        .unwrap_or_else(|| "output".to_string())
}

/// Positive-class probability from classifier outputs.
/// Handles tensor outputs and seq(map(int64, float)) outputs.
fn extract_probability(outputs: &SessionOutputs, output_name: &str, key: ModelKey) -> Result<f64> {
    if let Some(output) = outputs.get(output_name) {
        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = positive_class_from_tensor(shape, data);
            debug!(model = %key, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(prob) = positive_class_from_sequence_map(output, key) {
                return Ok(prob);
            }
        }
    }

    for (name, output) in outputs.iter() {
        if name.contains("label") {
            continue;
        }

        let dtype = output.dtype();

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let prob = positive_class_from_tensor(shape, data);
            debug!(model = %key, output = %name, prob = prob, "Extracted from tensor (fallback)");
            return Ok(prob);
        }

        if DynSequenceValueType::can_downcast(&dtype) {
            if let Ok(prob) = positive_class_from_sequence_map(&output, key) {
                return Ok(prob);
            }
        }
    }

    anyhow::bail!("No probability output found for model {}", key)
}

fn positive_class_from_sequence_map(output: &DynValue, key: ModelKey) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps.first().ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    // Batch size is always 1
    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
        debug!(model = %key, prob = *prob, "Extracted from seq(map)");
        return Ok(*prob as f64);
    }

    kv_pairs
        .iter()
        .find(|(class_id, _)| *class_id == 0)
        .map(|(_, prob)| 1.0 - *prob as f64)
        .ok_or_else(|| anyhow::anyhow!("No probability found in map"))
}

fn positive_class_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> f64 {
    let classes = shape.last().copied().unwrap_or(0);

    match classes {
        n if n >= 2 => data.get(1).map(|&v| v as f64).unwrap_or(0.0),
        1 => data.first().map(|&v| v as f64).unwrap_or(0.0),
        _ => data.last().map(|&v| v as f64).unwrap_or(0.0),
    }
}
