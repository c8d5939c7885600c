use std::fs;
use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;

use crate::error::{InferenceError, LoadError};
use crate::model::preprocess;
use crate::model::{Classifier, ClassifierProvider, LabelSet, LoadedClassifier};

const HUB_BASE_URL: &str = "https://huggingface.co";
const MODEL_FILE: &str = "model.onnx";
const CONFIG_FILE: &str = "config.json";

/// Loads ONNX image-classification models from the hub or a local
/// directory, persisting remote downloads into the cache directory.
pub struct OnnxProvider {
    http: reqwest::blocking::Client,
}

impl OnnxProvider {
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<(), LoadError> {
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(LoadError::Artifact(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }
        fs::write(dest, response.bytes()?)?;
        Ok(())
    }
}

impl Default for OnnxProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierProvider for OnnxProvider {
    fn is_cached(&self, dir: &Path) -> bool {
        dir.join(MODEL_FILE).exists() && dir.join(CONFIG_FILE).exists()
    }

    fn fetch(&self, source: &str, dest: &Path) -> Result<(), LoadError> {
        fs::create_dir_all(dest)?;

        let config_url = format!("{}/{}/resolve/main/{}", HUB_BASE_URL, source, CONFIG_FILE);
        let model_url = format!("{}/{}/resolve/main/onnx/{}", HUB_BASE_URL, source, MODEL_FILE);

        let config_path = dest.join(CONFIG_FILE);
        if !config_path.exists() {
            self.download(&config_url, &config_path)?;
        }
        let model_path = dest.join(MODEL_FILE);
        if !model_path.exists() {
            self.download(&model_url, &model_path)?;
        }
        Ok(())
    }

    fn load(&self, dir: &Path) -> Result<LoadedClassifier, LoadError> {
        let config_text = fs::read_to_string(dir.join(CONFIG_FILE))?;
        let (labels, model_type) = parse_model_config(&config_text)?;

        let _ = ort::init().with_name("liveness").commit();

        let session = Session::builder()
            .map_err(|e| LoadError::Artifact(format!("failed to create session builder: {}", e)))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| LoadError::Artifact(format!("failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| LoadError::Artifact(format!("failed to set intra threads: {}", e)))?
            .commit_from_file(dir.join(MODEL_FILE))
            .map_err(|e| LoadError::Artifact(format!("failed to load ONNX model: {}", e)))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| LoadError::Artifact("model declares no inputs".into()))?;

        Ok(LoadedClassifier {
            classifier: Box::new(OnnxClassifier {
                session: Mutex::new(session),
                input_name,
            }),
            labels,
            model_type,
        })
    }
}

/// Reads the label set (`id2label`) and reported type (`architectures`)
/// from the model's config.json.
fn parse_model_config(text: &str) -> Result<(LabelSet, String), LoadError> {
    let config: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| LoadError::Artifact(format!("failed to parse model config: {}", e)))?;

    let id2label = config["id2label"]
        .as_object()
        .ok_or_else(|| LoadError::Artifact("model config missing id2label".into()))?;

    let mut labels: Vec<(usize, String)> = Vec::with_capacity(id2label.len());
    for (key, value) in id2label {
        let index: usize = key
            .parse()
            .map_err(|_| LoadError::Artifact(format!("non-numeric id2label key {:?}", key)))?;
        let label = value
            .as_str()
            .ok_or_else(|| LoadError::Artifact(format!("non-string label for class {}", index)))?;
        labels.push((index, label.to_string()));
    }
    labels.sort_by_key(|(index, _)| *index);

    let model_type = config["architectures"][0]
        .as_str()
        .unwrap_or("ImageClassification")
        .to_string();

    Ok((
        LabelSet::new(labels.into_iter().map(|(_, label)| label).collect()),
        model_type,
    ))
}

struct OnnxClassifier {
    // Session::run takes &mut self.
    session: Mutex<Session>,
    input_name: String,
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        let tensor = preprocess::to_input_tensor(image)?;
        let input = Value::from_array(tensor)
            .map_err(|e| InferenceError::Backend(format!("failed to create input value: {}", e)))?;

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| InferenceError::Backend(format!("session run failed: {}", e)))?;

        let output = outputs
            .values()
            .next()
            .ok_or_else(|| InferenceError::Backend("model produced no outputs".into()))?;
        let (_, logits) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Backend(format!("failed to extract output: {}", e)))?;

        Ok(softmax(logits))
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}
