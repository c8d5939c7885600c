use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use image::DynamicImage;

use crate::config::ModelSettings;
use crate::error::{InferenceError, LoadError};
use crate::model::{ClassifierProvider, LoadedClassifier, ModelOrigin, Prediction};

#[derive(Debug)]
enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// The loaded classifier plus its label set and provenance. Created at most
/// once per process and read-only afterwards.
pub struct ModelHandle {
    loaded: LoadedClassifier,
    live_index: usize,
    origin: ModelOrigin,
    local_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ModelStatus {
    pub loaded: bool,
    pub name: String,
    pub model_type: String,
    pub local_path: String,
}

/// Owns the process-wide model instance. Loading is serialized by holding
/// the state mutex across the load, so concurrent callers block until the
/// in-flight attempt resolves and the cache directory has a single writer.
/// The handle is published through a `OnceLock`, which keeps `status()` and
/// `classify()` free of that lock.
pub struct ModelManager {
    settings: ModelSettings,
    provider: Box<dyn ClassifierProvider>,
    state: Mutex<LoadState>,
    handle: OnceLock<ModelHandle>,
}

impl ModelManager {
    pub fn new(settings: ModelSettings, provider: Box<dyn ClassifierProvider>) -> Self {
        Self {
            settings,
            provider,
            state: Mutex::new(LoadState::Unloaded),
            handle: OnceLock::new(),
        }
    }

    /// Idempotent: returns immediately once the model is ready. `Unloaded`
    /// and `Failed` states start a (re)load attempt.
    pub fn ensure_loaded(&self) -> Result<(), LoadError> {
        let mut state = self.state.lock().unwrap();
        match &*state {
            LoadState::Ready => Ok(()),
            // The lock is held for the whole load, so waiters block on the
            // mutex and can never observe an in-flight `Loading` here.
            LoadState::Loading => unreachable!("observed Loading while holding the state lock"),
            LoadState::Unloaded | LoadState::Failed(_) => {
                if let LoadState::Failed(reason) = &*state {
                    log::warn!("Retrying model load after failure: {}", reason);
                }
                *state = LoadState::Loading;
                match self.load_handle() {
                    Ok(handle) => {
                        log::info!(
                            "Model {} loaded ({} labels, origin {:?})",
                            self.settings.source,
                            handle.loaded.labels.len(),
                            handle.origin
                        );
                        let _ = self.handle.set(handle);
                        *state = LoadState::Ready;
                        Ok(())
                    }
                    Err(err) => {
                        log::error!("Model load failed: {}", err);
                        *state = LoadState::Failed(err.to_string());
                        Err(err)
                    }
                }
            }
        }
    }

    fn load_handle(&self) -> Result<ModelHandle, LoadError> {
        let source_dir = Path::new(&self.settings.source);
        let (dir, origin) = if source_dir.is_dir() {
            log::info!("Loading model from local directory {}", source_dir.display());
            (source_dir.to_path_buf(), ModelOrigin::Local)
        } else if self.provider.is_cached(&self.settings.cache_dir) {
            log::info!(
                "Loading model from local cache {}",
                self.settings.cache_dir.display()
            );
            (self.settings.cache_dir.clone(), ModelOrigin::LocalCache)
        } else {
            log::info!("Downloading model {} from remote hub", self.settings.source);
            self.provider
                .fetch(&self.settings.source, &self.settings.cache_dir)?;
            (self.settings.cache_dir.clone(), ModelOrigin::Remote)
        };

        let loaded = self.provider.load(&dir)?;
        let live_index = self.settings.live_class_index;
        if live_index >= loaded.labels.len() {
            return Err(LoadError::LiveClassOutOfRange {
                index: live_index,
                count: loaded.labels.len(),
            });
        }

        Ok(ModelHandle {
            loaded,
            live_index,
            origin,
            local_path: dir,
        })
    }

    /// Requires a ready model; never triggers a load. Startup runs
    /// `ensure_loaded` before traffic is accepted, so `NotLoaded` here means
    /// a broken deployment rather than a race.
    pub fn classify(&self, image: &DynamicImage) -> Result<Prediction, InferenceError> {
        let handle = self.handle.get().ok_or(InferenceError::NotLoaded)?;
        let probs = handle.loaded.classifier.classify(image)?;
        Prediction::from_probabilities(&probs, &handle.loaded.labels, handle.live_index)
    }

    pub fn live_class_index(&self) -> usize {
        self.settings.live_class_index
    }

    /// Non-blocking snapshot; safe to call while a load is in flight.
    pub fn status(&self) -> ModelStatus {
        match self.handle.get() {
            Some(handle) => ModelStatus {
                loaded: true,
                name: self.settings.source.clone(),
                model_type: handle.loaded.model_type.clone(),
                local_path: handle.local_path.display().to_string(),
            },
            None => ModelStatus {
                loaded: false,
                name: self.settings.source.clone(),
                model_type: String::new(),
                local_path: self.settings.cache_dir.display().to_string(),
            },
        }
    }
}
