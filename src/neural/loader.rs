//! Model loading
//!
//! A session never constructs models itself; it asks a `ModelLoader` for the
//! model matching a `ModelType`. Host applications plug in their runtime here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::model::{DenoiseModel, ModelType};
use super::rnnoise::RnnoiseModel;
use crate::error::{DenoiseError, Result};

/// Factory for model instances
pub trait ModelLoader: Send + Sync {
    /// Load a fresh model instance for `model_type`
    ///
    /// # Errors
    /// * `ModelLoad` - weights missing or the runtime refused them
    fn load(&self, model_type: ModelType) -> Result<Box<dyn DenoiseModel>>;
}

impl<L: ModelLoader + ?Sized> ModelLoader for Arc<L> {
    fn load(&self, model_type: ModelType) -> Result<Box<dyn DenoiseModel>> {
        (**self).load(model_type)
    }
}

/// Adapts a closure into a `ModelLoader`
pub struct FnLoader<F>(pub F);

impl<F> ModelLoader for FnLoader<F>
where
    F: Fn(ModelType) -> Result<Box<dyn DenoiseModel>> + Send + Sync,
{
    fn load(&self, model_type: ModelType) -> Result<Box<dyn DenoiseModel>> {
        (self.0)(model_type)
    }
}

/// Loader backed by the RNNoise weights embedded in `nnnoiseless`
///
/// There is one bundled weight set, so every model type gets the same network.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledLoader;

impl ModelLoader for BundledLoader {
    fn load(&self, model_type: ModelType) -> Result<Box<dyn DenoiseModel>> {
        tracing::debug!(model = %model_type, "Loading bundled RNNoise weights");
        Ok(Box::new(RnnoiseModel::new()))
    }
}

/// Runtime hook turning a weights file into a model
pub type ModelBackend = dyn Fn(ModelType, &Path) -> Result<Box<dyn DenoiseModel>> + Send + Sync;

/// Loader resolving `<dir>/<file_stem>.<extension>` for each model type
pub struct FileModelLoader {
    dir: PathBuf,
    extension: String,
    backend: Box<ModelBackend>,
}

impl FileModelLoader {
    pub fn new<F>(dir: impl Into<PathBuf>, extension: &str, backend: F) -> Self
    where
        F: Fn(ModelType, &Path) -> Result<Box<dyn DenoiseModel>> + Send + Sync + 'static,
    {
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
            backend: Box::new(backend),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the weights for `model_type` are expected at
    pub fn model_path(&self, model_type: ModelType) -> PathBuf {
        self.dir
            .join(format!("{}.{}", model_type.file_stem(), self.extension))
    }

    /// Model types whose weights are present in the directory
    pub fn available(&self) -> Vec<ModelType> {
        discover_models(&self.dir, &self.extension)
    }
}

impl fmt::Debug for FileModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileModelLoader")
            .field("dir", &self.dir)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl ModelLoader for FileModelLoader {
    fn load(&self, model_type: ModelType) -> Result<Box<dyn DenoiseModel>> {
        let path = self.model_path(model_type);
        if !path.is_file() {
            return Err(DenoiseError::model_load(
                model_type.file_stem(),
                format!("model file not found: {}", path.display()),
            ));
        }

        tracing::info!(model = %model_type, path = %path.display(), "Loading model weights");
        (self.backend)(model_type, &path)
    }
}

/// Scan `dir` (not recursively) for weight files named after model types
pub fn discover_models(dir: &Path, extension: &str) -> Vec<ModelType> {
    let extension = extension.trim_start_matches('.');

    let mut found: Vec<ModelType> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == extension)
        })
        .filter_map(|entry| {
            let stem = entry.path().file_stem()?.to_string_lossy().into_owned();
            ModelType::ALL.into_iter().find(|t| t.file_stem() == stem)
        })
        .collect();

    found.sort_by_key(|t| ModelType::ALL.iter().position(|all| all == t));
    found.dedup();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::passthrough::PassthroughModel;
    use std::fs;
    use tempfile::tempdir;

    fn passthrough_backend(_: ModelType, _: &Path) -> Result<Box<dyn DenoiseModel>> {
        Ok(Box::new(PassthroughModel::new()))
    }

    #[test]
    fn test_bundled_loader_loads_every_type() {
        for model_type in ModelType::ALL {
            let model = BundledLoader.load(model_type).unwrap();
            assert_eq!(model.name(), "rnnoise");
        }
    }

    #[test]
    fn test_fn_loader() {
        let loader = FnLoader(|model_type: ModelType| -> Result<Box<dyn DenoiseModel>> {
            match model_type {
                ModelType::SmallFast => Ok(Box::new(PassthroughModel::new())),
                other => Err(DenoiseError::model_load(other.file_stem(), "not bundled")),
            }
        });

        assert!(loader.load(ModelType::SmallFast).is_ok());
        assert!(loader.load(ModelType::LargeFast).is_err());
    }

    #[test]
    fn test_file_loader_resolves_path() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("silero_denoise_small_slow.pt"), b"weights").unwrap();

        let loader = FileModelLoader::new(dir.path(), ".pt", passthrough_backend);

        assert_eq!(
            loader.model_path(ModelType::SmallSlow),
            dir.path().join("silero_denoise_small_slow.pt")
        );
        assert!(loader.load(ModelType::SmallSlow).is_ok());
    }

    #[test]
    fn test_file_loader_missing_weights() {
        let dir = tempdir().unwrap();
        let loader = FileModelLoader::new(dir.path(), "pt", passthrough_backend);

        match loader.load(ModelType::LargeFast) {
            Err(DenoiseError::ModelLoad { model, reason, .. }) => {
                assert_eq!(model, "silero_denoise_large_fast");
                assert!(reason.contains("not found"));
            }
            Err(other) => panic!("Expected ModelLoad error, got: {:?}", other),
            Ok(_) => panic!("Expected ModelLoad error, got a model"),
        }
    }

    #[test]
    fn test_discover_models() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("silero_denoise_large_fast.pt"), b"").unwrap();
        fs::write(dir.path().join("silero_denoise_small_fast.pt"), b"").unwrap();
        fs::write(dir.path().join("silero_denoise_small_slow.onnx"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/silero_denoise_small_slow.pt"), b"").unwrap();

        let found = discover_models(dir.path(), "pt");
        assert_eq!(found, vec![ModelType::SmallFast, ModelType::LargeFast]);
    }
}
