use super::{InferenceRuntime, Session, Tensor, TensorMap};
use anyhow::{Context, Result};
use ndarray::{ArrayD, IxDyn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::SessionInputValue;
use std::borrow::Cow;
use std::path::Path;

/// ONNX Runtime backend for the inference port.
pub struct OrtRuntime;

impl OrtRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceRuntime for OrtRuntime {
    fn create_session(&self, model_path: &Path) -> Result<Box<dyn Session>> {
        tracing::info!("Loading ONNX model from {}", model_path.display());

        let session = ort::session::Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .with_intra_threads(4)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("Failed to load model from {}", model_path.display())
            })?;

        tracing::info!("Model loaded successfully");

        Ok(Box::new(OrtSession {
            session: Some(session),
        }))
    }
}

struct OrtSession {
    // None after release()
    session: Option<ort::session::Session>,
}

impl Session for OrtSession {
    fn run(&mut self, feeds: &[(&str, &Tensor)]) -> Result<TensorMap> {
        let session = self
            .session
            .as_mut()
            .context("Session already released")?;

        let mut inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(feeds.len());
        for (name, tensor) in feeds {
            let array = ArrayD::from_shape_vec(IxDyn(&tensor.dims), tensor.data.clone())
                .with_context(|| format!("Bad shape for input tensor '{}'", name))?;
            let value = ort::value::Value::from_array(array)
                .with_context(|| format!("Failed to build input tensor '{}'", name))?;
            inputs.push((Cow::Owned(name.to_string()), SessionInputValue::from(value)));
        }

        let outputs = session.run(inputs).context("Failed to run inference")?;

        let mut map = TensorMap::new();
        for (name, value) in outputs.iter() {
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .with_context(|| format!("Output tensor '{}' is not float32", name))?;
            let dims = shape.iter().map(|&d| d as usize).collect();
            map.insert(name.to_string(), Tensor::new(data.to_vec(), dims));
        }

        Ok(map)
    }

    fn release(&mut self) -> Result<()> {
        if self.session.take().is_some() {
            tracing::debug!("ONNX session released");
        }
        Ok(())
    }
}
