//! Abstract inference capability.
//!
//! The provider never talks to an ML runtime directly; it goes through
//! the `InferenceRuntime`/`Session` traits so tests can substitute an
//! in-memory fake. `ort_runtime` supplies the ONNX Runtime backend.

mod ort_runtime;

pub use ort_runtime::OrtRuntime;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// A named, shaped float32 buffer exchanged with the runtime.
///
/// Dimension order is always batch-first; shapes are fixed by the
/// model contract (encoder input [1,3,1024,1024], point coords
/// [1,N,2], and so on).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub dims: Vec<usize>,
}

impl Tensor {
    pub fn new(data: Vec<f32>, dims: Vec<usize>) -> Self {
        debug_assert_eq!(data.len(), dims.iter().product::<usize>());
        Self { data, dims }
    }

    /// All-zero tensor of the given shape.
    pub fn zeros(dims: Vec<usize>) -> Self {
        let len = dims.iter().product();
        Self {
            data: vec![0.0; len],
            dims,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Named tensors returned by a model execution.
pub type TensorMap = HashMap<String, Tensor>;

/// A loaded model that can be executed with named input feeds.
pub trait Session {
    /// Run the model with the given feeds and return all outputs by name.
    fn run(&mut self, feeds: &[(&str, &Tensor)]) -> Result<TensorMap>;

    /// Release backend resources. Called once by the provider's
    /// `dispose`; implementations must tolerate being dropped without it.
    fn release(&mut self) -> Result<()>;
}

/// Factory for inference sessions.
///
/// Injected into the provider at construction so the segmentation core
/// carries no hard dependency on a concrete ML runtime.
pub trait InferenceRuntime {
    fn create_session(&self, model_path: &Path) -> Result<Box<dyn Session>>;
}
